use std::sync::Arc;

use super::events::EventBus;
use crate::config::{Config, PreferencesStore};
use crate::extractor::Extractor;
use crate::handlers::HandlerRegistry;
use crate::jobs::JobRunner;
use crate::observability::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<HandlerRegistry>,
    pub extractor: Arc<dyn Extractor>,
    pub preferences: Arc<PreferencesStore>,
    pub events: EventBus,
    pub metrics: Arc<Metrics>,
    pub runner: JobRunner,
}

impl AppState {
    pub fn new(
        config: Config,
        registry: HandlerRegistry,
        extractor: Arc<dyn Extractor>,
        preferences: PreferencesStore,
    ) -> Self {
        let registry = Arc::new(registry);
        let metrics = Arc::new(Metrics::new());
        Self {
            config: Arc::new(config),
            runner: JobRunner::new(registry.clone(), metrics.clone()),
            registry,
            extractor,
            preferences: Arc::new(preferences),
            events: EventBus::new(),
            metrics,
        }
    }

    pub fn max_payload_bytes(&self) -> usize {
        self.config.server.max_payload_bytes.as_usize()
    }
}
