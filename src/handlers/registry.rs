use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::catalog::HandlerCatalog;
use super::capitalizer::TitleCapitalizer;
use super::traits::{Handler, HandlerError, capability_label};
use super::types::{ExecutionContext, HandlerConfig, HandlerInfo};
use super::ytdlp::YtDlpHandler;
use crate::config::Config;
use crate::extractor::Extractor;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("handler not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// A manifest that discovery could not register
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedManifest {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryReport {
    pub registered: Vec<String>,
    pub skipped: Vec<SkippedManifest>,
}

/// Registry mapping handler names to handler instances
///
/// Mutated only while starting up; afterwards it is shared read-only
/// behind an `Arc`.
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Arc<dyn Handler>>,
    catalog: Arc<HandlerCatalog>,
}

impl HandlerRegistry {
    pub fn new(catalog: HandlerCatalog) -> Self {
        Self {
            handlers: BTreeMap::new(),
            catalog: Arc::new(catalog),
        }
    }

    /// Registers `handler` under its own name, replacing any previous
    /// handler of that name.
    pub fn register(&mut self, handler: Arc<dyn Handler>) -> Result<(), HandlerError> {
        let name = handler.name().trim().to_string();
        if name.is_empty() {
            return Err(HandlerError::InvalidHandler(
                "handler name must not be empty".to_string(),
            ));
        }
        let Some(kind) = capability_label(handler.as_ref()) else {
            return Err(HandlerError::InvalidHandler(format!(
                "'{name}' implements neither downloader nor processor"
            )));
        };

        if self.handlers.insert(name.clone(), handler).is_some() {
            info!(handler = %name, "Replaced existing handler");
        } else {
            debug!(handler = %name, kind, "Registered handler");
        }
        Ok(())
    }

    /// Builds a handler of catalog `kind` from `config` and registers it.
    /// Returns the registered name.
    pub fn register_kind(&mut self, kind: &str, config: &HandlerConfig) -> Result<String, HandlerError> {
        let handler = self.catalog.build(kind, config)?;
        let name = handler.name().trim().to_string();
        self.register(handler)?;
        Ok(name)
    }

    /// Same as [`register_kind`](Self::register_kind) with the kind taken
    /// from `config.handler`.
    pub fn register_config(&mut self, config: &HandlerConfig) -> Result<String, HandlerError> {
        self.register_kind(&config.handler, config)
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn catalog(&self) -> &HandlerCatalog {
        &self.catalog
    }

    pub async fn invoke(&self, name: &str, ctx: &ExecutionContext) -> Result<Value, RegistryError> {
        let handler = self
            .lookup(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        debug!(handler = name, job_id = %ctx.job_id, "Invoking handler");
        Ok(handler.execute(ctx).await?)
    }

    /// Registers every handler manifest (`*.toml`) in `dir`. Files whose
    /// name starts with `_` are ignored. A manifest that cannot be read,
    /// parsed or built is skipped with a warning; a missing directory
    /// yields an empty report.
    pub fn discover(&mut self, dir: &Path) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "Plugin directory not readable, skipping discovery");
                return report;
            }
        };

        let mut manifests: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| is_manifest(path))
            .collect();
        manifests.sort();

        for path in manifests {
            match self.load_manifest(&path) {
                Ok(name) => {
                    info!(handler = %name, manifest = %path.display(), "Discovered handler");
                    report.registered.push(name);
                }
                Err(reason) => {
                    warn!(manifest = %path.display(), %reason, "Skipping handler manifest");
                    report.skipped.push(SkippedManifest { path, reason });
                }
            }
        }

        report
    }

    fn load_manifest(&mut self, path: &Path) -> Result<String, String> {
        let raw = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        let config: HandlerConfig = toml::from_str(&raw).map_err(|e| e.to_string())?;
        self.register_config(&config).map_err(|e| e.to_string())
    }

    /// Snapshot of current registrations, sorted by name
    pub fn list(&self) -> Vec<HandlerInfo> {
        self.handlers
            .iter()
            .map(|(name, handler)| HandlerInfo {
                name: name.clone(),
                version: handler.version().to_string(),
                description: handler.description().to_string(),
                kind: capability_label(handler.as_ref())
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect()
    }

    /// Registry with the built-in catalog and one default instance of each
    /// built-in handler.
    pub fn with_defaults(extractor: Arc<dyn Extractor>) -> Self {
        let mut registry = Self::new(HandlerCatalog::builtin(extractor.clone()));

        let defaults: [Arc<dyn Handler>; 2] = [
            Arc::new(YtDlpHandler::new(extractor)),
            Arc::new(TitleCapitalizer::new()),
        ];
        for handler in defaults {
            if let Err(e) = registry.register(handler) {
                warn!(error = %e, "Built-in handler rejected");
            }
        }

        registry
    }

    /// Startup registry: built-in defaults, then `[handlers.*]` tables, then
    /// manifests discovered in `paths.plugin_dir`.
    ///
    /// # Errors
    ///
    /// A broken `[handlers.*]` table is a configuration error and fails
    /// startup. Broken discovery manifests do not.
    pub fn from_config(config: &Config, extractor: Arc<dyn Extractor>) -> Result<Self, HandlerError> {
        let mut registry = Self::with_defaults(extractor);

        for (name, handler_config) in &config.handlers {
            let mut handler_config = handler_config.clone();
            if handler_config.name.is_none() {
                handler_config.name = Some(name.clone());
            }
            registry
                .register_config(&handler_config)
                .map_err(|e| HandlerError::InvalidHandler(format!("[handlers.{name}]: {e}")))?;
        }

        if let Some(dir) = &config.paths.plugin_dir {
            let report = registry.discover(dir);
            if !report.registered.is_empty() || !report.skipped.is_empty() {
                info!(
                    registered = report.registered.len(),
                    skipped = report.skipped.len(),
                    "Handler discovery finished"
                );
            }
        }

        Ok(registry)
    }
}

fn is_manifest(path: &Path) -> bool {
    let is_toml = path.extension().is_some_and(|ext| ext == "toml");
    let hidden = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('_') || name.starts_with('.'));
    is_toml && !hidden && path.is_file()
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("catalog", &self.catalog)
            .finish()
    }
}
