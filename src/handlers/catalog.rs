use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::capitalizer::TitleCapitalizer;
use super::traits::{Handler, HandlerError};
use super::types::HandlerConfig;
use super::ytdlp::YtDlpHandler;
use crate::extractor::Extractor;

pub type HandlerFactory =
    Box<dyn Fn(&HandlerConfig) -> Result<Arc<dyn Handler>, HandlerError> + Send + Sync>;

/// Build-time directory of handler kinds. Config tables and discovery
/// manifests name a kind; the catalog turns that into an instance.
#[derive(Default)]
pub struct HandlerCatalog {
    factories: BTreeMap<String, HandlerFactory>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the built-in kinds: `yt-dlp` and `title-capitalizer`.
    pub fn builtin(extractor: Arc<dyn Extractor>) -> Self {
        let mut catalog = Self::new();

        catalog.add(YtDlpHandler::KIND, move |config| {
            let handler = YtDlpHandler::from_config(extractor.clone(), config)?;
            Ok(Arc::new(handler) as Arc<dyn Handler>)
        });
        catalog.add(TitleCapitalizer::KIND, |config| {
            Ok(Arc::new(TitleCapitalizer::from_config(config)) as Arc<dyn Handler>)
        });

        catalog
    }

    pub fn add<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&HandlerConfig) -> Result<Arc<dyn Handler>, HandlerError> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn build(&self, kind: &str, config: &HandlerConfig) -> Result<Arc<dyn Handler>, HandlerError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| HandlerError::InvalidHandler(format!("unknown handler kind '{kind}'")))?;
        factory(config)
    }
}

impl fmt::Debug for HandlerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}
