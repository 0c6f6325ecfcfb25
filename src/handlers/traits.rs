use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::types::ExecutionContext;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },
    #[error("invalid handler: {0}")]
    InvalidHandler(String),
    #[error("execution failed: {0}")]
    Execution(String),
}

/// Download capability: turns a URL into a result record.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str, ctx: &ExecutionContext) -> Result<Value, HandlerError>;
}

/// Process capability: transforms a data payload.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, data: Value, ctx: &ExecutionContext) -> Result<Value, HandlerError>;
}

/// A named unit of execution logic.
///
/// Capabilities are separate traits; a handler advertises the ones it
/// implements through `as_downloader` / `as_processor`. One with neither is
/// rejected at registration.
#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        ""
    }

    fn as_downloader(&self) -> Option<&dyn Downloader> {
        None
    }

    fn as_processor(&self) -> Option<&dyn Processor> {
        None
    }

    /// Dispatches on capability. A downloader needs `url`; a processor needs
    /// a non-empty `data`. When both apply, `url` selects the download path.
    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value, HandlerError> {
        if let Some(downloader) = self.as_downloader() {
            match (ctx.url(), self.as_processor()) {
                (Some(url), _) => return downloader.download(url, ctx).await,
                (None, None) => return Err(HandlerError::MissingArgument("url")),
                (None, Some(_)) => {}
            }
        }

        match self.as_processor() {
            Some(processor) => {
                let data = ctx.data().ok_or(HandlerError::MissingArgument("data"))?;
                processor.process(data.clone(), ctx).await
            }
            None => Err(HandlerError::InvalidHandler(format!(
                "{} has no capability",
                self.name()
            ))),
        }
    }
}

/// `downloader`, `processor` or `downloader+processor`; `None` for neither.
pub fn capability_label(handler: &dyn Handler) -> Option<&'static str> {
    match (handler.as_downloader().is_some(), handler.as_processor().is_some()) {
        (true, true) => Some("downloader+processor"),
        (true, false) => Some("downloader"),
        (false, true) => Some("processor"),
        (false, false) => None,
    }
}
