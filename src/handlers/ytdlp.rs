use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::traits::{Downloader, Handler, HandlerError};
use super::types::{ExecutionContext, HandlerConfig};
use crate::download::{DownloadOptions, DownloadRequest, Orchestrator};
use crate::extractor::Extractor;

/// Downloader backed by the configured extractor.
///
/// Handler options use the same shape as request options and act as
/// per-instance defaults, e.g. a `1080p` archive handler with its own
/// `output_dir`.
pub struct YtDlpHandler {
    name: String,
    defaults: DownloadOptions,
    orchestrator: Orchestrator,
}

impl YtDlpHandler {
    pub const KIND: &'static str = "yt-dlp";

    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        Self {
            name: Self::KIND.to_string(),
            defaults: DownloadOptions::default(),
            orchestrator: Orchestrator::new(extractor),
        }
    }

    pub fn from_config(
        extractor: Arc<dyn Extractor>,
        config: &HandlerConfig,
    ) -> Result<Self, HandlerError> {
        let defaults = parse_options(&config.options)?;
        Ok(Self {
            name: config.name_or(Self::KIND).to_string(),
            defaults,
            orchestrator: Orchestrator::new(extractor),
        })
    }
}

fn parse_options(value: &Value) -> Result<DownloadOptions, HandlerError> {
    if value.is_null() {
        return Ok(DownloadOptions::default());
    }
    serde_json::from_value(value.clone()).map_err(|e| HandlerError::InvalidArgument {
        name: "options",
        reason: e.to_string(),
    })
}

impl Handler for YtDlpHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Downloads media with yt-dlp"
    }

    fn as_downloader(&self) -> Option<&dyn Downloader> {
        Some(self)
    }
}

#[async_trait]
impl Downloader for YtDlpHandler {
    async fn download(&self, url: &str, ctx: &ExecutionContext) -> Result<Value, HandlerError> {
        let fallback = ctx.fallback().map(parse_options).transpose()?.unwrap_or_default();
        let options = ctx
            .options()
            .map(parse_options)
            .transpose()?
            .unwrap_or_default()
            .or(&self.defaults)
            .or(&fallback);

        let request = DownloadRequest::resolve(url, &options, None)
            .ok_or(HandlerError::MissingArgument("output_dir"))?;

        let result = self.orchestrator.run(&ctx.job_id, &request, ctx.sink()).await;

        serde_json::to_value(result).map_err(|e| HandlerError::Execution(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{MediaInfo, ScriptedExtractor};
    use serde_json::json;
    use tempfile::TempDir;

    fn extractor() -> Arc<ScriptedExtractor> {
        Arc::new(ScriptedExtractor::new(MediaInfo {
            id: Some("id1".to_string()),
            title: Some("Clip".to_string()),
            ..MediaInfo::default()
        }))
    }

    #[tokio::test]
    async fn downloads_into_requested_dir() {
        let dir = TempDir::new().unwrap();
        let handler = YtDlpHandler::new(extractor());
        let ctx = ExecutionContext::new("job")
            .with_value("url", "https://example.com/v")
            .with_value("options", json!({"output_dir": dir.path(), "quality": "480p"}));

        let value = handler.execute(&ctx).await.unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["title"], "Clip");
        assert!(value["filename"].as_str().unwrap().contains("_480p_"));
    }

    #[tokio::test]
    async fn handler_defaults_fill_request() {
        let dir = TempDir::new().unwrap();
        let extractor = extractor();
        let config = HandlerConfig::new("yt-dlp")
            .named("audio")
            .with_options(json!({"audio_only": true, "audio_codec": "opus", "output_dir": dir.path()}));
        let handler = YtDlpHandler::from_config(extractor.clone(), &config).unwrap();
        assert_eq!(handler.name(), "audio");

        let ctx = ExecutionContext::new("job").with_value("url", "https://example.com/v");
        let value = handler.execute(&ctx).await.unwrap();
        assert!(value["filename"].as_str().unwrap().ends_with(".opus"));

        let (_, options) = extractor.media_requests().remove(0);
        assert_eq!(options.extract_audio.as_deref(), Some("opus"));
    }

    #[tokio::test]
    async fn handler_defaults_win_over_fallback() {
        let dir = TempDir::new().unwrap();
        let config = HandlerConfig::new("yt-dlp")
            .named("hd")
            .with_options(json!({"quality": "1080p"}));
        let handler = YtDlpHandler::from_config(extractor(), &config).unwrap();

        let ctx = ExecutionContext::new("job")
            .with_value("url", "https://example.com/v")
            .with_value("options", json!({"video_codec": "vp9"}))
            .with_value(
                "fallback",
                json!({"quality": "480p", "video_codec": "avc1", "output_dir": dir.path()}),
            );
        let value = handler.execute(&ctx).await.unwrap();
        assert!(value["filename"].as_str().unwrap().contains("_1080p_"));
    }

    #[tokio::test]
    async fn missing_output_dir_is_an_argument_error() {
        let handler = YtDlpHandler::new(extractor());
        let ctx = ExecutionContext::new("job").with_value("url", "https://example.com/v");
        let err = handler.execute(&ctx).await.unwrap_err();
        assert!(matches!(err, HandlerError::MissingArgument("output_dir")));
    }
}
