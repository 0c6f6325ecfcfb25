use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::{FetchOptions, MediaInfo, NativeProgress};
use super::{Extractor, ExtractorError};

/// What the scripted transfer leaves on disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Artifact {
    /// A file at the output template with the extension the options ask for
    #[default]
    Expected,
    /// A file at the output template with a different extension
    WithExtension(String),
    /// Nothing at all
    Missing,
}

/// Deterministic extractor that replays canned metadata and progress.
///
/// ```ignore
/// let extractor = ScriptedExtractor::new(info)
///     .with_events(vec![NativeProgress::downloading("v.mp4", 40.0, 100.0)])
///     .with_artifact(Artifact::Expected);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedExtractor {
    info: MediaInfo,
    events: Vec<NativeProgress>,
    metadata_failure: Option<String>,
    transfer_failure: Option<String>,
    artifact: Artifact,
    artifact_bytes: usize,
    requests: Mutex<Vec<(String, FetchOptions)>>,
}

impl ScriptedExtractor {
    pub fn new(info: MediaInfo) -> Self {
        Self {
            info,
            artifact_bytes: 1024,
            ..Self::default()
        }
    }

    pub fn with_events(mut self, events: Vec<NativeProgress>) -> Self {
        self.events = events;
        self
    }

    pub fn failing_metadata(mut self, message: impl Into<String>) -> Self {
        self.metadata_failure = Some(message.into());
        self
    }

    /// Replays the configured events, then fails the transfer.
    pub fn failing_transfer(mut self, message: impl Into<String>) -> Self {
        self.transfer_failure = Some(message.into());
        self
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifact = artifact;
        self
    }

    pub fn with_artifact_bytes(mut self, bytes: usize) -> Self {
        self.artifact_bytes = bytes;
        self
    }

    /// Options of every `fetch_media` call so far, in order.
    pub fn media_requests(&self) -> Vec<(String, FetchOptions)> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn artifact_path(&self, options: &FetchOptions) -> Option<PathBuf> {
        let template = options.output_template.as_ref()?.to_str()?.to_string();
        let ext = match &self.artifact {
            Artifact::Missing => return None,
            Artifact::WithExtension(ext) => ext.clone(),
            Artifact::Expected => options
                .extract_audio
                .clone()
                .or_else(|| options.merge_output_format.clone())
                .unwrap_or_else(|| "mp4".to_string()),
        };
        Some(PathBuf::from(template.replace("%(ext)s", &ext)))
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn fetch_metadata(
        &self,
        _url: &str,
        _options: &FetchOptions,
    ) -> Result<MediaInfo, ExtractorError> {
        match &self.metadata_failure {
            Some(message) => Err(ExtractorError::Failed(message.clone())),
            None => Ok(self.info.clone()),
        }
    }

    async fn fetch_media(
        &self,
        url: &str,
        options: &FetchOptions,
        on_progress: &mut (dyn FnMut(NativeProgress) + Send),
    ) -> Result<(), ExtractorError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((url.to_string(), options.clone()));
        }

        for event in &self.events {
            on_progress(event.clone());
        }

        if let Some(message) = &self.transfer_failure {
            return Err(ExtractorError::Failed(message.clone()));
        }

        if let Some(path) = self.artifact_path(options) {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, vec![0u8; self.artifact_bytes]).await?;
        }

        Ok(())
    }
}
