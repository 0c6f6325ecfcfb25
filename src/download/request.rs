use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::{DownloadError, ErrorKind};
use super::format::{AudioCodec, FormatPreference, Quality, VideoCodec};

/// Caller-supplied download options. Absent fields are filled from the
/// handler's defaults, then from the user preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Quality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<VideoCodec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<AudioCodec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub verbose: bool,
}

impl DownloadOptions {
    /// Fills every absent field from `defaults`.
    pub fn or(self, defaults: &DownloadOptions) -> Self {
        Self {
            quality: self.quality.or(defaults.quality),
            video_codec: self.video_codec.or(defaults.video_codec),
            audio_codec: self.audio_codec.or(defaults.audio_codec),
            audio_only: self.audio_only.or(defaults.audio_only),
            output_dir: self.output_dir.or_else(|| defaults.output_dir.clone()),
            verbose: self.verbose || defaults.verbose,
        }
    }
}

/// Fully resolved download request: URL and destination are always present.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub url: String,
    pub preference: FormatPreference,
    pub output_dir: PathBuf,
    pub verbose: bool,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            preference: FormatPreference::default(),
            output_dir: output_dir.into(),
            verbose: false,
        }
    }

    /// Resolves options against defaults. Returns `None` when no output
    /// directory is known.
    pub fn resolve(
        url: &str,
        options: &DownloadOptions,
        fallback_dir: Option<&Path>,
    ) -> Option<Self> {
        let output_dir = options
            .output_dir
            .clone()
            .or_else(|| fallback_dir.map(Path::to_path_buf))?;

        Some(Self {
            url: url.to_string(),
            preference: FormatPreference {
                quality: options.quality.unwrap_or_default(),
                video_codec: options.video_codec.unwrap_or_default(),
                audio_codec: options.audio_codec.unwrap_or_default(),
                audio_only: options.audio_only.unwrap_or(false),
            },
            output_dir,
            verbose: options.verbose,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Success,
    Error,
}

/// Final record of one job, handed to the caller once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadResult {
    pub status: DownloadStatus,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl DownloadResult {
    pub fn success(url: &str, filename: PathBuf, filesize: String, title: Option<String>) -> Self {
        Self {
            status: DownloadStatus::Success,
            url: url.to_string(),
            filename: Some(filename),
            filesize: Some(filesize),
            title,
            error: None,
            error_kind: None,
        }
    }

    pub fn failure(url: &str, error: &DownloadError) -> Self {
        Self {
            status: DownloadStatus::Error,
            url: url.to_string(),
            filename: None,
            filesize: None,
            title: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DownloadStatus::Success
    }
}
