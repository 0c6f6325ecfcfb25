//! Request and response bodies for the `/api` endpoints.
//!
//! A download submission looks like:
//!
//! ```json
//! {
//!   "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
//!   "quality": "1080p",
//!   "video_codec": "avc1",
//!   "audio_codec": "m4a",
//!   "audio_only": false,
//!   "handler": "yt-dlp",
//!   "processors": ["title-capitalizer"]
//! }
//! ```
//!
//! Everything except `url` is optional; absent fields come from the user
//! preferences file. The response only acknowledges the job, progress and
//! the final result arrive on `GET /api/events`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::download::{AudioCodec, DownloadOptions, Quality, VideoCodec};
use crate::extractor::{FormatInfo, MediaInfo};
use crate::handlers::HandlerInfo;
use crate::observability::MetricsSnapshot;

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadSubmission {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub quality: Option<Quality>,
    #[serde(default)]
    pub video_codec: Option<VideoCodec>,
    #[serde(default)]
    pub audio_codec: Option<AudioCodec>,
    #[serde(default)]
    pub audio_only: Option<bool>,
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub processors: Vec<String>,
}

impl DownloadSubmission {
    pub fn options(&self) -> DownloadOptions {
        DownloadOptions {
            quality: self.quality,
            video_codec: self.video_codec,
            audio_codec: self.audio_codec,
            audio_only: self.audio_only,
            output_dir: None,
            verbose: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JobAcceptedResponse {
    pub job_id: String,
    pub status: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InfoRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FormatSummary {
    pub format_id: Option<String>,
    pub format: Option<String>,
    pub ext: Option<String>,
    pub filesize: Option<u64>,
}

impl From<&FormatInfo> for FormatSummary {
    fn from(format: &FormatInfo) -> Self {
        Self {
            format_id: format.format_id.clone(),
            format: format.format.clone(),
            ext: format.ext.clone(),
            filesize: format.filesize,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InfoResponse {
    pub title: String,
    pub url: String,
    pub duration: Option<f64>,
    pub formats: Vec<FormatSummary>,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    pub uploader: Option<String>,
    pub upload_date: Option<String>,
}

impl InfoResponse {
    pub fn from_info(url: &str, info: &MediaInfo) -> Self {
        Self {
            title: info.title.clone().unwrap_or_else(|| "Unknown".to_string()),
            url: url.to_string(),
            duration: info.duration,
            formats: info.formats.iter().map(FormatSummary::from).collect(),
            thumbnail: info.thumbnail.clone(),
            description: info.description.clone(),
            uploader: info.uploader.clone(),
            upload_date: info.upload_date.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PluginsResponse {
    pub plugins: Vec<HandlerInfo>,
}

#[derive(Debug, Serialize)]
pub struct CodecOption {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub version: &'static str,
    pub download_dir: PathBuf,
    pub default_quality: Quality,
    pub default_video_codec: VideoCodec,
    pub default_audio_codec: AudioCodec,
    pub qualities: Vec<&'static str>,
    pub video_codecs: Vec<CodecOption>,
    pub audio_codecs: Vec<CodecOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadDirRequest {
    #[serde(default)]
    pub download_dir: String,
}

#[derive(Debug, Serialize)]
pub struct DownloadDirResponse {
    pub status: &'static str,
    pub download_dir: PathBuf,
    pub message: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateDirRequest {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateDirResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidateDirResponse {
    pub fn valid(exists: bool) -> Self {
        Self {
            valid: true,
            exists: Some(exists),
            message: (!exists).then(|| "Directory will be created".to_string()),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            exists: None,
            message: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub size_human: String,
    /// Seconds since the Unix epoch
    pub modified: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FilesResponse {
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Serialize)]
pub struct DeleteFileResponse {
    pub status: &'static str,
    pub filename: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub jobs: MetricsSnapshot,
}
