use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata resolved for a URL. Every field is optional: sites vary wildly in
/// what they expose, and unknown fields from the extractor are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    /// `YYYYMMDD`
    pub upload_date: Option<String>,
    pub height: Option<u32>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub extractor_key: Option<String>,
    pub duration: Option<f64>,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    pub uploader: Option<String>,
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub formats: Vec<FormatInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatInfo {
    pub format_id: Option<String>,
    pub format: Option<String>,
    pub ext: Option<String>,
    pub filesize: Option<u64>,
    pub height: Option<u32>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
}

/// Per-call options passed across the extractor boundary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    /// Format selector chain
    pub format: Option<String>,
    /// Output path with an `%(ext)s` placeholder for the final extension
    pub output_template: Option<PathBuf>,
    /// Container to merge separate video/audio streams into
    pub merge_output_format: Option<String>,
    /// Convert the transfer to this audio format after download
    pub extract_audio: Option<String>,
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativeStatus {
    #[default]
    Downloading,
    Finished,
    Error,
}

/// One progress report as emitted by the extractor's progress hook.
///
/// Field names follow the extractor's own dictionary (`_percent_str` and
/// friends); the un-prefixed spellings are accepted too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeProgress {
    pub status: NativeStatus,
    pub filename: Option<String>,
    pub downloaded_bytes: Option<f64>,
    pub total_bytes: Option<f64>,
    pub total_bytes_estimate: Option<f64>,
    #[serde(rename = "_percent_str", alias = "percent_str")]
    pub percent_str: Option<String>,
    pub fragment_index: Option<f64>,
    pub fragment_count: Option<f64>,
    #[serde(rename = "_speed_str", alias = "speed_str")]
    pub speed_str: Option<String>,
    #[serde(rename = "_eta_str", alias = "eta_str")]
    pub eta_str: Option<String>,
    pub error: Option<String>,
}

impl NativeProgress {
    pub fn downloading(filename: &str, downloaded_bytes: f64, total_bytes: f64) -> Self {
        Self {
            status: NativeStatus::Downloading,
            filename: Some(filename.to_string()),
            downloaded_bytes: Some(downloaded_bytes),
            total_bytes: Some(total_bytes),
            ..Self::default()
        }
    }

    pub fn finished(filename: &str) -> Self {
        Self {
            status: NativeStatus::Finished,
            filename: Some(filename.to_string()),
            ..Self::default()
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            status: NativeStatus::Error,
            error: Some(message.to_string()),
            ..Self::default()
        }
    }
}
