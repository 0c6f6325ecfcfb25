//! Download domain: format selection, naming, progress and orchestration

pub mod error;
pub mod format;
pub mod naming;
pub mod orchestrator;
pub mod progress;
pub mod request;

pub use error::{DownloadError, ErrorKind, ExtractionFailure, Stage};
pub use format::{AudioCodec, FormatPreference, Quality, UnknownVariant, VideoCodec, format_selector};
pub use naming::{build_filename, sanitize_title, url_fingerprint};
pub use orchestrator::{Downloaded, Orchestrator};
pub use progress::{NullSink, Phase, ProgressAggregator, ProgressEvent, ProgressSink};
pub use request::{DownloadOptions, DownloadRequest, DownloadResult, DownloadStatus};
