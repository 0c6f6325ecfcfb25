//! Boundary to the media-extraction collaborator
//!
//! The extractor is opaque: it resolves metadata for a URL and performs the
//! transfer, reporting progress through a callback. Everything about
//! networking, stream negotiation and muxing stays on its side.
//!
//! - [`YtDlpCli`] drives an installed `yt-dlp` binary
//! - [`ScriptedExtractor`] replays canned metadata and progress, for tests

mod scripted;
mod types;
mod ytdlp;

use async_trait::async_trait;
use thiserror::Error;

pub use scripted::{Artifact, ScriptedExtractor};
pub use types::{FetchOptions, FormatInfo, MediaInfo, NativeProgress, NativeStatus};
pub use ytdlp::YtDlpCli;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("failed to launch {binary}: {source}")]
    Launch {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("extraction failed: {0}")]
    Failed(String),
    #[error("invalid extractor output: {0}")]
    InvalidOutput(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Resolve metadata for `url` without downloading media
    async fn fetch_metadata(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<MediaInfo, ExtractorError>;

    /// Download media for `url`, reporting native progress as it happens.
    ///
    /// `on_progress` is called on the task driving the transfer, in the
    /// order the extractor reports events.
    async fn fetch_media(
        &self,
        url: &str,
        options: &FetchOptions,
        on_progress: &mut (dyn FnMut(NativeProgress) + Send),
    ) -> Result<(), ExtractorError>;
}
