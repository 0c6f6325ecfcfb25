use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which collaborator call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Metadata,
    Transfer,
}

/// Sanitized classification of a collaborator failure. The raw text is kept
/// for logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionFailure {
    Unavailable,
    Private,
    NotFound,
    Generic,
}

impl ExtractionFailure {
    pub fn classify(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        if lowered.contains("unavailable") {
            ExtractionFailure::Unavailable
        } else if lowered.contains("private") {
            ExtractionFailure::Private
        } else if lowered.contains("not found") {
            ExtractionFailure::NotFound
        } else {
            ExtractionFailure::Generic
        }
    }

    /// User-facing text. Generic failures are worded by stage.
    pub fn message(self, stage: Stage) -> &'static str {
        match (self, stage) {
            (ExtractionFailure::Unavailable, _) => "Video is unavailable",
            (ExtractionFailure::Private, _) => "Video is private",
            (ExtractionFailure::NotFound, _) => "Video not found",
            (ExtractionFailure::Generic, Stage::Metadata) => "Failed to retrieve video information",
            (ExtractionFailure::Generic, Stage::Transfer) => "Failed to download video",
        }
    }
}

/// Terminal failure of one download job. `Display` is always the sanitized,
/// user-facing message.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("{}", sanitized(.failure, .stage))]
    Extraction {
        stage: Stage,
        failure: ExtractionFailure,
    },
    #[error("Downloaded file not found")]
    ArtifactMissing { expected: PathBuf },
    #[error("Cannot prepare download directory")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn sanitized(failure: &ExtractionFailure, stage: &Stage) -> &'static str {
    failure.message(*stage)
}

impl DownloadError {
    pub fn extraction(stage: Stage, raw: &str) -> Self {
        DownloadError::Extraction {
            stage,
            failure: ExtractionFailure::classify(raw),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DownloadError::Extraction { failure, .. } => match failure {
                ExtractionFailure::Unavailable => ErrorKind::Unavailable,
                ExtractionFailure::Private => ErrorKind::Private,
                ExtractionFailure::NotFound => ErrorKind::NotFound,
                ExtractionFailure::Generic => ErrorKind::Generic,
            },
            DownloadError::ArtifactMissing { .. } => ErrorKind::ArtifactMissing,
            DownloadError::Storage { .. } => ErrorKind::Storage,
        }
    }
}

/// Stable error classification carried in download results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unavailable,
    Private,
    NotFound,
    Generic,
    ArtifactMissing,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Private => "private",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Generic => "generic",
            ErrorKind::ArtifactMissing => "artifact_missing",
            ErrorKind::Storage => "storage",
        };
        f.write_str(name)
    }
}
