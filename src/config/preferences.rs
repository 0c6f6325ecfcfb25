//! Flat user-preferences file
//!
//! A small JSON document holding the download directory and default
//! quality/codecs. It is merged over built-in defaults on every load and
//! created with those defaults on first access. Keys this version does not
//! know about are kept and written back unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::download::{AudioCodec, DownloadOptions, Quality, VideoCodec};

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to access preferences file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    #[serde(default)]
    pub default_quality: Quality,
    #[serde(default)]
    pub default_video_codec: VideoCodec,
    #[serde(default)]
    pub default_audio_codec: AudioCodec,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            default_quality: Quality::default(),
            default_video_codec: VideoCodec::default(),
            default_audio_codec: AudioCodec::default(),
            extra: Map::new(),
        }
    }
}

/// `~/Downloads/wizwam`
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
        .join("wizwam")
}

impl Preferences {
    /// Last layer of option resolution, after the request and the
    /// handler's own defaults.
    pub fn fallback_options(&self) -> DownloadOptions {
        DownloadOptions {
            quality: Some(self.default_quality),
            video_codec: Some(self.default_video_codec),
            audio_codec: Some(self.default_audio_codec),
            audio_only: Some(false),
            output_dir: Some(self.download_dir.clone()),
            verbose: false,
        }
    }
}

/// Preferences file. Nothing is cached: every load reads the file again,
/// so edits made outside the process are picked up.
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file, creating it with defaults when missing. An unreadable
    /// or malformed file yields defaults and a warning. Blocking.
    pub fn load(&self) -> Preferences {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "Malformed preferences file, using defaults");
                Preferences::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let prefs = Preferences::default();
                if let Err(e) = self.save(&prefs) {
                    warn!(error = %e, "Could not create preferences file");
                }
                prefs
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cannot read preferences file, using defaults");
                Preferences::default()
            }
        }
    }

    pub fn save(&self, prefs: &Preferences) -> Result<(), PreferencesError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let encoded = serde_json::to_string_pretty(prefs)?;
        std::fs::write(&self.path, encoded).map_err(|source| self.io_error(source))?;
        debug!(path = %self.path.display(), "Preferences saved");
        Ok(())
    }

    pub fn set_download_dir(&self, dir: impl Into<PathBuf>) -> Result<Preferences, PreferencesError> {
        let mut prefs = self.load();
        prefs.download_dir = dir.into();
        self.save(&prefs)?;
        Ok(prefs)
    }

    fn io_error(&self, source: std::io::Error) -> PreferencesError {
        PreferencesError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
