//! Quality tiers, codec preferences and the format selector handed to the
//! extractor.
//!
//! The selector is a slash-delimited preference chain: the extractor picks
//! the first entry it can satisfy, so the chain always ends in `best` and
//! selection never fails outright.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Target vertical resolution tier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum Quality {
    #[serde(rename = "4k")]
    #[value(name = "4k")]
    Uhd4k,
    #[serde(rename = "1080p")]
    #[value(name = "1080p")]
    P1080,
    #[default]
    #[serde(rename = "720p")]
    #[value(name = "720p")]
    P720,
    #[serde(rename = "480p")]
    #[value(name = "480p")]
    P480,
    #[serde(rename = "360p")]
    #[value(name = "360p")]
    P360,
}

impl Quality {
    pub const ALL: [Quality; 5] = [
        Quality::Uhd4k,
        Quality::P1080,
        Quality::P720,
        Quality::P480,
        Quality::P360,
    ];

    pub fn height(self) -> u32 {
        match self {
            Quality::Uhd4k => 2160,
            Quality::P1080 => 1080,
            Quality::P720 => 720,
            Quality::P480 => 480,
            Quality::P360 => 360,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Uhd4k => "4k",
            Quality::P1080 => "1080p",
            Quality::P720 => "720p",
            Quality::P480 => "480p",
            Quality::P360 => "360p",
        }
    }
}

/// Preferred video codec
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum VideoCodec {
    #[default]
    Avc1,
    Av1,
    Vp9,
}

impl VideoCodec {
    pub const ALL: [VideoCodec; 3] = [VideoCodec::Avc1, VideoCodec::Av1, VideoCodec::Vp9];

    pub fn as_str(self) -> &'static str {
        match self {
            VideoCodec::Avc1 => "avc1",
            VideoCodec::Av1 => "av1",
            VideoCodec::Vp9 => "vp9",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            VideoCodec::Avc1 => "H.264 (best compatibility)",
            VideoCodec::Av1 => "AV1 (best compression)",
            VideoCodec::Vp9 => "VP9 (good compression)",
        }
    }
}

/// Preferred audio codec
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum AudioCodec {
    #[default]
    M4a,
    Opus,
    Mp3,
}

impl AudioCodec {
    pub const ALL: [AudioCodec; 3] = [AudioCodec::M4a, AudioCodec::Opus, AudioCodec::Mp3];

    pub fn as_str(self) -> &'static str {
        match self {
            AudioCodec::M4a => "m4a",
            AudioCodec::Opus => "opus",
            AudioCodec::Mp3 => "mp3",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AudioCodec::M4a => "AAC (best compatibility)",
            AudioCodec::Opus => "Opus (best quality)",
            AudioCodec::Mp3 => "MP3 (universal)",
        }
    }
}

macro_rules! str_conversions {
    ($ty:ty, $kind:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase();
                Self::ALL
                    .into_iter()
                    .find(|variant| variant.as_str() == wanted)
                    .ok_or_else(|| UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

str_conversions!(Quality, "quality");
str_conversions!(VideoCodec, "video codec");
str_conversions!(AudioCodec, "audio codec");

/// Inputs to the format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatPreference {
    pub quality: Quality,
    pub video_codec: VideoCodec,
    pub audio_codec: AudioCodec,
    pub audio_only: bool,
}

impl FormatPreference {
    /// Builds the extractor format selector for this preference.
    pub fn selector(&self) -> String {
        format_selector(self.quality, self.video_codec, self.audio_codec, self.audio_only)
    }

    /// Extension of the artifact the transfer is expected to produce.
    pub fn output_extension(&self) -> &'static str {
        if self.audio_only {
            self.audio_codec.as_str()
        } else {
            "mp4"
        }
    }
}

/// Builds an ordered, slash-delimited preference chain.
///
/// Video chains go: requested codec, H.264 MP4, any MP4, WebM, any video
/// within the height cap, then `best`. Audio-only chains skip video entirely.
pub fn format_selector(
    quality: Quality,
    video_codec: VideoCodec,
    audio_codec: AudioCodec,
    audio_only: bool,
) -> String {
    if audio_only {
        return match audio_codec {
            AudioCodec::Opus => "bestaudio[acodec=opus]/bestaudio[ext=webm]/bestaudio/best",
            AudioCodec::Mp3 => "bestaudio[acodec=mp3]/bestaudio/best",
            AudioCodec::M4a => "bestaudio[acodec=aac]/bestaudio[ext=m4a]/bestaudio/best",
        }
        .to_string();
    }

    let height = quality.height();
    let h264 = format!("bestvideo[vcodec=avc1][ext=mp4][height<={height}]+bestaudio[ext=m4a]");

    let requested = match video_codec {
        VideoCodec::Avc1 => h264.clone(),
        VideoCodec::Av1 => {
            format!("bestvideo[vcodec^=av01][ext=mp4][height<={height}]+bestaudio[ext=m4a]")
        }
        VideoCodec::Vp9 => format!("bestvideo[vcodec=vp9][ext=webm][height<={height}]+bestaudio"),
    };

    let chain = [
        requested,
        h264,
        format!("bestvideo[ext=mp4][height<={height}]+bestaudio[ext=m4a]"),
        format!("bestvideo[ext=webm][height<={height}]+bestaudio"),
        format!("bestvideo[height<={height}]+bestaudio"),
        "best".to_string(),
    ];

    let mut entries: Vec<String> = Vec::with_capacity(chain.len());
    for entry in chain {
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }

    entries.join("/")
}
