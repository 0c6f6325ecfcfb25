//! Deterministic output names
//!
//! Layout: `{date}_{title}_{height}p_{vcodec}_{acodec}__{site}_{id}`. Same
//! metadata and URL always give the same name; the site/id suffix keeps
//! different content from sharing one in a shared download directory.

use chrono::{Local, NaiveDate};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

use super::format::Quality;
use crate::extractor::MediaInfo;

pub const MAX_TITLE_CHARS: usize = 100;
const MAX_CODEC_CHARS: usize = 20;
const FALLBACK_ID_CHARS: usize = 10;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{2,}").expect("valid regex"));

/// Makes a title safe for use as a filename segment.
pub fn sanitize_title(title: &str) -> String {
    // Tabs and newlines become separators, not stripped control chars
    let spaced = WHITESPACE.replace_all(title, "_");
    let stripped = UNSAFE_CHARS.replace_all(&spaced, "");
    let collapsed = UNDERSCORES.replace_all(&stripped, "_");

    let truncated: String = collapsed
        .trim_matches('_')
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect();

    truncated.trim_end_matches('_').to_string()
}

/// Stable fallback identifier: first 10 hex characters of SHA-256(url).
pub fn url_fingerprint(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(FALLBACK_ID_CHARS);
    encoded
}

/// Builds the base filename (no extension), dating undated media today.
pub fn build_filename(info: &MediaInfo, quality: Quality, url: &str) -> String {
    build_filename_on(info, quality, url, Local::now().date_naive())
}

/// Same as [`build_filename`] with an explicit fallback date.
pub fn build_filename_on(
    info: &MediaInfo,
    quality: Quality,
    url: &str,
    today: NaiveDate,
) -> String {
    let date = non_empty(info.upload_date.as_deref())
        .map(segment)
        .unwrap_or_else(|| today.format("%Y%m%d").to_string());

    let title = match sanitize_title(info.title.as_deref().unwrap_or_default()) {
        t if t.is_empty() => "video".to_string(),
        t => t,
    };

    let height = info.height.unwrap_or_else(|| quality.height());

    let vcodec = codec_segment(info.vcodec.as_deref());
    let acodec = codec_segment(info.acodec.as_deref());

    let site = non_empty(info.extractor_key.as_deref())
        .map(|key| segment(key).to_lowercase())
        .unwrap_or_else(|| "site".to_string());

    let id = non_empty(info.id.as_deref())
        .map(segment)
        .unwrap_or_else(|| url_fingerprint(url));

    format!("{date}_{title}_{height}p_{vcodec}_{acodec}__{site}_{id}")
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn segment(value: &str) -> String {
    UNSAFE_CHARS.replace_all(value, "").into_owned()
}

fn codec_segment(codec: Option<&str>) -> String {
    match non_empty(codec) {
        Some(codec) => segment(codec).chars().take(MAX_CODEC_CHARS).collect(),
        None => "unknown".to_string(),
    }
}
