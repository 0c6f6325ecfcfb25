use std::path::{Component, Path};
use thiserror::Error;

use super::models::ValidateDirResponse;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestValidationError {
    #[error("URL is required")]
    MissingUrl,
    #[error("URL must be an http or https address")]
    UnsupportedUrl,
    #[error("Path is required")]
    MissingPath,
    #[error("Path must be absolute")]
    RelativePath,
    #[error("Path is not a directory")]
    NotADirectory,
    #[error("Directory is not writable")]
    NotWritable,
    #[error("Cannot create directory (parent not writable)")]
    ParentNotWritable,
    #[error("invalid file name '{0}'")]
    InvalidFileName(String),
}

/// Returns the trimmed URL when it is a non-empty http(s) address.
pub fn validate_url(raw: &str) -> Result<&str, RequestValidationError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(RequestValidationError::MissingUrl);
    }

    let lowered = url.to_ascii_lowercase();
    let rest = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .ok_or(RequestValidationError::UnsupportedUrl)?;
    if rest.is_empty() {
        return Err(RequestValidationError::UnsupportedUrl);
    }

    Ok(url)
}

/// A file name inside the download directory: a single normal path
/// component, never a separator or `..`.
pub fn validate_file_name(name: &str) -> Result<&str, RequestValidationError> {
    let invalid = || RequestValidationError::InvalidFileName(name.to_string());

    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(invalid());
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(invalid()),
    }
}

/// Checks that `raw` could serve as a download directory without changing
/// anything on disk.
pub fn inspect_directory(raw: &str) -> Result<ValidateDirResponse, RequestValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(RequestValidationError::MissingPath);
    }

    let path = Path::new(raw);
    if !path.is_absolute() {
        return Ok(ValidateDirResponse::invalid(RequestValidationError::RelativePath.to_string()));
    }

    let verdict = match std::fs::metadata(path) {
        Ok(meta) if !meta.is_dir() => Err(RequestValidationError::NotADirectory),
        Ok(meta) if meta.permissions().readonly() => Err(RequestValidationError::NotWritable),
        Ok(_) => Ok(ValidateDirResponse::valid(true)),
        Err(_) => match path.parent().map(std::fs::metadata) {
            Some(Ok(parent)) if parent.is_dir() && !parent.permissions().readonly() => {
                Ok(ValidateDirResponse::valid(false))
            }
            _ => Err(RequestValidationError::ParentNotWritable),
        },
    };

    Ok(verdict.unwrap_or_else(|e| ValidateDirResponse::invalid(e.to_string())))
}

/// Absolute download directory, created if missing.
pub fn prepare_directory(raw: &str) -> Result<&Path, RequestValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(RequestValidationError::MissingPath);
    }
    let path = Path::new(raw);
    if !path.is_absolute() {
        return Err(RequestValidationError::RelativePath);
    }
    if path.exists() && !path.is_dir() {
        return Err(RequestValidationError::NotADirectory);
    }
    std::fs::create_dir_all(path).map_err(|_| RequestValidationError::ParentNotWritable)?;
    Ok(path)
}
