//! API utility functions
//!
//! Pure, stateless helper functions for HTTP request processing.

use axum::http::HeaderMap;
use http_body_util::LengthLimitError;
use serde::de::DeserializeOwned;

use crate::api::error::ApiError;

/// Parses and validates Content-Type header for application/json
///
/// Accepts:
/// - `application/json`
/// - `application/json; charset=utf-8`
///
/// Rejects:
/// - `application/jsonp`
/// - `application/json-patch+json`
/// - `text/json`
/// - Malformed media types
pub fn parse_content_type(content_type: &str) -> Result<mime::Mime, ApiError> {
    let media_type: mime::Mime = content_type.parse().map_err(|_| {
        ApiError::InvalidPayload(format!("invalid Content-Type: {}", content_type))
    })?;

    if media_type.type_() != mime::APPLICATION || media_type.subtype() != mime::JSON {
        return Err(ApiError::InvalidPayload(format!(
            "Content-Type must be application/json, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    Ok(media_type)
}

/// Validates that body size does not exceed the maximum allowed size
pub fn validate_body_size(data: &[u8], max_size: usize) -> Result<(), ApiError> {
    if data.len() > max_size {
        return Err(ApiError::PayloadTooLarge(max_size));
    }
    Ok(())
}

/// Checks the Content-Type, reads the body within `max_size` and decodes it
/// as JSON.
pub async fn read_json<T: DeserializeOwned>(
    headers: &HeaderMap,
    body: axum::body::Body,
    max_size: usize,
) -> Result<T, ApiError> {
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;
    parse_content_type(content_type)?;

    // Decompression already happened in RequestDecompressionLayer
    let data = axum::body::to_bytes(body, max_size.saturating_add(1))
        .await
        .map_err(|err| {
            let inner = err.into_inner();
            if inner.is::<LengthLimitError>() {
                ApiError::PayloadTooLarge(max_size)
            } else {
                ApiError::InvalidPayload(inner.to_string())
            }
        })?;
    validate_body_size(&data, max_size)?;

    Ok(serde_json::from_slice(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_type_valid() {
        assert!(parse_content_type("application/json").is_ok());
        assert!(parse_content_type("application/json; charset=utf-8").is_ok());
        assert!(parse_content_type("application/json; charset=UTF-8").is_ok());
    }

    #[test]
    fn test_parse_content_type_invalid() {
        assert!(parse_content_type("application/jsonp").is_err());
        assert!(parse_content_type("application/json-patch+json").is_err());
        assert!(parse_content_type("text/json").is_err());
        assert!(parse_content_type("text/plain").is_err());
        assert!(parse_content_type("invalid").is_err());
        assert!(parse_content_type("").is_err());
    }

    #[test]
    fn test_validate_body_size() {
        let data = vec![0u8; 1000];
        assert!(validate_body_size(&data, 1000).is_ok());
        assert!(matches!(
            validate_body_size(&data, 999),
            Err(ApiError::PayloadTooLarge(999))
        ));
    }

    #[tokio::test]
    async fn read_json_checks_headers_and_size() {
        let mut headers = HeaderMap::new();
        let body = || axum::body::Body::from(r#"{"url": "https://example.com"}"#);

        let missing: Result<serde_json::Value, _> = read_json(&headers, body(), 1024).await;
        assert!(matches!(missing, Err(ApiError::InvalidPayload(_))));

        headers.insert(
            axum::http::header::CONTENT_TYPE,
            "application/json".parse().unwrap(),
        );
        let value: serde_json::Value = read_json(&headers, body(), 1024).await.unwrap();
        assert_eq!(value["url"], "https://example.com");

        let too_big: Result<serde_json::Value, _> = read_json(&headers, body(), 8).await;
        assert!(matches!(too_big, Err(ApiError::PayloadTooLarge(_))));
    }
}
