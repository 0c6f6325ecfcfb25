use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::download::{NullSink, ProgressSink};

/// How to build one handler instance: a catalog kind, an optional instance
/// name and free-form options. Read from `[handlers.<name>]` config tables
/// and from discovery manifests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    pub handler: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub options: Value,
}

impl HandlerConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            handler: kind.into(),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    /// Instance name, falling back to `default` when unset or blank.
    pub fn name_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(default)
    }
}

/// Input to one handler execution
#[derive(Clone, Default)]
pub struct ExecutionContext {
    pub job_id: String,
    pub values: Map<String, Value>,
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl ExecutionContext {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Non-empty `url` string, if present
    pub fn url(&self) -> Option<&str> {
        self.get("url")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    /// `data` payload, if present and not empty
    pub fn data(&self) -> Option<&Value> {
        self.get("data").filter(|data| !is_empty_value(data))
    }

    pub fn options(&self) -> Option<&Value> {
        self.get("options").filter(|options| !options.is_null())
    }

    /// Options consulted after the handler's own defaults
    pub fn fallback(&self) -> Option<&Value> {
        self.get("fallback").filter(|fallback| !fallback.is_null())
    }

    pub fn sink(&self) -> &dyn ProgressSink {
        match &self.progress {
            Some(sink) => sink.as_ref(),
            None => &NullSink,
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("job_id", &self.job_id)
            .field("values", &self.values)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Registry listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn context_accessors() {
        let ctx = ExecutionContext::new("job")
            .with_value("url", "  https://example.com  ")
            .with_value("data", json!({}))
            .with_value("options", Value::Null);

        assert_eq!(ctx.url(), Some("https://example.com"));
        assert!(ctx.data().is_none());
        assert!(ctx.options().is_none());

        let ctx = ExecutionContext::new("job")
            .with_value("url", "")
            .with_value("data", json!({"title": "x"}));
        assert!(ctx.url().is_none());
        assert_eq!(ctx.data(), Some(&json!({"title": "x"})));
    }

    #[test]
    fn handler_config_from_toml() {
        let config: HandlerConfig = toml::from_str(
            r#"
            handler = "yt-dlp"
            name = "archive"

            [options]
            quality = "1080p"
            output_dir = "/srv/media"
            "#,
        )
        .unwrap();

        assert_eq!(config.handler, "yt-dlp");
        assert_eq!(config.name_or("yt-dlp"), "archive");
        assert_eq!(config.options["quality"], "1080p");

        let bare: HandlerConfig = toml::from_str(r#"handler = "title-capitalizer""#).unwrap();
        assert!(bare.options.is_null());
        assert_eq!(bare.name_or("title-capitalizer"), "title-capitalizer");
    }

    #[test]
    fn info_serializes_type_field() {
        let info = HandlerInfo {
            name: "yt-dlp".into(),
            version: "1.0.0".into(),
            description: "d".into(),
            kind: "downloader".into(),
        };
        assert_eq!(serde_json::to_value(info).unwrap()["type"], "downloader");
    }
}
