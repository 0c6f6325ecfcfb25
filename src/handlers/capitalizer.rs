use async_trait::async_trait;
use serde_json::Value;

use super::traits::{Handler, HandlerError, Processor};
use super::types::{ExecutionContext, HandlerConfig};

/// Processor that upper-cases the `title` field of a result object
#[derive(Debug, Clone)]
pub struct TitleCapitalizer {
    name: String,
}

impl TitleCapitalizer {
    pub const KIND: &'static str = "title-capitalizer";

    pub fn new() -> Self {
        Self {
            name: Self::KIND.to_string(),
        }
    }

    pub fn from_config(config: &HandlerConfig) -> Self {
        Self {
            name: config.name_or(Self::KIND).to_string(),
        }
    }
}

impl Default for TitleCapitalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for TitleCapitalizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Capitalizes video titles"
    }

    fn as_processor(&self) -> Option<&dyn Processor> {
        Some(self)
    }
}

#[async_trait]
impl Processor for TitleCapitalizer {
    async fn process(&self, mut data: Value, _ctx: &ExecutionContext) -> Result<Value, HandlerError> {
        if let Some(Value::String(title)) = data.get_mut("title") {
            *title = title.to_uppercase();
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn uppercases_title_only() {
        let ctx = ExecutionContext::new("job")
            .with_value("data", json!({"title": "Never gonna", "url": "https://x/y"}));
        let out = TitleCapitalizer::new().execute(&ctx).await.unwrap();
        assert_eq!(out, json!({"title": "NEVER GONNA", "url": "https://x/y"}));
    }

    #[tokio::test]
    async fn passes_through_without_title() {
        let ctx = ExecutionContext::new("job").with_value("data", json!({"status": "error"}));
        let out = TitleCapitalizer::new().execute(&ctx).await.unwrap();
        assert_eq!(out, json!({"status": "error"}));
    }

    #[tokio::test]
    async fn requires_data() {
        let err = TitleCapitalizer::new()
            .execute(&ExecutionContext::new("job"))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::MissingArgument("data")));
    }
}
