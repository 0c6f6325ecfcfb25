use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Handler '{name}' has an empty handler kind")]
    EmptyHandlerKind { name: String },

    #[error("Extractor binary must not be empty")]
    EmptyExtractorBinary,

    #[error("server.port_search_span must be at least 1")]
    ZeroPortSearchSpan,

    #[error("server.max_payload_bytes must be positive")]
    ZeroPayloadLimit,

    #[error("server.cors_origins must list at least one origin (use \"*\" for any)")]
    NoCorsOrigins,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_handlers(config)?;
    validate_extractor(config)?;
    validate_server(config)?;
    Ok(())
}

fn validate_handlers(config: &Config) -> Result<(), ValidationError> {
    for (name, handler) in &config.handlers {
        if handler.handler.trim().is_empty() {
            return Err(ValidationError::EmptyHandlerKind { name: name.clone() });
        }
    }
    Ok(())
}

fn validate_extractor(config: &Config) -> Result<(), ValidationError> {
    if config.extractor.binary.as_os_str().is_empty() {
        return Err(ValidationError::EmptyExtractorBinary);
    }
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if config.server.port_search_span == 0 {
        return Err(ValidationError::ZeroPortSearchSpan);
    }
    if config.server.max_payload_bytes.as_u64() == 0 {
        return Err(ValidationError::ZeroPayloadLimit);
    }
    if config.server.cors_origins.is_empty() {
        return Err(ValidationError::NoCorsOrigins);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::HandlerConfig;
    use crate::humanize::ByteSize;
    use std::path::PathBuf;

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn empty_handler_kind() {
        let mut config = Config::default();
        config
            .handlers
            .insert("broken".to_string(), HandlerConfig::new("  "));

        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyHandlerKind { ref name } if name == "broken"));
    }

    #[test]
    fn server_limits() {
        let mut config = Config::default();
        config.server.port_search_span = 0;
        assert!(matches!(validate(&config), Err(ValidationError::ZeroPortSearchSpan)));

        let mut config = Config::default();
        config.server.max_payload_bytes = ByteSize(0);
        assert!(matches!(validate(&config), Err(ValidationError::ZeroPayloadLimit)));

        let mut config = Config::default();
        config.server.cors_origins.clear();
        assert!(matches!(validate(&config), Err(ValidationError::NoCorsOrigins)));
    }

    #[test]
    fn empty_binary() {
        let mut config = Config::default();
        config.extractor.binary = PathBuf::new();
        assert!(matches!(validate(&config), Err(ValidationError::EmptyExtractorBinary)));
    }
}
