use super::{types::EngineConfig, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Copy chunk size is not 0
/// - Worker pool size is not 0
/// - Execution timeout, when set, is not 0
/// - Tool paths are not empty
pub fn validate_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.copy.chunk_size == 0 {
        return Err(ConfigError::ValidationError(
            "copy.chunk_size cannot be 0".to_string(),
        ));
    }

    if config.workers.max_concurrent == 0 {
        return Err(ConfigError::ValidationError(
            "workers.max_concurrent cannot be 0".to_string(),
        ));
    }

    if config.execution.timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "execution.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.tools.gdal_translate.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "tools.gdal_translate cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_chunk_size_fails() {
        let mut config = EngineConfig::default();
        config.copy.chunk_size = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_zero_workers_fails() {
        let mut config = EngineConfig::default();
        config.workers.max_concurrent = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let mut config = EngineConfig::default();
        config.execution.timeout_secs = Some(0);
        assert!(validate_config(&config).is_err());

        config.execution.timeout_secs = Some(30);
        assert!(validate_config(&config).is_ok());
    }
}
