use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::EngineConfig, ConfigError};

/// Load configuration from file with environment variable overrides
///
/// Environment variables use the `RASTERCHAIN_` prefix and `__` between
/// sections, e.g. `RASTERCHAIN_COPY__CHUNK_SIZE=4096`.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: EngineConfig = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("RASTERCHAIN_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<EngineConfig, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[copy]
chunk_size = 2048
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.copy.chunk_size, 2048);
    }

    #[test]
    fn test_load_config_from_str_wrong_type() {
        let toml = r#"
[copy]
chunk_size = "big"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/rasterchain.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[scratch]
prefix = "cpy"

[workers]
max_concurrent = 2
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.scratch.prefix, "cpy");
        assert_eq!(config.workers.max_concurrent, 2);
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "rasterchain.toml",
                r#"
[copy]
chunk_size = 2048
"#,
            )?;
            jail.set_env("RASTERCHAIN_COPY__CHUNK_SIZE", "4096");

            let config = load_config(Path::new("rasterchain.toml")).unwrap();
            assert_eq!(config.copy.chunk_size, 4096);
            Ok(())
        });
    }
}
