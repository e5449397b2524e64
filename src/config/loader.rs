//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: ProxyConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_minimal_config() {
        let file = write_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:8080"
            "#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
        assert!(config.routes.is_empty());
        assert_eq!(config.shutdown.grace_period_secs, 15);
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
            default_targets = ["http://127.0.0.1:9001"]

            [listener]
            bind_address = "0.0.0.0:8080"

            [admin]
            enabled = true
            api_key = "test-key"
            bind_address = "127.0.0.1:8081"

            [[routes]]
            path = "/api/*"
            methods = ["GET", "POST"]
            priority = 10
            targets = ["http://127.0.0.1:9001", "http://127.0.0.1:9002"]
            algorithm = "weighted"

            [routes.weights]
            "http://127.0.0.1:9001" = 300

            [routes.rate_limit]
            requests_per_second = 5.0
            burst = 10

            [routes.circuit_breaker]
            error_threshold = 5
            timeout_ms = 30000

            [routes.cache]
            enabled = true
            ttl_seconds = 60

            [routes.health_check]
            path = "/healthz"
            interval = 5
            timeout = 2
            "#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.routes.len(), 1);
        let route = &config.routes[0];
        assert_eq!(route.path, "/api/*");
        assert_eq!(route.targets.len(), 2);
        assert_eq!(route.rate_limit.as_ref().unwrap().burst, 10);
        assert_eq!(route.cache.as_ref().unwrap().ttl, 60);
        assert_eq!(route.health_check.as_ref().unwrap().interval, 5);
        assert_eq!(
            route.weights.as_ref().unwrap()["http://127.0.0.1:9001"],
            300
        );
    }

    #[test]
    fn test_parse_error() {
        let file = write_config("not valid toml [[[");
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validation_error_surfaces() {
        let file = write_config(
            r#"
            [listener]
            bind_address = "not-an-address"
            "#,
        );
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/gridplane.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
