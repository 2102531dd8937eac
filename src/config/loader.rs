//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides the listener bind address.
pub const ENV_BIND_ADDRESS: &str = "ZEUS_BIND_ADDRESS";

/// Prefix of per-resource base URL overrides, e.g. `ZEUS_UPSTREAM_FRANJA_PRECIOS`.
pub const ENV_UPSTREAM_PREFIX: &str = "ZEUS_UPSTREAM_";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from a TOML file, apply environment overrides, validate.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, |key| std::env::var(key).ok())
}

/// Parse and validate configuration text. `env` resolves override variables.
pub fn parse_config<F>(content: &str, env: F) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: ProxyConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, env);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Environment variable name overriding a resource's base URL.
pub fn upstream_env_key(resource_name: &str) -> String {
    let suffix: String = resource_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{ENV_UPSTREAM_PREFIX}{suffix}")
}

/// Replace configured values with deployment-specific ones.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(bind) = env(ENV_BIND_ADDRESS).filter(|v| !v.trim().is_empty()) {
        tracing::debug!(bind_address = %bind, "Bind address overridden from environment");
        config.listener.bind_address = bind;
    }

    for resource in &mut config.resources {
        let key = upstream_env_key(&resource.name);
        if let Some(url) = env(&key).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(resource = %resource.name, env = %key, "Base URL overridden from environment");
            resource.base_url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [listener]
        bind_address = "127.0.0.1:8080"

        [[resources]]
        name = "franja-precios"
        path = "/api/franja-precios"
        base_url = "http://127.0.0.1:9000/precios"
        methods = ["GET", "POST", "PUT", "DELETE"]
    "#;

    #[test]
    fn env_key_is_upper_snake() {
        assert_eq!(upstream_env_key("franja-precios"), "ZEUS_UPSTREAM_FRANJA_PRECIOS");
        assert_eq!(upstream_env_key("consulta ruc"), "ZEUS_UPSTREAM_CONSULTA_RUC");
    }

    #[test]
    fn overrides_replace_bind_and_base_url() {
        let env: HashMap<&str, &str> = [
            ("ZEUS_BIND_ADDRESS", "0.0.0.0:9999"),
            ("ZEUS_UPSTREAM_FRANJA_PRECIOS", "https://precios.internal/api"),
        ]
        .into_iter()
        .collect();

        let config = parse_config(SAMPLE, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:9999");
        assert_eq!(config.resources[0].base_url, "https://precios.internal/api");
    }

    #[test]
    fn invalid_override_fails_validation() {
        let err = parse_config(SAMPLE, |k| {
            (k == "ZEUS_UPSTREAM_FRANJA_PRECIOS").then(|| "not a url".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("franja-precios"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.resources.len(), 1);
    }

    #[test]
    fn shipped_config_is_valid() {
        let content = include_str!("../../config/zeus.toml");
        let config = parse_config(content, |_| None).unwrap();
        assert!(config.resources.iter().any(|r| r.name == "franja-precios"));
    }

    #[test]
    fn syntax_error_is_parse_error() {
        let err = parse_config("[[resources]\nname=", |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
