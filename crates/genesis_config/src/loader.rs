//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::GenesisConfig;
use std::path::Path;

/// Name of the configuration file in the project root.
pub const CONFIG_FILE: &str = "genesis.toml";

/// Upper bound for `parser.nearby_tokens`.
const MAX_NEARBY_TOKENS: usize = 16;

/// Loads `<project_dir>/genesis.toml`.
///
/// A missing file is not an error: it yields the default configuration.
pub fn load_config(project_dir: &Path) -> Result<GenesisConfig, ConfigError> {
    let path = project_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(GenesisConfig::default());
    }
    let content = std::fs::read_to_string(&path)?;
    load_config_from_str(&content)
}

/// Parses and validates configuration text.
pub fn load_config_from_str(content: &str) -> Result<GenesisConfig, ConfigError> {
    let config: GenesisConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &GenesisConfig) -> Result<(), ConfigError> {
    if config.cache.path.as_os_str().is_empty() {
        return Err(invalid("cache.path", "must not be empty"));
    }
    if config.cache.declaration_keywords.is_empty() {
        return Err(invalid(
            "cache.declaration_keywords",
            "at least one keyword is required",
        ));
    }
    if let Some(bad) = config
        .cache
        .declaration_keywords
        .iter()
        .find(|k| k.is_empty() || !k.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
    {
        return Err(invalid(
            "cache.declaration_keywords",
            &format!("'{bad}' is not a plain identifier"),
        ));
    }
    if config.parser.nearby_tokens > MAX_NEARBY_TOKENS {
        return Err(invalid(
            "parser.nearby_tokens",
            &format!("must be at most {MAX_NEARBY_TOKENS}"),
        ));
    }
    Ok(())
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
