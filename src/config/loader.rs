//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use crate::config::schema::EntrypointConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable selecting the server mode.
pub const MODE_ENV: &str = "DJANGO_ENV";

/// Environment variables overriding the administrator account.
pub const ADMIN_USERNAME_ENV: &str = "DJANGO_SUPERUSER_USERNAME";
pub const ADMIN_EMAIL_ENV: &str = "DJANGO_SUPERUSER_EMAIL";
pub const ADMIN_PASSWORD_ENV: &str = "DJANGO_SUPERUSER_PASSWORD";

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

/// Parse a TOML configuration file without applying overrides.
pub fn load_config(path: &Path) -> Result<EntrypointConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Overlay environment variables onto a loaded configuration.
///
/// `lookup` abstracts `std::env::var` so callers can inject a fixed
/// environment. An empty `DJANGO_ENV` still counts as set and selects
/// development mode.
pub fn apply_env_overrides<F>(config: &mut EntrypointConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(mode) = lookup(MODE_ENV) {
        config.server.mode = Some(mode);
    }
    if let Some(username) = lookup(ADMIN_USERNAME_ENV).filter(|v| !v.is_empty()) {
        config.admin.username = username;
    }
    if let Some(email) = lookup(ADMIN_EMAIL_ENV).filter(|v| !v.is_empty()) {
        config.admin.email = email;
    }
    if let Some(password) = lookup(ADMIN_PASSWORD_ENV).filter(|v| !v.is_empty()) {
        config.admin.password = password;
    }
}

/// Load (or default), overlay the environment, apply `overrides`, then
/// validate. `overrides` carries command-line settings, which win over both
/// the file and the environment.
pub fn resolve_config<F, O>(
    path: Option<&Path>,
    lookup: F,
    overrides: O,
) -> Result<EntrypointConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    O: FnOnce(&mut EntrypointConfig),
{
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => EntrypointConfig::default(),
    };
    apply_env_overrides(&mut config, lookup);
    overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
