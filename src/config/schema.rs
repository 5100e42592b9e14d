//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the entrypoint.
//! All types derive Serde traits for deserialization from config files, and
//! every section defaults to the fixed container behavior so that running
//! without a config file is the normal case.

use serde::{Deserialize, Serialize};

/// Root configuration for the entrypoint.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EntrypointConfig {
    /// Services that must accept TCP connections before anything else runs.
    pub dependencies: DependenciesConfig,

    /// Polling behavior for the readiness waits.
    pub readiness: ReadinessConfig,

    /// Management commands run between the waits and the server launch.
    pub commands: CommandsConfig,

    /// Default administrator account.
    pub admin: AdminConfig,

    /// Application server selection.
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// The two dependency services, waited on in this order.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DependenciesConfig {
    /// Relational database.
    pub database: DependencyConfig,

    /// In-memory cache / message broker.
    pub cache: DependencyConfig,
}

impl Default for DependenciesConfig {
    fn default() -> Self {
        Self {
            database: DependencyConfig {
                name: "PostgreSQL".to_string(),
                host: "db".to_string(),
                port: 5432,
            },
            cache: DependencyConfig {
                name: "Redis".to_string(),
                host: "redis".to_string(),
                port: 6379,
            },
        }
    }
}

/// A single TCP endpoint to wait for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DependencyConfig {
    /// Human-readable name used in progress output ("PostgreSQL started").
    pub name: String,

    /// Host name or IP address. Resolved on every attempt.
    pub host: String,

    /// TCP port.
    pub port: u16,
}

impl DependencyConfig {
    /// `host:port` form used for connecting and logging.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Backoff strategy between readiness attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Constant delay of `interval_ms`.
    #[default]
    Fixed,
    /// Delay doubles from `interval_ms` up to `max_interval_ms`.
    Exponential,
}

/// Readiness wait configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Delay between attempts (base delay for exponential backoff).
    pub interval_ms: u64,

    /// Backoff strategy.
    pub backoff: BackoffKind,

    /// Upper bound on the delay for exponential backoff.
    pub max_interval_ms: u64,

    /// Add up to 10% random jitter to exponential delays.
    pub jitter: bool,

    /// Give up after this many seconds. `None` waits forever.
    pub timeout_secs: Option<u64>,

    /// Deadline for a single connection attempt.
    pub connect_timeout_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            backoff: BackoffKind::Fixed,
            max_interval_ms: 5_000,
            jitter: false,
            timeout_secs: None,
            connect_timeout_ms: 1_000,
        }
    }
}

/// Framework management commands.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Interpreter used to run the management script.
    pub python: String,

    /// Path to the management script.
    pub manage_script: String,

    /// Working directory for every sub-command. Inherited when unset.
    pub working_dir: Option<String>,

    /// Arguments generating pending migrations.
    pub makemigrations: Vec<String>,

    /// Arguments applying migrations non-interactively.
    pub migrate: Vec<String>,

    /// Arguments gathering static files non-interactively.
    pub collectstatic: Vec<String>,

    /// Extra management commands run after static collection, in order.
    /// Each entry is the argument list after the management script,
    /// e.g. `["load_news"]`.
    pub seed: Vec<Vec<String>>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
            manage_script: "manage.py".to_string(),
            working_dir: None,
            makemigrations: vec!["makemigrations".to_string()],
            migrate: vec!["migrate".to_string(), "--noinput".to_string()],
            collectstatic: vec!["collectstatic".to_string(), "--noinput".to_string()],
            seed: Vec::new(),
        }
    }
}

/// Default administrator account configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Provision the account at all.
    pub enabled: bool,

    pub username: String,

    pub email: String,

    // WARNING: well-known default, override via DJANGO_SUPERUSER_PASSWORD.
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            username: "admin".to_string(),
            email: "admin@ghnoticeboard.com".to_string(),
            password: "admin123".to_string(),
        }
    }
}

/// Application server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Mode selection value. Overridden by `DJANGO_ENV` and `--mode`.
    pub mode: Option<String>,

    /// Bind address shared by both servers.
    pub bind_host: String,

    /// Port shared by both servers.
    pub port: u16,

    /// ASGI server binary used in production.
    pub asgi_server: String,

    /// Application entry point handed to the ASGI server.
    pub asgi_application: String,

    /// Management command for the development server.
    pub dev_command: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode: None,
            bind_host: "0.0.0.0".to_string(),
            port: 8000,
            asgi_server: "daphne".to_string(),
            asgi_application: "gh_notice_board.asgi:application".to_string(),
            dev_command: "runserver".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) when `RUST_LOG` is unset.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_container_layout() {
        let config = EntrypointConfig::default();
        assert_eq!(config.dependencies.database.address(), "db:5432");
        assert_eq!(config.dependencies.cache.address(), "redis:6379");
        assert_eq!(config.readiness.interval_ms, 100);
        assert_eq!(config.readiness.backoff, BackoffKind::Fixed);
        assert!(config.readiness.timeout_secs.is_none());
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.admin.email, "admin@ghnoticeboard.com");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: EntrypointConfig = toml::from_str(
            r#"
            [readiness]
            backoff = "exponential"
            timeout_secs = 30

            [commands]
            seed = [["load_news"], ["load_events"]]
            "#,
        )
        .unwrap();

        assert_eq!(config.readiness.backoff, BackoffKind::Exponential);
        assert_eq!(config.readiness.timeout_secs, Some(30));
        assert_eq!(config.readiness.interval_ms, 100);
        assert_eq!(config.commands.seed.len(), 2);
        assert_eq!(config.commands.migrate, vec!["migrate", "--noinput"]);
        assert_eq!(config.dependencies.cache.port, 6379);
    }
}
