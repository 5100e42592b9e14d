//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, ports valid)
//! - Reject empty program names and account fields
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EntrypointConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::{BackoffKind, DependencyConfig, EntrypointConfig};

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &EntrypointConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_dependency("dependencies.database", &config.dependencies.database, &mut errors);
    check_dependency("dependencies.cache", &config.dependencies.cache, &mut errors);

    let readiness = &config.readiness;
    if readiness.interval_ms == 0 {
        errors.push(ValidationError::new("readiness.interval_ms", "must be greater than 0"));
    }
    if readiness.connect_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "readiness.connect_timeout_ms",
            "must be greater than 0",
        ));
    }
    if readiness.backoff == BackoffKind::Exponential
        && readiness.max_interval_ms < readiness.interval_ms
    {
        errors.push(ValidationError::new(
            "readiness.max_interval_ms",
            "must not be smaller than interval_ms",
        ));
    }
    if readiness.timeout_secs == Some(0) {
        errors.push(ValidationError::new(
            "readiness.timeout_secs",
            "must be greater than 0 (omit it to wait forever)",
        ));
    }

    let commands = &config.commands;
    if commands.python.trim().is_empty() {
        errors.push(ValidationError::new("commands.python", "must not be empty"));
    }
    if commands.manage_script.trim().is_empty() {
        errors.push(ValidationError::new("commands.manage_script", "must not be empty"));
    }
    for (field, args) in [
        ("commands.makemigrations", &commands.makemigrations),
        ("commands.migrate", &commands.migrate),
        ("commands.collectstatic", &commands.collectstatic),
    ] {
        if args.is_empty() {
            errors.push(ValidationError::new(field, "must name a management command"));
        }
    }
    for (i, args) in commands.seed.iter().enumerate() {
        if args.is_empty() {
            errors.push(ValidationError::new(
                format!("commands.seed[{i}]"),
                "must name a management command",
            ));
        }
    }

    if config.admin.enabled {
        if config.admin.username.trim().is_empty() {
            errors.push(ValidationError::new("admin.username", "must not be empty"));
        }
        if !config.admin.email.contains('@') {
            errors.push(ValidationError::new("admin.email", "must be an email address"));
        }
        if config.admin.password.is_empty() {
            errors.push(ValidationError::new("admin.password", "must not be empty"));
        }
    }

    let server = &config.server;
    if server.port == 0 {
        errors.push(ValidationError::new("server.port", "must be greater than 0"));
    }
    if server.bind_host.trim().is_empty() {
        errors.push(ValidationError::new("server.bind_host", "must not be empty"));
    }
    if server.asgi_server.trim().is_empty() {
        errors.push(ValidationError::new("server.asgi_server", "must not be empty"));
    }
    if server.asgi_application.trim().is_empty() {
        errors.push(ValidationError::new("server.asgi_application", "must not be empty"));
    }
    if server.dev_command.trim().is_empty() {
        errors.push(ValidationError::new("server.dev_command", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_dependency(field: &str, dep: &DependencyConfig, errors: &mut Vec<ValidationError>) {
    if dep.host.trim().is_empty() {
        errors.push(ValidationError::new(format!("{field}.host"), "must not be empty"));
    }
    if dep.port == 0 {
        errors.push(ValidationError::new(format!("{field}.port"), "must be greater than 0"));
    }
}
