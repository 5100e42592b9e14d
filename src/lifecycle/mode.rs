//! Server mode selection.

use std::fmt;

use serde::Serialize;

/// Which application server to launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    /// Framework development server. Chosen for every value except
    /// `production`, including an unset or empty one.
    #[default]
    Development,
    /// ASGI server.
    Production,
}

impl ServerMode {
    /// Interpret the raw mode value. Only the exact string `production`
    /// selects production; the comparison is case-sensitive.
    pub fn from_value(value: Option<&str>) -> Self {
        match value {
            Some("production") => ServerMode::Production,
            _ => ServerMode::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerMode::Development => "development",
            ServerMode::Production => "production",
        }
    }
}

impl fmt::Display for ServerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
