//! Structured logging infrastructure for bizkit services.
//!
//! This module provides:
//! - [`LoggingConfig`]: Configuration for the logging system
//! - [`ServiceIdentity`]: Service name/version/namespace stamped on access logs
//! - [`init_logging`]: Initialize tracing with JSON or text formatting
//!
//! # Environment Variables
//!
//! - `LOG_FORMAT`: Output format, either `json` (default) or `text`
//! - `ENV`: `production` forces JSON regardless of `LOG_FORMAT`
//! - `RUST_LOG`: Log level filter (default: `info`)
//! - `SERVICE_NAME`, `SERVICE_VERSION`, `SERVICE_NAMESPACE`: service identity
//!
//! # Example
//!
//! ```no_run
//! use bizkit_service_shared::logging::{LoggingConfig, init_logging};
//!
//! let config = LoggingConfig::from_env();
//! init_logging(&config);
//! ```

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON structured logging (default, production).
    #[default]
    Json,
    /// Human-readable text logging (development).
    Text,
}

impl LogFormat {
    /// Parse log format from string.
    ///
    /// Accepts "json", "text", or "pretty" (alias for text).
    /// Returns `Json` for any other value.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => LogFormat::Text,
            _ => LogFormat::Json,
        }
    }
}

/// Identity of the running service, attached to every access-log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentity {
    pub name: String,
    pub version: String,
    pub namespace: String,
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self {
            name: "example".to_string(),
            version: "v1.0.0".to_string(),
            namespace: "smallbiznis".to_string(),
        }
    }
}

impl ServiceIdentity {
    /// Read `SERVICE_NAME`, `SERVICE_VERSION` and `SERVICE_NAMESPACE`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            name: std::env::var("SERVICE_NAME").unwrap_or(defaults.name),
            version: std::env::var("SERVICE_VERSION").unwrap_or(defaults.version),
            namespace: std::env::var("SERVICE_NAMESPACE").unwrap_or(defaults.namespace),
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Output format (json or text).
    pub format: LogFormat,
    /// Log level filter (e.g., "info", "debug", "warn").
    pub level: String,
    /// Service identity for access-log records.
    pub service: ServiceIdentity,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
            service: ServiceIdentity::default(),
        }
    }
}

impl LoggingConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        let production = std::env::var("ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let format = if production {
            LogFormat::Json
        } else {
            std::env::var("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(LogFormat::Json)
        };

        let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            format,
            level,
            service: ServiceIdentity::from_env(),
        }
    }

    /// Override the service name.
    pub fn with_service(mut self, name: impl Into<String>) -> Self {
        self.service.name = name.into();
        self
    }
}

/// Initialize the tracing subscriber with the given configuration.
///
/// Call once at application startup, before building the pipeline.
///
/// # JSON Format (default)
///
/// ```json
/// {"timestamp":"2026-01-10T10:00:00Z","level":"INFO","target":"bizkit::access","fields":{"message":"http request","http_method":"POST",...}}
/// ```
///
/// # Text Format (development)
///
/// ```text
/// 2026-01-10T10:00:00Z  INFO bizkit::access: http request http_method="POST" ...
/// ```
pub fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Text => {
            registry.with(fmt::layer().pretty()).init();
        }
        LogFormat::Json => {
            let json_layer = fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false);

            registry.with(json_layer).init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("text"), LogFormat::Text);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Text);
        assert_eq!(LogFormat::parse("unknown"), LogFormat::Json);
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
        assert_eq!(config.service.namespace, "smallbiznis");
    }

    #[test]
    fn test_logging_config_with_service() {
        let config = LoggingConfig::default().with_service("gateway");
        assert_eq!(config.service.name, "gateway");
        assert_eq!(config.service.version, "v1.0.0");
    }
}
