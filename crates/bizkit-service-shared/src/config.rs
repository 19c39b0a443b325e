//! Service configuration read from the environment.

use std::net::SocketAddr;

use bizkit_lib::TenantStrategy;
use serde::{Deserialize, Serialize};

use crate::logger::LoggerConfig;

/// Settings shared by every bizkit HTTP service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub port: u16,
    /// `host:port` of the backing database, used by the readiness probe.
    pub database_addr: String,
    pub tenant_strategy: TenantStrategy,
    pub logger: LoggerConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database_addr: "127.0.0.1:5432".to_string(),
            tenant_strategy: TenantStrategy::default(),
            logger: LoggerConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Create configuration from environment variables.
    ///
    /// - `SERVICE_PORT`: HTTP port (default: 8080)
    /// - `DATABASE_ADDR`: database `host:port` (default: 127.0.0.1:5432)
    /// - `TENANT_STRATEGY`: `first_label` (default) or `full_host`
    /// - `LOG_EXCLUDED_PATHS`, `LOG_MAX_BODY_BYTES`: see [`LoggerConfig::from_env`]
    ///
    /// Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("SERVICE_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let database_addr = std::env::var("DATABASE_ADDR").unwrap_or(defaults.database_addr);

        let tenant_strategy = match std::env::var("TENANT_STRATEGY") {
            Ok(value) => value.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring TENANT_STRATEGY");
                defaults.tenant_strategy
            }),
            Err(_) => defaults.tenant_strategy,
        };

        Self {
            port,
            database_addr,
            tenant_strategy,
            logger: LoggerConfig::from_env(),
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.tenant_strategy, TenantStrategy::FirstLabel);
        assert_eq!(config.listen_addr().port(), 8080);
    }
}
