//! Tenant derivation from the request host.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a tenant identifier is derived from a host.
///
/// Pick one per deployment; the two strategies produce different tenants for
/// the same host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStrategy {
    /// The whole host string, port included, is the tenant.
    FullHost,
    /// Everything before the first `.` is the tenant (`acme.example.com` -> `acme`).
    #[default]
    FirstLabel,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown tenant strategy '{0}', expected 'full_host' or 'first_label'")]
pub struct UnknownTenantStrategy(pub String);

impl FromStr for TenantStrategy {
    type Err = UnknownTenantStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "full_host" | "host" => Ok(Self::FullHost),
            "first_label" | "subdomain" => Ok(Self::FirstLabel),
            _ => Err(UnknownTenantStrategy(s.to_string())),
        }
    }
}

/// Tenant identifier for one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tenant(String);

impl Tenant {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the tenant for `host`. No format validation is performed.
pub fn resolve_tenant(host: &str, strategy: TenantStrategy) -> Tenant {
    match strategy {
        TenantStrategy::FullHost => Tenant::new(host),
        TenantStrategy::FirstLabel => {
            Tenant::new(host.split('.').next().unwrap_or_default())
        }
    }
}
