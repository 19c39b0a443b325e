//! Health check handlers for liveness and readiness probes.
//!
//! Provides `/health/liveness` and `/health/readiness` handlers returning JSON
//! status bodies. Readiness pings a [`DependencyProbe`]; at most one ping is in
//! flight at any time, concurrent probes queue behind it.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::AppState;

pub const STATUS_ALIVE: &str = "alive";
pub const STATUS_READY: &str = "ready";
pub const STATUS_UNAVAILABLE: &str = "unavailable";
pub const DEPENDENCY_ISSUE: &str = "database connection issue";

/// Failure reported by a [`DependencyProbe`].
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("dependency unreachable: {0}")]
    Unreachable(String),
    #[error("dependency ping timed out")]
    Timeout,
}

/// A backing dependency whose reachability gates readiness.
#[async_trait]
pub trait DependencyProbe: Send + Sync {
    async fn ping(&self) -> Result<(), ProbeError>;
}

/// Health status response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// `alive`, `ready` or `unavailable`.
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HealthStatus {
    pub fn alive() -> Self {
        Self {
            status: STATUS_ALIVE.to_string(),
            details: None,
        }
    }

    pub fn ready() -> Self {
        Self {
            status: STATUS_READY.to_string(),
            details: None,
        }
    }

    pub fn unavailable(details: &str) -> Self {
        Self {
            status: STATUS_UNAVAILABLE.to_string(),
            details: Some(details.to_string()),
        }
    }
}

/// Serialized access to a dependency probe.
#[derive(Clone)]
pub struct Readiness {
    probe: Arc<dyn DependencyProbe>,
    lock: Arc<Mutex<()>>,
}

impl Readiness {
    pub fn new(probe: Arc<dyn DependencyProbe>) -> Self {
        Self {
            probe,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Ping the dependency. The lock is held only for the ping itself.
    pub async fn check(&self) -> HealthStatus {
        let result = {
            let _guard = self.lock.lock().await;
            self.probe.ping().await
        };

        match result {
            Ok(()) => HealthStatus::ready(),
            Err(e) => {
                tracing::warn!(error = %e, "readiness probe failed");
                HealthStatus::unavailable(DEPENDENCY_ISSUE)
            }
        }
    }
}

/// Liveness probe handler.
///
/// ```text
/// GET /health/liveness
/// {"status":"alive"}
/// ```
pub async fn health_liveness() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthStatus::alive()))
}

/// Readiness probe handler.
///
/// ```text
/// GET /health/readiness
/// {"status":"ready"}
/// {"status":"unavailable","details":"database connection issue"}   (503)
/// ```
pub async fn health_readiness(State(state): State<AppState>) -> Response {
    let status = state.readiness().check().await;
    let code = if status.status == STATUS_READY {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status)).into_response()
}
