//! bizkit gateway HTTP service.
//!
//! A small account API that runs every request through the shared pipeline:
//! tenant resolution, request ids, metrics, access logging and error
//! classification.
//!
//! # Endpoints
//!
//! - `POST /api/v1/accounts` - Create an account
//! - `GET /api/v1/accounts/{id}` - Fetch an account
//! - `GET /metrics` - Prometheus metrics endpoint
//! - `GET /health/liveness` - Liveness probe
//! - `GET /health/readiness` - Readiness probe (TCP connect to `DATABASE_ADDR`)
//!
//! # Configuration
//!
//! - `SERVICE_PORT` - HTTP port (default: 8080)
//! - `DATABASE_ADDR` - `host:port` checked by readiness (default: 127.0.0.1:5432)
//! - `TENANT_STRATEGY` - `first_label` (default) or `full_host`
//! - `LOG_FORMAT`, `RUST_LOG`, `ENV`, `SERVICE_NAME`, `SERVICE_VERSION`, `SERVICE_NAMESPACE`
//! - `LOG_EXCLUDED_PATHS`, `LOG_MAX_BODY_BYTES`
//! - `METRICS_ENABLED`, `METRICS_PATH`

mod accounts;
mod app;
mod probe;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bizkit_service_shared::{
    init_logging, init_metrics, AppState, LoggingConfig, MetricsConfig, ServiceConfig,
    TracingSink,
};
use tracing::info;

use crate::app::{router, GatewayState};
use crate::probe::TcpProbe;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logging_config = LoggingConfig::from_env();
    init_logging(&logging_config);

    let metrics_config = MetricsConfig::from_env();
    if let Err(e) = init_metrics(&metrics_config) {
        tracing::warn!(error = %e, "failed to initialize metrics, continuing without metrics");
    }

    let config = ServiceConfig::from_env();
    info!(
        port = config.port,
        database_addr = %config.database_addr,
        tenant_strategy = ?config.tenant_strategy,
        "starting gateway service"
    );

    let probe = TcpProbe::new(config.database_addr.clone(), PROBE_TIMEOUT);
    let state = AppState::new(Arc::new(probe))
        .with_log_sink(Arc::new(TracingSink::new(logging_config.service.clone())))
        .with_logger_config(config.logger.clone())
        .with_tenant_strategy(config.tenant_strategy);

    let app = router(GatewayState::new(state), &metrics_config.path);

    let addr = config.listen_addr();
    info!(addr = %addr, "listening on");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
