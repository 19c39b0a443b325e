//! Shared request-processing infrastructure for bizkit HTTP services.
//!
//! - [`Pipeline`]: ordered middleware stages wrapped around a router
//! - [`logger`]: per-request structured access log
//! - [`error_handler`]: turns the last recorded error into a JSON response
//! - [`tenant`]: tenant resolution from the request host
//! - [`trace`]: W3C trace-context propagation
//! - [`health`]: liveness and readiness handlers
//! - [`metrics`], [`logging`]: Prometheus and `tracing` setup
//! - [`context`]: request-scoped context, error list, and handler error type
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ tenant → request id → metrics → logger → error handler       │
//! │                                                   ↓          │
//! │                                   handler (Result<_, HandlerError>)
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Classification rules and the error taxonomy live in `bizkit-lib`; this
//! crate provides only the HTTP glue.
//!
//! # Testing Support
//!
//! The [`test_utils`] module provides a capturing log sink and fixed-outcome
//! probes. Enable the `test-utils` feature to access it from dependent crates.

pub mod config;
pub mod context;
pub mod error_handler;
pub mod health;
pub mod logger;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod pipeline;
mod state;
pub mod tenant;
pub mod trace;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use bizkit_lib::TenantStrategy;
pub use config::ServiceConfig;
pub use context::{ErrorList, HandlerError, RequestContext};
pub use error_handler::handle_errors;
pub use health::{
    health_liveness, health_readiness, DependencyProbe, HealthStatus, ProbeError, Readiness,
};
pub use logger::{log_requests, LogRecord, LogSink, LoggerConfig, TracingSink};
pub use logging::{init_logging, LogFormat, LoggingConfig, ServiceIdentity};
pub use metrics::{
    init_metrics, metrics_handler, record_error_classified, MetricsConfig, MetricsError,
};
pub use middleware::{extract_or_generate_request_id, HttpMetricsLayer, MakeRequestUuidV7, RequestId};
pub use pipeline::Pipeline;
pub use state::AppState;
pub use tenant::resolve_tenants;
pub use trace::{SpanIds, TracePropagator};
