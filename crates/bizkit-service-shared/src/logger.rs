//! Per-request structured access log.
//!
//! [`log_requests`] emits exactly one [`LogRecord`] for every request whose
//! path is not excluded. The record carries:
//!
//! - `request_id`, `user_id`, `roles`: from `X-Request-Id`, `X-User-ID` and
//!   `X-Roles` response headers, which earlier layers are expected to set
//! - `trace_id`, `span_id`: only when the resolved trace context is valid
//! - `http_method`, `http_path`, `http_duration_ms`
//! - `http_request`: the request body parsed as a JSON object (`{}` otherwise)
//! - `error`: string form of the last recorded error
//!
//! Logging never fails a request. If the request future is dropped before the
//! handler completes, the fields gathered so far are still emitted.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use http_body::{Body as _, Frame, SizeHint};
use http_body_util::BodyExt;
use pin_project_lite::pin_project;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::{ErrorList, RecordedError, RequestContext};
use crate::logging::ServiceIdentity;
use crate::state::AppState;
use crate::trace::TracePropagator;

/// Path prefixes that are never logged.
pub const DEFAULT_EXCLUDED_PATHS: [&str; 3] = ["/metrics", "/health/liveness", "/health/readiness"];

/// Bodies larger than this are passed through but logged as `{}`.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

pub const HEADER_REQUEST_ID: &str = "x-request-id";
pub const HEADER_USER_ID: &str = "x-user-id";
pub const HEADER_ROLES: &str = "x-roles";

/// Configuration for the request logger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Prefixes matched with `starts_with` against the request path.
    pub excluded_paths: Vec<String>,
    /// Largest body that is parsed into the `http_request` field.
    pub max_body_bytes: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            excluded_paths: DEFAULT_EXCLUDED_PATHS.iter().map(|p| p.to_string()).collect(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl LoggerConfig {
    /// Create configuration from environment variables.
    ///
    /// - `LOG_EXCLUDED_PATHS`: comma-separated prefixes (default: metrics and health probes)
    /// - `LOG_MAX_BODY_BYTES`: body capture limit (default: 65536)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let excluded_paths = std::env::var("LOG_EXCLUDED_PATHS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or(defaults.excluded_paths);

        let max_body_bytes = std::env::var("LOG_MAX_BODY_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_body_bytes);

        Self {
            excluded_paths,
            max_body_bytes,
        }
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// One access-log entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    pub http_method: String,
    pub http_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<String>,
    pub http_duration_ms: f64,
    pub http_request: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Destination for access-log records. One call per record.
pub trait LogSink: Send + Sync {
    fn emit(&self, record: &LogRecord);
}

/// Emits records as a single `tracing` event at INFO.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    service: ServiceIdentity,
}

impl TracingSink {
    pub fn new(service: ServiceIdentity) -> Self {
        Self { service }
    }
}

impl LogSink for TracingSink {
    fn emit(&self, record: &LogRecord) {
        let http_request = Value::Object(record.http_request.clone());

        tracing::info!(
            target: "bizkit::access",
            service_name = %self.service.name,
            service_version = %self.service.version,
            service_namespace = %self.service.namespace,
            request_id = record.request_id.as_deref(),
            trace_id = record.trace_id.as_deref(),
            span_id = record.span_id.as_deref(),
            http_method = %record.http_method,
            http_path = %record.http_path,
            user_id = record.user_id.as_deref(),
            roles = record.roles.as_deref(),
            http_duration_ms = record.http_duration_ms,
            http_request = %http_request,
            error = record.error.as_deref(),
            "http request"
        );
    }
}

// Emits on drop if the request never completes.
struct PendingRecord {
    record: Option<LogRecord>,
    sink: Arc<dyn LogSink>,
    start: Instant,
}

impl PendingRecord {
    fn record_mut(&mut self) -> Option<&mut LogRecord> {
        self.record.as_mut()
    }

    fn flush(&mut self) {
        if let Some(mut record) = self.record.take() {
            record.http_duration_ms = self.start.elapsed().as_secs_f64() * 1000.0;
            self.sink.emit(&record);
        }
    }
}

impl Drop for PendingRecord {
    fn drop(&mut self) {
        self.flush();
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

pin_project! {
    /// Replays frames already read from a request body, then the read error
    /// that interrupted capture (if any), then whatever the original body has
    /// left.
    struct ReplayBody {
        frames: VecDeque<Frame<Bytes>>,
        error: Option<axum::Error>,
        #[pin]
        rest: Body,
    }
}

impl http_body::Body for ReplayBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();

        if let Some(frame) = this.frames.pop_front() {
            return Poll::Ready(Some(Ok(frame)));
        }
        if let Some(error) = this.error.take() {
            return Poll::Ready(Some(Err(error)));
        }
        this.rest.poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.frames.is_empty() && self.error.is_none() && self.rest.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        let buffered: u64 = self
            .frames
            .iter()
            .filter_map(|f| f.data_ref())
            .map(|d| d.len() as u64)
            .sum();
        let rest = self.rest.size_hint();

        let mut hint = SizeHint::new();
        hint.set_lower(rest.lower() + buffered);
        if let Some(upper) = rest.upper() {
            hint.set_upper(upper + buffered);
        }
        hint
    }
}

fn replay(data: Vec<u8>, trailers: Option<HeaderMap>, error: Option<axum::Error>, rest: Body) -> Body {
    let mut frames = VecDeque::new();
    if !data.is_empty() {
        frames.push_back(Frame::data(Bytes::from(data)));
    }
    if let Some(trailers) = trailers {
        frames.push_back(Frame::trailers(trailers));
    }
    Body::new(ReplayBody {
        frames,
        error,
        rest,
    })
}

fn declared_len(parts: &Parts, body: &Body) -> u64 {
    let from_header = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);
    from_header.max(body.size_hint().lower())
}

/// Read up to `max_bytes` of the body, hand back an equivalent request, and
/// parse what was read.
///
/// The downstream handler always sees the same byte stream the client sent,
/// including a read error at the same position. At most `max_bytes` plus one
/// frame is held in memory; a body declared or found to be larger is not
/// captured and the unread remainder is passed through untouched. Anything
/// not captured in full, or not a JSON object, is logged as an empty map.
pub async fn capture_body(request: Request, max_bytes: usize) -> (Request, Map<String, Value>) {
    let (parts, mut body) = request.into_parts();

    if declared_len(&parts, &body) > max_bytes as u64 {
        return (Request::from_parts(parts, body), Map::new());
    }

    let mut data = Vec::new();
    let mut trailers = None;

    while let Some(frame) = body.frame().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(error = %e, "request body read failed during capture");
                let body = replay(data, trailers, Some(e), Body::empty());
                return (Request::from_parts(parts, body), Map::new());
            }
        };

        match frame.into_data() {
            Ok(chunk) => {
                data.extend_from_slice(&chunk);
                if data.len() > max_bytes {
                    let body = replay(data, trailers, None, body);
                    return (Request::from_parts(parts, body), Map::new());
                }
            }
            Err(frame) => trailers = frame.into_trailers().ok(),
        }
    }

    let captured = serde_json::from_slice::<Map<String, Value>>(&data).unwrap_or_default();
    let body = match trailers {
        None => Body::from(data),
        Some(trailers) => replay(data, Some(trailers), None, Body::empty()),
    };
    (Request::from_parts(parts, body), captured)
}

/// Request logger stage.
pub async fn log_requests(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let config = state.logger_config();
    if config.is_excluded(request.uri().path()) {
        return next.run(request).await;
    }

    let mut pending = PendingRecord {
        record: None,
        sink: state.log_sink(),
        start: Instant::now(),
    };

    let current = request.extensions().get::<opentelemetry::Context>().cloned();
    let cx = state.propagator().resolve(current.as_ref(), request.headers());
    let ids = TracePropagator::span_ids(&cx);
    let inbound_request_id = header_value(request.headers(), HEADER_REQUEST_ID);

    RequestContext::update(request.extensions_mut(), |ctx| {
        if let Some(ids) = &ids {
            ctx.trace_id = Some(ids.trace_id.clone());
            ctx.span_id = Some(ids.span_id.clone());
        }
        if ctx.request_id.is_none() {
            ctx.request_id = inbound_request_id;
        }
    });
    request.extensions_mut().insert(cx);
    let errors = ErrorList::ensure(request.extensions_mut());

    pending.record = Some(LogRecord {
        trace_id: ids.as_ref().map(|ids| ids.trace_id.clone()),
        span_id: ids.map(|ids| ids.span_id),
        http_method: request.method().to_string(),
        http_path: request.uri().path().to_string(),
        ..LogRecord::default()
    });

    let (request, captured) = capture_body(request, config.max_body_bytes).await;
    if let Some(record) = pending.record_mut() {
        record.http_request = captured;
    }

    let response = next.run(request).await;

    if let Some(record) = pending.record_mut() {
        let headers = response.headers();
        record.request_id = header_value(headers, HEADER_REQUEST_ID);
        record.user_id = header_value(headers, HEADER_USER_ID);
        record.roles = header_value(headers, HEADER_ROLES);

        record.error = errors
            .last()
            .or_else(|| {
                response
                    .extensions()
                    .get::<RecordedError>()
                    .map(|recorded| Arc::clone(&recorded.0))
            })
            .map(|e| e.to_string());
    }

    pending.flush();
    response
}
