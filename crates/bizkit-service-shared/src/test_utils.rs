//! Test fixtures for pipeline and handler tests.
//!
//! Available in this crate's tests and, with the `test-utils` feature, in
//! dependent crates.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use http_body::Frame;
use parking_lot::Mutex;

use crate::health::{DependencyProbe, ProbeError};
use crate::logger::{LogRecord, LogSink};
use crate::state::AppState;

/// Log sink that keeps every record in memory. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct CapturingSink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// The single record emitted so far. Panics unless exactly one exists.
    pub fn only(&self) -> LogRecord {
        let records = self.records();
        assert_eq!(records.len(), 1, "expected exactly one log record");
        records.into_iter().next().unwrap_or_default()
    }
}

impl LogSink for CapturingSink {
    fn emit(&self, record: &LogRecord) {
        self.records.lock().push(record.clone());
    }
}

/// Probe with a fixed outcome and optional latency.
///
/// Tracks the highest number of pings observed in flight at once.
#[derive(Debug, Default)]
pub struct StaticProbe {
    fail: bool,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl StaticProbe {
    pub fn healthy() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DependencyProbe for StaticProbe {
    async fn ping(&self) -> Result<(), ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            Err(ProbeError::Unreachable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Streaming request body of unknown length that yields fixed chunks and
/// optionally fails once they run out.
///
/// Counts the bytes pulled from it so tests can check how much was read.
#[derive(Debug, Default)]
pub struct ScriptedBody {
    chunks: VecDeque<Bytes>,
    error: Option<io::Error>,
    pulled: Arc<AtomicUsize>,
}

impl ScriptedBody {
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Fail with `error` after the last chunk.
    pub fn then_fail(mut self, error: io::Error) -> Self {
        self.error = Some(error);
        self
    }

    /// Shared counter of bytes handed out so far.
    pub fn pulled(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.pulled)
    }

    pub fn into_body(self) -> Body {
        Body::new(self)
    }
}

impl http_body::Body for ScriptedBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if let Some(chunk) = this.chunks.pop_front() {
            this.pulled.fetch_add(chunk.len(), Ordering::SeqCst);
            return Poll::Ready(Some(Ok(Frame::data(chunk))));
        }
        Poll::Ready(this.error.take().map(Err))
    }
}

/// State with a healthy probe that logs into the returned sink.
pub fn test_state() -> (AppState, CapturingSink) {
    let sink = CapturingSink::new();
    let state = AppState::new(Arc::new(StaticProbe::healthy())).with_log_sink(Arc::new(sink.clone()));
    (state, sink)
}
