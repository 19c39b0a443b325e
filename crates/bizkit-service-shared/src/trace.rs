//! W3C trace-context propagation for inbound requests.
//!
//! [`TracePropagator`] wraps an OpenTelemetry composite propagator
//! (TraceContext + Baggage). It is constructed once and passed to the stages
//! that need it; the process-wide OpenTelemetry propagator is never touched.
//! Only the `traceparent` and `baggage` headers are read.

use std::fmt;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::propagation::{
    Extractor, Injector, TextMapCompositePropagator, TextMapPropagator,
};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};

/// W3C Trace Context header name.
pub const TRACEPARENT: &str = "traceparent";

/// W3C Baggage header name.
pub const BAGGAGE: &str = "baggage";

const CARRIED_HEADERS: [&str; 2] = [TRACEPARENT, BAGGAGE];

/// Hex-encoded identifiers of a valid span context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanIds {
    pub trace_id: String,
    pub span_id: String,
}

struct HeadersExtractor<'a>(&'a HeaderMap);

impl Extractor for HeadersExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

struct HeadersInjector<'a>(&'a mut HeaderMap);

impl Injector for HeadersInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, value);
        }
    }
}

/// Composite TraceContext + Baggage propagator.
pub struct TracePropagator {
    inner: TextMapCompositePropagator,
}

impl Default for TracePropagator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TracePropagator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracePropagator")
            .field("headers", &CARRIED_HEADERS)
            .finish()
    }
}

impl TracePropagator {
    pub fn new() -> Self {
        Self {
            inner: TextMapCompositePropagator::new(vec![
                Box::new(TraceContextPropagator::new()),
                Box::new(BaggagePropagator::new()),
            ]),
        }
    }

    /// Extract a remote parent context from `headers`.
    ///
    /// Malformed headers yield a context without a valid span.
    pub fn extract(&self, headers: &HeaderMap) -> Context {
        self.inner
            .extract_with_context(&Context::new(), &HeadersExtractor(headers))
    }

    /// Write `cx` into `headers` as `traceparent` / `baggage`.
    pub fn inject(&self, cx: &Context, headers: &mut HeaderMap) {
        self.inner.inject_context(cx, &mut HeadersInjector(headers));
    }

    /// Resolve the context for an inbound request.
    ///
    /// The carried headers are copied into a fresh carrier, `current` (if any)
    /// is injected over them, and the result is extracted. A live span in
    /// `current` therefore wins over the inbound header.
    pub fn resolve(&self, current: Option<&Context>, headers: &HeaderMap) -> Context {
        let mut carrier = HeaderMap::new();
        for name in CARRIED_HEADERS {
            if let Some(value) = headers.get(name) {
                carrier.insert(name, value.clone());
            }
        }

        if let Some(cx) = current {
            self.inject(cx, &mut carrier);
        }

        self.extract(&carrier)
    }

    /// Trace and span ids of `cx`, only when its span context is valid.
    pub fn span_ids(cx: &Context) -> Option<SpanIds> {
        let span = cx.span();
        let span_context = span.span_context();
        if !span_context.is_valid() {
            return None;
        }

        Some(SpanIds {
            trace_id: span_context.trace_id().to_string(),
            span_id: span_context.span_id().to_string(),
        })
    }
}
