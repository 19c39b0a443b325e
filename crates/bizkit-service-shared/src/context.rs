//! Request-scoped context shared between pipeline stages and handlers.
//!
//! - [`RequestContext`]: typed correlation fields (tenant, trace, request id)
//! - [`ErrorList`]: ordered errors recorded while handling one request
//! - [`HandlerError`]: handler return type that records its error on the way out
//!
//! Everything here lives in the request's extensions and dies with it.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{Extensions, StatusCode};
use axum::response::{IntoResponse, Response};
use bizkit_lib::{ApiError, FieldError, RawError, Tenant, ValidationErrors};
use parking_lot::Mutex;

/// Correlation fields for one request.
///
/// Each pipeline stage fills in its own field; handlers read it with the
/// `RequestContext` extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub tenant: Option<Tenant>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub request_id: Option<String>,
}

impl RequestContext {
    /// Snapshot of the context stored in `extensions`, or an empty one.
    pub fn from_extensions(extensions: &Extensions) -> Self {
        extensions.get::<Self>().cloned().unwrap_or_default()
    }

    /// Apply `update` to the stored context, creating it first if needed.
    pub fn update(extensions: &mut Extensions, update: impl FnOnce(&mut Self)) {
        match extensions.get_mut::<Self>() {
            Some(ctx) => update(ctx),
            None => {
                let mut ctx = Self::default();
                update(&mut ctx);
                extensions.insert(ctx);
            }
        }
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_extensions(&parts.extensions))
    }
}

/// Errors recorded while handling one request, in recording order.
///
/// Cloning yields another handle to the same list. Only the last entry is
/// ever turned into a response; earlier ones remain visible to the logger.
#[derive(Debug, Clone, Default)]
pub struct ErrorList(Arc<Mutex<Vec<Arc<RawError>>>>);

impl ErrorList {
    /// Return the list stored in `extensions`, inserting an empty one if absent.
    pub fn ensure(extensions: &mut Extensions) -> Self {
        if let Some(list) = extensions.get::<Self>() {
            return list.clone();
        }
        let list = Self::default();
        extensions.insert(list.clone());
        list
    }

    pub fn record(&self, error: impl Into<RawError>) {
        self.0.lock().push(Arc::new(error.into()));
    }

    pub(crate) fn record_shared(&self, error: Arc<RawError>) {
        self.0.lock().push(error);
    }

    pub fn last(&self) -> Option<Arc<RawError>> {
        self.0.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Arc<RawError>> {
        self.0.lock().clone()
    }
}

impl<S> FromRequestParts<S> for ErrorList
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::ensure(&mut parts.extensions))
    }
}

/// Error carried on a response produced by [`HandlerError`].
#[derive(Debug, Clone)]
pub(crate) struct RecordedError(pub(crate) Arc<RawError>);

/// Handler error that is classified by the error-handling stage.
///
/// Return `Result<T, HandlerError>` from a handler and use `?` on anything
/// convertible into [`RawError`]. Without the error stage in front, the
/// response is a bare `500`.
#[derive(Debug)]
pub struct HandlerError(RawError);

impl HandlerError {
    pub fn raw(&self) -> &RawError {
        &self.0
    }

    pub fn into_raw(self) -> RawError {
        self.0
    }
}

impl From<RawError> for HandlerError {
    fn from(error: RawError) -> Self {
        Self(error)
    }
}

impl From<ApiError> for HandlerError {
    fn from(error: ApiError) -> Self {
        Self(error.into())
    }
}

impl From<FieldError> for HandlerError {
    fn from(error: FieldError) -> Self {
        Self(error.into())
    }
}

impl From<ValidationErrors> for HandlerError {
    fn from(errors: ValidationErrors) -> Self {
        Self(errors.into())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(error: serde_json::Error) -> Self {
        Self(error.into())
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response
            .extensions_mut()
            .insert(RecordedError(Arc::new(self.0)));
        response
    }
}
