//! Error-handling stage.
//!
//! Runs everything downstream, then turns the last recorded error (if any)
//! into the response. Earlier errors stay in the [`ErrorList`] for the logger
//! but never reach the client.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bizkit_lib::{classify, Classification, RawError};

use crate::context::{ErrorList, RecordedError};
use crate::metrics::record_error_classified;
use crate::state::AppState;

/// Error handler stage.
pub async fn handle_errors(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let errors = ErrorList::ensure(request.extensions_mut());

    let mut response = next.run(request).await;

    if let Some(RecordedError(error)) = response.extensions_mut().remove::<RecordedError>() {
        errors.record_shared(error);
    }

    let Some(last) = errors.last() else {
        return response;
    };

    let classification = classify(&last, state.translator());
    tracing::debug!(
        kind = last.kind(),
        status = classification.status,
        recorded = errors.len(),
        "classified request error"
    );
    record_error_classified(last.kind(), classification.status);

    rebuild(response, last, classification)
}

fn rebuild(original: Response, error: Arc<RawError>, classification: Classification) -> Response {
    let status =
        StatusCode::from_u16(classification.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, Json(classification.body)).into_response();

    for (name, value) in original.headers() {
        if name == header::CONTENT_TYPE || name == header::CONTENT_LENGTH {
            continue;
        }
        response.headers_mut().append(name.clone(), value.clone());
    }

    // The logger reads this when it sits outside the error stage.
    response.extensions_mut().insert(RecordedError(error));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use bizkit_lib::ApiError;

    #[test]
    fn test_rebuild_keeps_custom_headers() {
        let mut original = StatusCode::OK.into_response();
        original
            .headers_mut()
            .insert("x-request-id", HeaderValue::from_static("req-7"));
        original
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let error = Arc::new(RawError::from(ApiError::forbidden("NoAccess", "denied")));
        let classification = Classification {
            status: 400,
            body: bizkit_lib::ErrorBody::Passthrough {
                error: serde_json::json!("x"),
            },
        };

        let response = rebuild(original, error, classification);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["x-request-id"], "req-7");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert!(response.extensions().get::<RecordedError>().is_some());
    }
}
