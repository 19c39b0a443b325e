//! Assembly of the request-processing stages.
//!
//! ```text
//! tenant -> set request id -> metrics -> logger -> propagate request id
//!        -> error handler -> handler
//! ```
//!
//! The logger sits outside the error handler so it sees the final response,
//! including the classified error and the propagated `X-Request-Id`.

use axum::middleware::{from_fn_with_state, map_request};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};

use crate::context::RequestContext;
use crate::error_handler::handle_errors;
use crate::logger::log_requests;
use crate::middleware::{HttpMetricsLayer, MakeRequestUuidV7};
use crate::state::AppState;
use crate::tenant::resolve_tenants;

/// Builder that wraps a router with every stage in order.
#[derive(Debug, Clone)]
pub struct Pipeline {
    state: AppState,
}

impl Pipeline {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Apply the stages to `router`. Routes added afterwards are not wrapped.
    pub fn apply<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let stages = ServiceBuilder::new()
            .layer(from_fn_with_state(self.state.clone(), resolve_tenants))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
            .layer(map_request(record_request_id))
            .layer(HttpMetricsLayer)
            .layer(from_fn_with_state(self.state.clone(), log_requests))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(from_fn_with_state(self.state.clone(), handle_errors));

        router.layer(stages)
    }
}

async fn record_request_id(mut request: axum::extract::Request) -> axum::extract::Request {
    let id = request
        .extensions()
        .get::<tower_http::request_id::RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .map(String::from);

    RequestContext::update(request.extensions_mut(), |ctx| ctx.request_id = id);
    request
}
