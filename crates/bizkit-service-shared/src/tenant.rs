//! Tenant resolution stage.
//!
//! Derives a [`Tenant`] from the request host with the configured
//! [`TenantStrategy`](bizkit_lib::TenantStrategy) and stores it both as a
//! request extension and in the [`RequestContext`].

use axum::extract::{Request, State};
use axum::http::header::HOST;
use axum::middleware::Next;
use axum::response::Response;
use bizkit_lib::{resolve_tenant, Tenant};

use crate::context::RequestContext;
use crate::state::AppState;

/// Host of the request: `Host` header, else the URI authority, else `""`.
pub fn request_host(request: &Request) -> String {
    request
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .or_else(|| request.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default()
}

/// Tenant stage.
pub async fn resolve_tenants(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let tenant = resolve_tenant(&request_host(&request), state.tenant_strategy());
    tracing::trace!(tenant = %tenant, "resolved tenant");

    RequestContext::update(request.extensions_mut(), |ctx| {
        ctx.tenant = Some(tenant.clone());
    });
    request.extensions_mut().insert::<Tenant>(tenant);

    next.run(request).await
}
