//! Router assembly for the gateway service.

use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use bizkit_service_shared::{
    health_liveness, health_readiness, metrics_handler, AppState, Pipeline,
};

use crate::accounts::{create_account, get_account, AccountStore};

#[derive(Debug, Clone)]
pub struct GatewayState {
    pub app: AppState,
    pub accounts: AccountStore,
}

impl GatewayState {
    pub fn new(app: AppState) -> Self {
        Self {
            app,
            accounts: AccountStore::default(),
        }
    }
}

impl FromRef<GatewayState> for AppState {
    fn from_ref(state: &GatewayState) -> Self {
        state.app.clone()
    }
}

/// Build the service router with every request stage applied.
pub fn router(state: GatewayState, metrics_path: &str) -> Router {
    let routes = Router::new()
        .route("/api/v1/accounts", post(create_account))
        .route("/api/v1/accounts/{id}", get(get_account))
        .route(metrics_path, get(metrics_handler))
        .route("/health/liveness", get(health_liveness))
        .route("/health/readiness", get(health_readiness));

    Pipeline::new(state.app.clone())
        .apply(routes)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum_test::TestServer;
    use bizkit_service_shared::test_utils::{CapturingSink, StaticProbe};
    use serde_json::{json, Value};

    use super::*;

    fn spawn(probe: StaticProbe) -> (TestServer, CapturingSink) {
        let sink = CapturingSink::new();
        let app = AppState::new(Arc::new(probe)).with_log_sink(Arc::new(sink.clone()));
        let server = TestServer::new(router(GatewayState::new(app), "/metrics"))
            .expect("failed to start test server");
        (server, sink)
    }

    #[tokio::test]
    async fn test_create_then_fetch_account() {
        let (server, sink) = spawn(StaticProbe::healthy());

        let created = server
            .post("/api/v1/accounts")
            .json(&json!({
                "name": "Acme",
                "email": "ops@acme.test",
                "plan": "pro",
                "seats": 5
            }))
            .await;
        created.assert_status(StatusCode::CREATED);
        let account: Value = created.json();
        assert_eq!(account["plan"], "pro");

        let id = account["id"].as_str().unwrap();
        let fetched = server.get(&format!("/api/v1/accounts/{id}")).await;
        fetched.assert_status_ok();
        assert_eq!(fetched.json::<Value>()["name"], "Acme");

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].http_request["email"], "ops@acme.test");
        assert!(records.iter().all(|r| r.error.is_none()));
    }

    #[tokio::test]
    async fn test_empty_body_is_invalid_request() {
        let (server, _) = spawn(StaticProbe::healthy());

        let response = server.post("/api/v1/accounts").await;
        response.assert_status_bad_request();
        response.assert_json(&json!({"error": {
            "status": 400,
            "name": "InvalidRequest",
            "message": "request can't be empty",
            "details": []
        }}));
    }

    #[tokio::test]
    async fn test_malformed_json_is_invalid_request() {
        let (server, _) = spawn(StaticProbe::healthy());

        let response = server
            .post("/api/v1/accounts")
            .text("{\"name\": ")
            .await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["error"]["name"], "InvalidRequest");
    }

    #[tokio::test]
    async fn test_single_violation_is_translated() {
        let (server, _) = spawn(StaticProbe::healthy());

        let response = server
            .post("/api/v1/accounts")
            .json(&json!({
                "name": "",
                "email": "ops@acme.test",
                "plan": "free",
                "seats": 1
            }))
            .await;
        response.assert_status_bad_request();
        assert_eq!(
            response.json::<Value>()["error"]["message"],
            "name is a required field"
        );
    }

    #[tokio::test]
    async fn test_several_violations_are_aggregated() {
        let (server, sink) = spawn(StaticProbe::healthy());

        let response = server
            .post("/api/v1/accounts")
            .json(&json!({
                "name": "Ac",
                "email": "nope",
                "plan": "free",
                "seats": 1
            }))
            .await;
        response.assert_status_bad_request();
        response.assert_json(&json!({"errors": [
            {"status": 400, "name": "InvalidRequest", "message": "name must be at least 3 characters in length", "details": []},
            {"status": 400, "name": "InvalidRequest", "message": "email must be a valid email address", "details": []}
        ]}));
        assert!(sink.only().error.is_some());
    }

    #[tokio::test]
    async fn test_short_identifier_is_raw_string_error() {
        let (server, _) = spawn(StaticProbe::healthy());

        let response = server.get("/api/v1/accounts/1234").await;
        response.assert_status_bad_request();
        response.assert_json(&json!({"error": "invalid UUID length: 4"}));
    }

    #[tokio::test]
    async fn test_malformed_identifier_is_internal_error() {
        let (server, _) = spawn(StaticProbe::healthy());

        let response = server
            .get("/api/v1/accounts/zzzzzzzz-zzzz-zzzz-zzzz-zzzzzzzzzzzz")
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.json::<Value>()["error"]["name"],
            "InternalServerError"
        );
    }

    #[tokio::test]
    async fn test_missing_account_passes_through_as_400() {
        let (server, _) = spawn(StaticProbe::healthy());

        let response = server
            .get("/api/v1/accounts/0190a8e2-7f3b-7cc1-9d5e-2b1f3a4c5d6e")
            .await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["error"]["name"], "AccountNotFound");
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let (server, sink) = spawn(StaticProbe::healthy());
        server.get("/health/liveness").await.assert_json(&json!({"status": "alive"}));
        server.get("/health/readiness").await.assert_json(&json!({"status": "ready"}));
        assert!(sink.records().is_empty());

        let (server, _) = spawn(StaticProbe::failing());
        let response = server.get("/health/readiness").await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        response.assert_json(&json!({
            "status": "unavailable",
            "details": "database connection issue"
        }));
    }
}
