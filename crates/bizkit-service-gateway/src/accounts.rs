//! Account endpoints backed by an in-memory store.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bizkit_lib::{
    decode_json, parse_identifier, ApiError, FieldTags, Validate, ValidationErrors, Validator,
};
use bizkit_service_shared::{HandlerError, RequestContext};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::GatewayState;

const PLANS: [&str; 3] = ["free", "pro", "enterprise"];

const NAME: FieldTags = FieldTags::json("name", "name");
const EMAIL: FieldTags = FieldTags::json("email", "email");
const PLAN: FieldTags = FieldTags::json("plan", "plan");
const SEATS: FieldTags = FieldTags::json("seats", "seats");

/// Body of `POST /api/v1/accounts`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccount {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub seats: u32,
}

impl Validate for CreateAccount {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new("CreateAccount");
        v.required(NAME, &self.name)
            .min_len(NAME, &self.name, 3)
            .max_len(NAME, &self.name, 64);
        v.required(EMAIL, &self.email).email(EMAIL, &self.email);
        v.required(PLAN, &self.plan).one_of(PLAN, &self.plan, &PLANS);
        v.gte(SEATS, f64::from(self.seats), 1.0)
            .lte(SEATS, f64::from(self.seats), 500.0);
        v.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub tenant: Option<String>,
    pub name: String,
    pub email: String,
    pub plan: String,
    pub seats: u32,
    pub created_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct AccountStore {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
}

impl AccountStore {
    pub fn insert(&self, account: Account) {
        self.accounts.write().insert(account.id, account);
    }

    pub fn get(&self, id: &Uuid) -> Option<Account> {
        self.accounts.read().get(id).cloned()
    }
}

/// `POST /api/v1/accounts`
pub async fn create_account(
    State(state): State<GatewayState>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<(StatusCode, Json<Account>), HandlerError> {
    let request: CreateAccount = decode_json(&body)?;
    request.validate()?;

    let account = Account {
        id: Uuid::now_v7(),
        tenant: ctx.tenant.map(|t| t.to_string()),
        name: request.name,
        email: request.email,
        plan: request.plan,
        seats: request.seats,
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    tracing::info!(account_id = %account.id, plan = %account.plan, "account created");

    state.accounts.insert(account.clone());
    Ok((StatusCode::CREATED, Json(account)))
}

/// `GET /api/v1/accounts/{id}`
pub async fn get_account(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Account>, HandlerError> {
    let id = parse_identifier(&id)?;

    let account = state.accounts.get(&id).ok_or_else(|| {
        ApiError::bad_request("AccountNotFound", format!("account {id} does not exist"))
    })?;

    Ok(Json(account))
}
