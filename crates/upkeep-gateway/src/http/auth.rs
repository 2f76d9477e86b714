//! Registration, login, and session endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use upkeep_core::types::UserRole;

use crate::app::AppState;
use crate::auth::{authenticate, extract_bearer};
use crate::envelope::{ok, ApiError, ApiResult};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/auth/register — create an account and issue its first token.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user = state.users.create(
        &req.name,
        &req.email,
        req.phone.as_deref(),
        req.role,
        &req.password,
    )?;
    let token = state
        .users
        .issue_token(&user.id, state.config.auth.token_ttl_days)?;
    Ok((
        StatusCode::CREATED,
        ok(json!({ "user": user, "token": token.token, "expires_at": token.expires_at })),
    ))
}

/// POST /api/auth/login — verify credentials and issue a fresh token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let user = state.users.authenticate(&req.email, &req.password)?;
    let token = state
        .users
        .issue_token(&user.id, state.config.auth.token_ttl_days)?;
    Ok(ok(json!({
        "user": user,
        "token": token.token,
        "expires_at": token.expires_at,
    })))
}

/// GET /api/auth/me — the acting user.
pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let user = authenticate(&state, &headers)?;
    Ok(ok(user))
}

/// POST /api/auth/logout — revoke the presented token.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    // Authenticate first so a bogus token cannot probe for valid ones.
    authenticate(&state, &headers)?;
    let token = extract_bearer(&headers)
        .ok_or_else(|| ApiError::auth("missing bearer token".to_string()))?;
    state.users.revoke_token(token)?;
    Ok(ok(json!({ "revoked": true })))
}
