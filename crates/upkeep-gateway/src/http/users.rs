//! User management endpoints. Listing and deactivation are admin-only;
//! profile updates allow self-service except for role changes.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use upkeep_core::types::UserRole;
use upkeep_users::types::UserUpdate;

use crate::app::AppState;
use crate::auth::{authenticate, require_admin};
use crate::envelope::{ok, page, ApiError, ApiResult};

#[derive(Deserialize)]
pub struct UserListQuery {
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// GET /api/users — admin-only listing of active accounts.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Json<Value>> {
    let actor = authenticate(&state, &headers)?;
    require_admin(&actor)?;

    let page_no = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(10);
    let (users, total) = state
        .users
        .list(query.role, query.search.as_deref(), page_no, limit)?;
    Ok(page(users, total, page_no, limit))
}

/// GET /api/users/{id} — any authenticated caller.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    authenticate(&state, &headers)?;
    let user = state.users.get(&id)?;
    Ok(ok(user))
}

/// PUT /api/users/{id} — admins may update anyone; everyone else only their
/// own profile, and never their own role.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<UserUpdate>,
) -> ApiResult<Json<Value>> {
    let actor = authenticate(&state, &headers)?;
    if !actor.role.is_admin() {
        if actor.id != id {
            return Err(ApiError::denied(
                "cannot update another user's profile".to_string(),
            ));
        }
        if update.role.is_some() {
            return Err(ApiError::denied(
                "only admins may change roles".to_string(),
            ));
        }
    }
    let user = state.users.update(&id, update)?;
    Ok(ok(user))
}

/// DELETE /api/users/{id} — admin-only soft delete.
pub async fn deactivate_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let actor = authenticate(&state, &headers)?;
    require_admin(&actor)?;
    if actor.id == id {
        return Err(ApiError::denied(
            "cannot deactivate your own account".to_string(),
        ));
    }
    state.users.deactivate(&id)?;
    Ok(ok(json!({ "deactivated": true })))
}
