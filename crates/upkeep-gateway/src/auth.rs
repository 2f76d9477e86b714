//! Bearer-token extraction and role gates shared by all handlers.

use axum::http::HeaderMap;
use upkeep_users::User;

use crate::app::AppState;
use crate::envelope::ApiError;

pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Resolve the request's bearer token to its user. Missing, unknown, expired,
/// and deactivated-user tokens all read as the same 401.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = extract_bearer(headers)
        .ok_or_else(|| ApiError::auth("missing bearer token".to_string()))?;
    match state.users.verify_token(token)? {
        Some(user) => Ok(user),
        None => Err(ApiError::auth("invalid or expired token".to_string())),
    }
}

pub fn require_admin(user: &User) -> Result<(), ApiError> {
    if user.role.is_admin() {
        Ok(())
    } else {
        Err(ApiError::denied("admin role required".to_string()))
    }
}
