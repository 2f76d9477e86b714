//! Notification endpoints. Every route is scoped to the acting user; there
//! is no way to read or mutate someone else's notifications.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::authenticate;
use crate::envelope::{ok, ApiResult};

/// GET /api/notifications — the acting user's notifications, newest first.
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let actor = authenticate(&state, &headers)?;
    let items = state.notify.list_for_user(&actor.id)?;
    let unread = state.notify.unread_count(&actor.id)?;
    Ok(Json(json!({
        "success": true,
        "data": items,
        "unread": unread,
    })))
}

/// PATCH /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let actor = authenticate(&state, &headers)?;
    let notification = state.notify.mark_read(&id, &actor.id)?;
    Ok(ok(notification))
}

/// PATCH /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let actor = authenticate(&state, &headers)?;
    let updated = state.notify.mark_all_read(&actor.id)?;
    Ok(ok(json!({ "updated": updated })))
}

/// DELETE /api/notifications/{id}
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let actor = authenticate(&state, &headers)?;
    state.notify.delete(&id, &actor.id)?;
    Ok(ok(json!({ "deleted": true })))
}
