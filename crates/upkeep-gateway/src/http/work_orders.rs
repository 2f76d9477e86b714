//! Work-order endpoints. Visible to every authenticated role; deletion is
//! admin-only. Assignment and status changes notify the assignee best-effort.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use upkeep_notify::{NewNotification, NotificationKind, RelatedKind};
use upkeep_workorders::{Actor, Category, NewWorkOrder, Priority, WoListFilter, WoStatus, WoUpdate, WorkOrder};

use crate::app::AppState;
use crate::auth::{authenticate, require_admin};
use crate::envelope::{ok, page, ApiResult};
use crate::expand;
use crate::http::notify_quietly;

#[derive(Deserialize)]
pub struct WoListQuery {
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: Option<WoStatus>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: WoStatus,
}

#[derive(Deserialize)]
pub struct NoteRequest {
    pub text: String,
}

/// GET /api/work-orders
pub async fn list_work_orders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<WoListQuery>,
) -> ApiResult<Json<Value>> {
    authenticate(&state, &headers)?;

    let page_no = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(10);
    let filter = WoListFilter {
        category: query.category,
        priority: query.priority,
        status: query.status,
        search: query.search,
        page: page_no,
        limit,
    };
    let (orders, total) = state.work_orders.list(&filter)?;
    let expanded = orders
        .iter()
        .map(|wo| expand::work_order(&state.users, wo))
        .collect::<ApiResult<Vec<Value>>>()?;
    Ok(page(expanded, total, page_no, limit))
}

/// POST /api/work-orders
pub async fn create_work_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(new): Json<NewWorkOrder>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let actor = authenticate(&state, &headers)?;
    let wo = state.work_orders.create(
        new,
        Actor {
            id: &actor.id,
            name: &actor.name,
        },
    )?;
    notify_assignee(&state, &wo, &actor.id, "New work order assigned");
    Ok((
        StatusCode::CREATED,
        ok(expand::work_order(&state.users, &wo)?),
    ))
}

/// GET /api/work-orders/{id}
pub async fn get_work_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    authenticate(&state, &headers)?;
    let wo = state.work_orders.get(&id)?;
    Ok(ok(expand::work_order(&state.users, &wo)?))
}

/// PUT /api/work-orders/{id}
pub async fn update_work_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<WoUpdate>,
) -> ApiResult<Json<Value>> {
    let actor = authenticate(&state, &headers)?;
    let before = state.work_orders.get(&id)?;
    let wo = state.work_orders.update(
        &id,
        update,
        Actor {
            id: &actor.id,
            name: &actor.name,
        },
    )?;
    // Notify only on a fresh assignment, not on every edit.
    if wo.assigned_to != before.assigned_to {
        notify_assignee(&state, &wo, &actor.id, "Work order assigned to you");
    }
    Ok(ok(expand::work_order(&state.users, &wo)?))
}

/// PATCH /api/work-orders/{id}/status
pub async fn set_work_order_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Json<Value>> {
    let actor = authenticate(&state, &headers)?;
    let (wo, old_status) = state.work_orders.set_status(
        &id,
        req.status,
        Actor {
            id: &actor.id,
            name: &actor.name,
        },
    )?;
    if let Some(assignee) = wo.assigned_to.as_deref() {
        if assignee != actor.id {
            notify_quietly(
                &state,
                NewNotification {
                    user_id: assignee.to_string(),
                    kind: NotificationKind::Status,
                    title: format!("{} status updated", wo.work_order_id),
                    message: format!(
                        "{}: status changed from {} to {}",
                        wo.title, old_status, wo.status
                    ),
                    related_id: Some(wo.id.clone()),
                    related_kind: Some(RelatedKind::WorkOrder),
                },
            );
        }
    }
    Ok(ok(expand::work_order(&state.users, &wo)?))
}

/// POST /api/work-orders/{id}/notes
pub async fn add_work_order_note(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<NoteRequest>,
) -> ApiResult<Json<Value>> {
    let actor = authenticate(&state, &headers)?;
    let wo = state.work_orders.add_note(
        &id,
        &req.text,
        Actor {
            id: &actor.id,
            name: &actor.name,
        },
    )?;
    Ok(ok(expand::work_order(&state.users, &wo)?))
}

/// DELETE /api/work-orders/{id} — admin-only hard delete.
pub async fn delete_work_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let actor = authenticate(&state, &headers)?;
    require_admin(&actor)?;
    state.work_orders.delete(&id)?;
    Ok(ok(json!({ "deleted": true })))
}

/// Notify the assignee of `wo`, skipping self-assignment.
fn notify_assignee(state: &AppState, wo: &WorkOrder, actor_id: &str, title: &str) {
    let Some(assignee) = wo.assigned_to.as_deref() else {
        return;
    };
    if assignee == actor_id {
        return;
    }
    notify_quietly(
        state,
        NewNotification {
            user_id: assignee.to_string(),
            kind: NotificationKind::WorkOrder,
            title: title.to_string(),
            message: format!("{}: {} ({})", wo.work_order_id, wo.title, wo.location),
            related_id: Some(wo.id.clone()),
            related_kind: Some(RelatedKind::WorkOrder),
        },
    );
}
