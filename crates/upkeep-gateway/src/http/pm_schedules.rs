//! PM schedule endpoints with role-scoped visibility: admins see everything,
//! technicians only schedules assigned to them, staff nothing.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use upkeep_core::types::UserRole;
use upkeep_notify::{NewNotification, NotificationKind, RelatedKind};
use upkeep_pm::{ChecklistItem, Frequency, NewPmSchedule, PmListFilter, PmSchedule, PmStatus, PmUpdate};
use upkeep_users::User;

use crate::app::AppState;
use crate::auth::{authenticate, require_admin};
use crate::envelope::{ok, page, ApiError, ApiResult};
use crate::expand;
use crate::http::notify_quietly;

#[derive(Deserialize)]
pub struct PmListQuery {
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub status: Option<PmStatus>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Deserialize, Default)]
pub struct CompleteRequest {
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub checklist: Option<Vec<ChecklistItem>>,
}

/// GET /api/pm-schedules
pub async fn list_pm_schedules(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PmListQuery>,
) -> ApiResult<Json<Value>> {
    let actor = authenticate(&state, &headers)?;

    let page_no = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(10);
    let assigned_to = match actor.role {
        UserRole::Admin => None,
        UserRole::Technician => Some(actor.id.clone()),
        // Staff have no PM visibility; the list is empty rather than an error.
        UserRole::Staff => {
            return Ok(page(Vec::<Value>::new(), 0, page_no, limit));
        }
    };

    let filter = PmListFilter {
        frequency: query.frequency,
        status: query.status,
        search: query.search,
        assigned_to,
        page: page_no,
        limit,
    };
    let (schedules, total) = state.pm.list(&filter)?;
    let expanded = schedules
        .iter()
        .map(|s| expand::pm_schedule(&state.users, s))
        .collect::<ApiResult<Vec<Value>>>()?;
    Ok(page(expanded, total, page_no, limit))
}

/// POST /api/pm-schedules — admins and technicians only.
pub async fn create_pm_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(new): Json<NewPmSchedule>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let actor = authenticate(&state, &headers)?;
    require_pm_writer(&actor)?;

    let schedule = state.pm.create(new, &actor.id)?;
    notify_assignee(&state, &schedule, &actor.id);
    Ok((
        StatusCode::CREATED,
        ok(expand::pm_schedule(&state.users, &schedule)?),
    ))
}

/// GET /api/pm-schedules/{id}
pub async fn get_pm_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let actor = authenticate(&state, &headers)?;
    let schedule = state.pm.get(&id)?;
    check_pm_visibility(&actor, &schedule)?;
    Ok(ok(expand::pm_schedule(&state.users, &schedule)?))
}

/// PUT /api/pm-schedules/{id}
pub async fn update_pm_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<PmUpdate>,
) -> ApiResult<Json<Value>> {
    let actor = authenticate(&state, &headers)?;
    require_pm_writer(&actor)?;
    let before = state.pm.get(&id)?;
    check_pm_visibility(&actor, &before)?;

    let schedule = state.pm.update(&id, update)?;
    if schedule.assigned_to != before.assigned_to {
        notify_assignee(&state, &schedule, &actor.id);
    }
    Ok(ok(expand::pm_schedule(&state.users, &schedule)?))
}

/// POST /api/pm-schedules/{id}/complete — record a completion and roll the
/// due date forward one period.
pub async fn complete_pm_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<CompleteRequest>,
) -> ApiResult<Json<Value>> {
    let actor = authenticate(&state, &headers)?;
    require_pm_writer(&actor)?;
    let before = state.pm.get(&id)?;
    check_pm_visibility(&actor, &before)?;

    let schedule = state.pm.complete(&id, req.notes.as_deref(), req.checklist)?;
    Ok(ok(expand::pm_schedule(&state.users, &schedule)?))
}

/// DELETE /api/pm-schedules/{id} — admin-only soft delete.
pub async fn delete_pm_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let actor = authenticate(&state, &headers)?;
    require_admin(&actor)?;
    state.pm.soft_delete(&id)?;
    Ok(ok(json!({ "deleted": true })))
}

/// Staff cannot create, update, or complete PM schedules.
fn require_pm_writer(actor: &User) -> Result<(), ApiError> {
    match actor.role {
        UserRole::Admin | UserRole::Technician => Ok(()),
        UserRole::Staff => Err(ApiError::denied(
            "staff cannot manage PM schedules".to_string(),
        )),
    }
}

/// Detail-level visibility: admins see any schedule, technicians only their
/// own assignments, staff none.
fn check_pm_visibility(actor: &User, schedule: &PmSchedule) -> Result<(), ApiError> {
    match actor.role {
        UserRole::Admin => Ok(()),
        UserRole::Technician => {
            if schedule.assigned_to.as_deref() == Some(actor.id.as_str()) {
                Ok(())
            } else {
                Err(ApiError::denied(
                    "schedule is not assigned to you".to_string(),
                ))
            }
        }
        UserRole::Staff => Err(ApiError::denied(
            "staff cannot view PM schedules".to_string(),
        )),
    }
}

/// Notify the assignee of a new or re-assigned schedule, skipping self.
fn notify_assignee(state: &AppState, schedule: &PmSchedule, actor_id: &str) {
    let Some(assignee) = schedule.assigned_to.as_deref() else {
        return;
    };
    if assignee == actor_id {
        return;
    }
    notify_quietly(
        state,
        NewNotification {
            user_id: assignee.to_string(),
            kind: NotificationKind::Pm,
            title: "PM schedule assigned to you".to_string(),
            message: format!(
                "{}: {} on {} (due {})",
                schedule.pm_id,
                schedule.title,
                schedule.asset,
                schedule.next_due_date.format("%Y-%m-%d")
            ),
            related_id: Some(schedule.id.clone()),
            related_kind: Some(RelatedKind::PmSchedule),
        },
    );
}
