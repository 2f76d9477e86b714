//! Relational expansion: replace bare user IDs in work-order and PM schedule
//! responses with `{id, name, email, role}` projections.

use serde_json::Value;
use upkeep_pm::PmSchedule;
use upkeep_users::UserStore;
use upkeep_workorders::WorkOrder;

use crate::envelope::ApiResult;

/// Fields holding a user ID on both record kinds.
const USER_REF_FIELDS: &[&str] = &["assigned_to", "created_by"];

pub fn work_order(users: &UserStore, wo: &WorkOrder) -> ApiResult<Value> {
    let mut value = serde_json::to_value(wo)?;
    expand_user_fields(users, &mut value)?;
    Ok(value)
}

pub fn pm_schedule(users: &UserStore, schedule: &PmSchedule) -> ApiResult<Value> {
    let mut value = serde_json::to_value(schedule)?;
    expand_user_fields(users, &mut value)?;
    Ok(value)
}

fn expand_user_fields(users: &UserStore, value: &mut Value) -> ApiResult<()> {
    let Some(map) = value.as_object_mut() else {
        return Ok(());
    };
    for field in USER_REF_FIELDS {
        let Some(Value::String(id)) = map.get(*field) else {
            continue;
        };
        // A dangling reference (user row purged out-of-band) keeps the raw ID.
        if let Some(user_ref) = users.user_ref(id).map_err(crate::envelope::ApiError::from)? {
            map.insert((*field).to_string(), serde_json::to_value(user_ref)?);
        }
    }
    Ok(())
}
