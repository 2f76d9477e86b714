pub mod auth;
pub mod health;
pub mod notifications;
pub mod pm_schedules;
pub mod users;
pub mod work_orders;

use tracing::warn;
use upkeep_notify::NewNotification;

use crate::app::AppState;

/// Create a notification without letting a failure surface: the primary
/// write has already committed, so this only logs at warn.
pub(crate) fn notify_quietly(state: &AppState, notification: NewNotification) {
    if let Err(e) = state.notify.create(notification) {
        warn!(error = %e, "notification creation failed");
    }
}
