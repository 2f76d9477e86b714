use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use upkeep_core::UpkeepConfig;
use upkeep_notify::NotifyStore;
use upkeep_pm::PmStore;
use upkeep_users::UserStore;
use upkeep_workorders::WorkOrderStore;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: UpkeepConfig,
    pub users: UserStore,
    pub work_orders: WorkOrderStore,
    pub pm: PmStore,
    pub notify: NotifyStore,
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = match state
        .config
        .server
        .cors_origin
        .as_deref()
        .and_then(|o| o.parse::<HeaderValue>().ok())
    {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    };

    Router::new()
        .route("/api/health", get(crate::http::health::health_handler))
        .route("/api/auth/register", post(crate::http::auth::register))
        .route("/api/auth/login", post(crate::http::auth::login))
        .route("/api/auth/me", get(crate::http::auth::me))
        .route("/api/auth/logout", post(crate::http::auth::logout))
        .route("/api/users", get(crate::http::users::list_users))
        .route(
            "/api/users/{id}",
            get(crate::http::users::get_user)
                .put(crate::http::users::update_user)
                .delete(crate::http::users::deactivate_user),
        )
        .route(
            "/api/work-orders",
            get(crate::http::work_orders::list_work_orders)
                .post(crate::http::work_orders::create_work_order),
        )
        .route(
            "/api/work-orders/{id}",
            get(crate::http::work_orders::get_work_order)
                .put(crate::http::work_orders::update_work_order)
                .delete(crate::http::work_orders::delete_work_order),
        )
        .route(
            "/api/work-orders/{id}/status",
            patch(crate::http::work_orders::set_work_order_status),
        )
        .route(
            "/api/work-orders/{id}/notes",
            post(crate::http::work_orders::add_work_order_note),
        )
        .route(
            "/api/pm-schedules",
            get(crate::http::pm_schedules::list_pm_schedules)
                .post(crate::http::pm_schedules::create_pm_schedule),
        )
        .route(
            "/api/pm-schedules/{id}",
            get(crate::http::pm_schedules::get_pm_schedule)
                .put(crate::http::pm_schedules::update_pm_schedule)
                .delete(crate::http::pm_schedules::delete_pm_schedule),
        )
        .route(
            "/api/pm-schedules/{id}/complete",
            post(crate::http::pm_schedules::complete_pm_schedule),
        )
        .route(
            "/api/notifications",
            get(crate::http::notifications::list_notifications),
        )
        .route(
            "/api/notifications/read-all",
            patch(crate::http::notifications::mark_all_read),
        )
        .route(
            "/api/notifications/{id}/read",
            patch(crate::http::notifications::mark_read),
        )
        .route(
            "/api/notifications/{id}",
            delete(crate::http::notifications::delete_notification),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors)
}
