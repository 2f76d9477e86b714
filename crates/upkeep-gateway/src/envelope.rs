//! JSON response envelope and the HTTP error mapping.
//!
//! Success: `{"success": true, "data": ...}` (list responses add `total`,
//! `page`, `pages`). Errors: `{"success": false, "message": ..., "code": ...}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;
use upkeep_core::UpkeepError;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Wrap a payload in the success envelope.
pub fn ok<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

/// Success envelope for paginated lists.
pub fn page<T: Serialize>(data: T, total: u64, page: u32, limit: u32) -> Json<Value> {
    let limit = if limit == 0 { 10 } else { limit } as u64;
    let pages = total.div_ceil(limit);
    Json(json!({
        "success": true,
        "data": data,
        "total": total,
        "page": page.max(1),
        "pages": pages,
    }))
}

/// A domain error on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub UpkeepError);

impl ApiError {
    pub fn auth(msg: impl Into<String>) -> Self {
        ApiError(UpkeepError::AuthFailed(msg.into()))
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        ApiError(UpkeepError::AccessDenied {
            reason: reason.into(),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            UpkeepError::AuthFailed(_) => StatusCode::UNAUTHORIZED,
            UpkeepError::AccessDenied { .. } => StatusCode::FORBIDDEN,
            UpkeepError::NotFound { .. } => StatusCode::NOT_FOUND,
            UpkeepError::Validation(_) => StatusCode::BAD_REQUEST,
            UpkeepError::AlreadyExists(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        let body = json!({
            "success": false,
            "message": self.0.to_string(),
            "code": self.0.code(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<UpkeepError> for ApiError {
    fn from(e: UpkeepError) -> Self {
        ApiError(e)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError(UpkeepError::Serialization(e))
    }
}

impl From<upkeep_users::UserError> for ApiError {
    fn from(e: upkeep_users::UserError) -> Self {
        use upkeep_users::UserError;
        ApiError(match e {
            UserError::NotFound(id) => UpkeepError::NotFound { kind: "User", id },
            UserError::EmailTaken(email) => UpkeepError::AlreadyExists(email),
            UserError::InvalidCredentials => {
                UpkeepError::AuthFailed("invalid email or password".to_string())
            }
            UserError::Validation(msg) => UpkeepError::Validation(msg),
            UserError::Database(e) => UpkeepError::Database(e.to_string()),
            UserError::PasswordHash(msg) => UpkeepError::Internal(msg),
        })
    }
}

impl From<upkeep_workorders::WorkOrderError> for ApiError {
    fn from(e: upkeep_workorders::WorkOrderError) -> Self {
        use upkeep_workorders::WorkOrderError;
        ApiError(match e {
            WorkOrderError::NotFound(id) => UpkeepError::NotFound {
                kind: "Work order",
                id,
            },
            WorkOrderError::Validation(msg) => UpkeepError::Validation(msg),
            WorkOrderError::Database(e) => UpkeepError::Database(e.to_string()),
            WorkOrderError::Serialization(e) => UpkeepError::Serialization(e),
        })
    }
}

impl From<upkeep_pm::PmError> for ApiError {
    fn from(e: upkeep_pm::PmError) -> Self {
        use upkeep_pm::PmError;
        ApiError(match e {
            PmError::NotFound(id) => UpkeepError::NotFound {
                kind: "PM schedule",
                id,
            },
            PmError::Validation(msg) => UpkeepError::Validation(msg),
            PmError::InvalidDate(msg) => UpkeepError::Validation(msg),
            PmError::Database(e) => UpkeepError::Database(e.to_string()),
            PmError::Serialization(e) => UpkeepError::Serialization(e),
        })
    }
}

impl From<upkeep_notify::NotifyError> for ApiError {
    fn from(e: upkeep_notify::NotifyError) -> Self {
        use upkeep_notify::NotifyError;
        ApiError(match e {
            NotifyError::NotFound(id) => UpkeepError::NotFound {
                kind: "Notification",
                id,
            },
            NotifyError::Validation(msg) => UpkeepError::Validation(msg),
            NotifyError::Database(e) => UpkeepError::Database(e.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn error_variants_map_to_expected_status_codes() {
        assert_eq!(status_of(ApiError::auth("no token")), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(ApiError::denied("admins only")), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(ApiError(UpkeepError::NotFound {
                kind: "User",
                id: "x".to_string()
            })),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApiError(UpkeepError::Validation("bad".to_string()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError(UpkeepError::AlreadyExists("dup".to_string()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ApiError(UpkeepError::Internal("boom".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn page_envelope_rounds_pages_up() {
        let body = page(Vec::<u8>::new(), 11, 1, 10).0;
        assert_eq!(body["total"], 11);
        assert_eq!(body["pages"], 2);
        assert_eq!(body["success"], true);
    }
}
