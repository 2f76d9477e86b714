use serde::{Deserialize, Serialize};
use upkeep_core::types::UserRole;

/// Full user record. Stored in SQLite.
///
/// The password hash never leaves the crate boundary in serialized form;
/// handlers serialize `User` directly and rely on the skip attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUIDv7 — time-sortable, useful for log correlation.
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,

    /// Argon2id PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Soft delete — inactive users are hidden from listings and logins.
    pub is_active: bool,

    // Audit timestamps (RFC3339)
    pub created_at: String,
    pub updated_at: String,
}

/// Projection of a user for relational expansion: what a work order or PM
/// schedule embeds for `assigned_to` / `created_by`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

/// Fields that `UserStore::update` may change. `None` leaves a field as-is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<UserRole>,
}

/// A persisted bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct AuthToken {
    pub token: String,
    pub user_id: String,
    pub created_at: String,
    pub expires_at: String,
}
