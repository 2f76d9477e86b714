use std::sync::Mutex;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use rusqlite::Connection;
use tracing::{debug, info};
use upkeep_core::types::{UserId, UserRole};
use uuid::Uuid;

use crate::db::{row_to_user, USER_COLUMNS};
use crate::error::{Result, UserError};
use crate::types::{AuthToken, User, UserRef, UserUpdate};

/// Thread-safe store for user accounts and bearer tokens.
///
/// Wraps a single SQLite connection in a `Mutex`; all writes serialise on it,
/// which gives the single-writer-per-record semantics the rest of the system
/// assumes.
pub struct UserStore {
    db: Mutex<Connection>,
}

impl UserStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Create a new account with a freshly hashed password.
    ///
    /// The email uniqueness check runs under the connection lock, so two
    /// concurrent registrations of the same address cannot both succeed.
    pub fn create(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        role: UserRole,
        password: &str,
    ) -> Result<User> {
        validate_registration(name, email, password)?;

        let db = self.db.lock().unwrap();
        let taken: bool = db
            .query_row(
                "SELECT COUNT(*) FROM users WHERE email = ?1 COLLATE NOCASE",
                rusqlite::params![email],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n > 0)?;
        if taken {
            return Err(UserError::EmailTaken(email.to_string()));
        }

        let id = UserId::new().0;
        let now = Utc::now().to_rfc3339();
        let password_hash = hash_password(password)?;

        db.execute(
            "INSERT INTO users (id, name, email, phone, role, password_hash,
                                is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7)",
            rusqlite::params![id, name, email, phone, role.to_string(), password_hash, now],
        )?;
        info!(user_id = %id, %email, role = %role, "user created");

        Ok(User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(String::from),
            role,
            password_hash,
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Verify email + password. Inactive accounts cannot log in.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let db = self.db.lock().unwrap();
        let user = match db.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE"),
            rusqlite::params![email],
            row_to_user,
        ) {
            Ok(u) => u,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Err(UserError::InvalidCredentials),
            Err(e) => return Err(UserError::Database(e)),
        };

        if !user.is_active || !verify_password(password, &user.password_hash)? {
            return Err(UserError::InvalidCredentials);
        }
        Ok(user)
    }

    /// Issue a fresh bearer token for `user_id`.
    pub fn issue_token(&self, user_id: &str, ttl_days: i64) -> Result<AuthToken> {
        let now = Utc::now();
        let token = AuthToken {
            token: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            created_at: now.to_rfc3339(),
            expires_at: (now + Duration::days(ttl_days)).to_rfc3339(),
        };
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO auth_tokens (token, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![token.token, token.user_id, token.created_at, token.expires_at],
        )?;
        debug!(user_id, "token issued");
        Ok(token)
    }

    /// Resolve a presented bearer token to its user.
    ///
    /// Returns `None` for unknown, expired, or soft-deleted-user tokens —
    /// the gateway turns that into a 401 without distinguishing the cases.
    pub fn verify_token(&self, token: &str) -> Result<Option<User>> {
        let db = self.db.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        match db.query_row(
            &format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE id = (SELECT user_id FROM auth_tokens
                             WHERE token = ?1 AND expires_at > ?2)
                   AND is_active = 1"
            ),
            rusqlite::params![token, now],
            row_to_user,
        ) {
            Ok(u) => Ok(Some(u)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(UserError::Database(e)),
        }
    }

    /// Delete a token (logout). Unknown tokens are a no-op.
    pub fn revoke_token(&self, token: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute("DELETE FROM auth_tokens WHERE token = ?1", [token])?;
        Ok(())
    }

    /// Fetch an active user by ID. Soft-deleted users read as NotFound.
    pub fn get(&self, id: &str) -> Result<User> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND is_active = 1"),
            rusqlite::params![id],
            row_to_user,
        ) {
            Ok(u) => Ok(u),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(UserError::NotFound(id.to_string())),
            Err(e) => Err(UserError::Database(e)),
        }
    }

    /// Lightweight projection for relational expansion. Bypasses the active
    /// filter — historical records may reference deactivated users.
    pub fn user_ref(&self, id: &str) -> Result<Option<UserRef>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            "SELECT id, name, email, role FROM users WHERE id = ?1",
            rusqlite::params![id],
            |row| {
                use std::str::FromStr;
                let role = UserRole::from_str(&row.get::<_, String>(3)?).unwrap_or_default();
                Ok(UserRef {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    role,
                })
            },
        ) {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(UserError::Database(e)),
        }
    }

    /// List active users, optionally filtered by role and a name/email search
    /// term, newest first. Returns (page of users, total matching count).
    pub fn list(
        &self,
        role: Option<UserRole>,
        search: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<User>, u64)> {
        let mut clauses = vec!["is_active = 1".to_string()];
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(role) = role {
            params.push(Box::new(role.to_string()));
            clauses.push(format!("role = ?{}", params.len()));
        }
        if let Some(term) = search.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", term.trim());
            params.push(Box::new(pattern));
            let n = params.len();
            clauses.push(format!("(name LIKE ?{n} OR email LIKE ?{n})"));
        }

        let where_sql = clauses.join(" AND ");
        let db = self.db.lock().unwrap();

        let total: u64 = db.query_row(
            &format!("SELECT COUNT(*) FROM users WHERE {where_sql}"),
            rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
            |row| row.get::<_, i64>(0),
        )? as u64;

        // u64 so an absurd caller-supplied page cannot overflow the multiply.
        let offset = (u64::from(page.max(1)) - 1) * u64::from(limit);
        let mut stmt = db.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {where_sql}
             ORDER BY created_at DESC LIMIT {limit} OFFSET {offset}"
        ))?;
        let users = stmt
            .query_map(
                rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
                row_to_user,
            )?
            .filter_map(|r| r.ok())
            .collect();

        Ok((users, total))
    }

    /// Apply a partial update. Only provided fields change; `updated_at` is
    /// always bumped. Soft-deleted users read as NotFound.
    pub fn update(&self, id: &str, update: UserUpdate) -> Result<User> {
        let mut user = self.get(id)?;
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            if !email.contains('@') {
                return Err(UserError::Validation("invalid email".to_string()));
            }
            user.email = email;
        }
        if let Some(phone) = update.phone {
            user.phone = Some(phone);
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        user.updated_at = Utc::now().to_rfc3339();

        let db = self.db.lock().unwrap();
        // Same taken-email check as create, excluding the user's own row, so
        // a duplicate surfaces as EmailTaken rather than a raw constraint hit.
        let taken: bool = db
            .query_row(
                "SELECT COUNT(*) FROM users WHERE email = ?1 COLLATE NOCASE AND id != ?2",
                rusqlite::params![user.email, user.id],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n > 0)?;
        if taken {
            return Err(UserError::EmailTaken(user.email));
        }
        db.execute(
            "UPDATE users SET name=?2, email=?3, phone=?4, role=?5, updated_at=?6
             WHERE id=?1",
            rusqlite::params![
                user.id,
                user.name,
                user.email,
                user.phone,
                user.role.to_string(),
                user.updated_at
            ],
        )?;
        Ok(user)
    }

    /// Soft delete: the account disappears from listings and can no longer
    /// log in, but the row (and references to it) remain.
    pub fn deactivate(&self, id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let rows = db.execute(
            "UPDATE users SET is_active = 0, updated_at = ?2 WHERE id = ?1 AND is_active = 1",
            rusqlite::params![id, now],
        )?;
        if rows == 0 {
            return Err(UserError::NotFound(id.to_string()));
        }
        // Revoke outstanding tokens so the account is locked out immediately.
        db.execute("DELETE FROM auth_tokens WHERE user_id = ?1", [id])?;
        info!(user_id = %id, "user deactivated");
        Ok(())
    }
}

fn validate_registration(name: &str, email: &str, password: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(UserError::Validation("name is required".to_string()));
    }
    if !email.contains('@') {
        return Err(UserError::Validation("invalid email".to_string()));
    }
    if password.len() < 6 {
        return Err(UserError::Validation(
            "password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| UserError::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| UserError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> UserStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        UserStore::new(conn)
    }

    #[test]
    fn register_and_authenticate() {
        let store = store();
        let user = store
            .create("Ana", "ana@example.com", None, UserRole::Technician, "hunter22")
            .unwrap();
        assert_eq!(user.role, UserRole::Technician);

        let back = store.authenticate("ana@example.com", "hunter22").unwrap();
        assert_eq!(back.id, user.id);
        assert!(matches!(
            store.authenticate("ana@example.com", "wrong"),
            Err(UserError::InvalidCredentials)
        ));
    }

    #[test]
    fn duplicate_email_is_rejected_case_insensitively() {
        let store = store();
        store
            .create("Ana", "ana@example.com", None, UserRole::Staff, "hunter22")
            .unwrap();
        assert!(matches!(
            store.create("Ana2", "ANA@example.com", None, UserRole::Staff, "hunter22"),
            Err(UserError::EmailTaken(_))
        ));
    }

    #[test]
    fn short_password_fails_validation() {
        let store = store();
        assert!(matches!(
            store.create("Bob", "bob@example.com", None, UserRole::Staff, "abc"),
            Err(UserError::Validation(_))
        ));
    }

    #[test]
    fn token_roundtrip_and_revocation() {
        let store = store();
        let user = store
            .create("Ana", "ana@example.com", None, UserRole::Admin, "hunter22")
            .unwrap();
        let token = store.issue_token(&user.id, 30).unwrap();

        let resolved = store.verify_token(&token.token).unwrap().unwrap();
        assert_eq!(resolved.id, user.id);

        store.revoke_token(&token.token).unwrap();
        assert!(store.verify_token(&token.token).unwrap().is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let store = store();
        let user = store
            .create("Ana", "ana@example.com", None, UserRole::Admin, "hunter22")
            .unwrap();
        // Negative TTL puts expires_at in the past.
        let token = store.issue_token(&user.id, -1).unwrap();
        assert!(store.verify_token(&token.token).unwrap().is_none());
    }

    #[test]
    fn deactivated_user_is_hidden_and_locked_out() {
        let store = store();
        let user = store
            .create("Ana", "ana@example.com", None, UserRole::Staff, "hunter22")
            .unwrap();
        let token = store.issue_token(&user.id, 30).unwrap();

        store.deactivate(&user.id).unwrap();

        assert!(matches!(store.get(&user.id), Err(UserError::NotFound(_))));
        assert!(store.verify_token(&token.token).unwrap().is_none());
        assert!(matches!(
            store.authenticate("ana@example.com", "hunter22"),
            Err(UserError::InvalidCredentials)
        ));
        // Reference expansion still resolves for historical records.
        assert!(store.user_ref(&user.id).unwrap().is_some());
    }

    #[test]
    fn list_filters_by_role_and_search() {
        let store = store();
        store
            .create("Ana Admin", "ana@example.com", None, UserRole::Admin, "hunter22")
            .unwrap();
        store
            .create("Tom Tech", "tom@example.com", None, UserRole::Technician, "hunter22")
            .unwrap();

        let (admins, total) = store.list(Some(UserRole::Admin), None, 1, 10).unwrap();
        assert_eq!(total, 1);
        assert_eq!(admins[0].name, "Ana Admin");

        let (hits, total) = store.list(None, Some("tom@"), 1, 10).unwrap();
        assert_eq!(total, 1);
        assert_eq!(hits[0].role, UserRole::Technician);
    }

    #[test]
    fn list_with_huge_page_numbers_returns_empty_not_panic() {
        let store = store();
        store
            .create("Ana", "ana@example.com", None, UserRole::Staff, "hunter22")
            .unwrap();

        let (hits, total) = store.list(None, None, u32::MAX, u32::MAX).unwrap();
        assert_eq!(total, 1);
        assert!(hits.is_empty());
    }

    #[test]
    fn updating_email_to_a_taken_address_is_rejected() {
        let store = store();
        store
            .create("Ana", "ana@example.com", None, UserRole::Staff, "hunter22")
            .unwrap();
        let bob = store
            .create("Bob", "bob@example.com", None, UserRole::Staff, "hunter22")
            .unwrap();

        assert!(matches!(
            store.update(
                &bob.id,
                UserUpdate {
                    email: Some("ANA@example.com".to_string()),
                    ..Default::default()
                },
            ),
            Err(UserError::EmailTaken(_))
        ));

        // Re-submitting the current address is not a conflict.
        let same = store
            .update(
                &bob.id,
                UserUpdate {
                    email: Some("bob@example.com".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(same.email, "bob@example.com");
    }

    #[test]
    fn update_changes_only_provided_fields() {
        let store = store();
        let user = store
            .create("Ana", "ana@example.com", Some("555"), UserRole::Staff, "hunter22")
            .unwrap();
        let updated = store
            .update(
                &user.id,
                UserUpdate {
                    role: Some(UserRole::Technician),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.role, UserRole::Technician);
        assert_eq!(updated.name, "Ana");
        assert_eq!(updated.phone.as_deref(), Some("555"));
    }
}
