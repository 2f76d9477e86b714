use rusqlite::{Connection, Result};
use upkeep_core::types::UserRole;

use crate::types::User;

/// Column order shared by every SELECT in this crate.
pub(crate) const USER_COLUMNS: &str =
    "id, name, email, phone, role, password_hash, is_active, created_at, updated_at";

/// Map a SELECT row (column order from USER_COLUMNS) to a User.
/// Centralised here so every query in this crate stays consistent.
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    use std::str::FromStr;
    let role = UserRole::from_str(&row.get::<_, String>(4)?).unwrap_or_default();
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        role,
        password_hash: row.get(5)?,
        is_active: row.get::<_, i32>(6)? != 0,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Initialise all tables for the users subsystem. Safe to call on every
/// startup — CREATE IF NOT EXISTS means it's idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_users_table(conn)?;
    create_auth_tokens_table(conn)?;
    Ok(())
}

fn create_users_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY NOT NULL,
            name            TEXT NOT NULL,
            email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
            phone           TEXT,
            role            TEXT NOT NULL DEFAULT 'staff',
            password_hash   TEXT NOT NULL,
            is_active       INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );",
    )
}

fn create_auth_tokens_table(conn: &Connection) -> Result<()> {
    // idx_tokens_user speeds up revoking all of a user's tokens.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS auth_tokens (
            token       TEXT PRIMARY KEY NOT NULL,
            user_id     TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL,
            expires_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tokens_user
            ON auth_tokens (user_id);",
    )
}
