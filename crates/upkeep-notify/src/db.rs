use rusqlite::{Connection, Result};

use crate::types::{Notification, NotificationKind, RelatedKind};

/// Column order shared by every SELECT in this crate.
pub(crate) const NOTIFICATION_COLUMNS: &str =
    "id, user_id, kind, title, message, read, related_id, related_kind, created_at";

/// Initialise the notification schema. Idempotent; called on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS notifications (
            id            TEXT PRIMARY KEY NOT NULL,
            user_id       TEXT NOT NULL,
            kind          TEXT NOT NULL,
            title         TEXT NOT NULL,
            message       TEXT NOT NULL,
            read          INTEGER NOT NULL DEFAULT 0,
            related_id    TEXT,
            related_kind  TEXT,
            created_at    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications (user_id, created_at DESC);",
    )
}

/// Map a SELECT row (column order from NOTIFICATION_COLUMNS) to a Notification.
pub(crate) fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    use std::str::FromStr;

    let kind =
        NotificationKind::from_str(&row.get::<_, String>(2)?).unwrap_or(NotificationKind::Alert);
    let related_kind = row
        .get::<_, Option<String>>(7)?
        .and_then(|s| RelatedKind::from_str(&s).ok());

    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind,
        title: row.get(3)?,
        message: row.get(4)?,
        read: row.get(5)?,
        related_id: row.get(6)?,
        related_kind,
        created_at: row.get(8)?,
    })
}
