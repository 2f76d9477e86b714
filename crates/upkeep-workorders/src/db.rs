use rusqlite::{Connection, Result};

use crate::types::{ActivityEntry, Category, Note, Priority, WoStatus, WorkOrder};

/// Column order shared by every SELECT in this crate.
pub(crate) const WO_COLUMNS: &str = "id, work_order_id, title, description, category, priority, \
     status, location, assigned_to, created_by, notes, activity_log, \
     completed_at, verified_at, created_at, updated_at";

/// Initialise the work-order schema. Idempotent; called on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    upkeep_core::ids::init_db(conn)?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS work_orders (
            id              TEXT PRIMARY KEY NOT NULL,
            work_order_id   TEXT NOT NULL UNIQUE,
            title           TEXT NOT NULL,
            description     TEXT NOT NULL,
            category        TEXT NOT NULL,
            priority        TEXT NOT NULL DEFAULT 'medium',
            status          TEXT NOT NULL DEFAULT 'open',
            location        TEXT NOT NULL,
            assigned_to     TEXT,
            created_by      TEXT NOT NULL,
            notes           TEXT NOT NULL DEFAULT '[]',  -- JSON array
            activity_log    TEXT NOT NULL DEFAULT '[]',  -- JSON array, append-only
            completed_at    TEXT,
            verified_at     TEXT,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_wo_created
            ON work_orders (created_at DESC);",
    )
}

/// Map a SELECT row (column order from WO_COLUMNS) to a WorkOrder.
pub(crate) fn row_to_work_order(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkOrder> {
    use std::str::FromStr;

    let category = Category::from_str(&row.get::<_, String>(4)?).unwrap_or(Category::Hvac);
    let priority = Priority::from_str(&row.get::<_, String>(5)?).unwrap_or_default();
    let status = WoStatus::from_str(&row.get::<_, String>(6)?).unwrap_or_default();
    let notes: Vec<Note> = serde_json::from_str(&row.get::<_, String>(10)?).unwrap_or_default();
    let activity_log: Vec<ActivityEntry> =
        serde_json::from_str(&row.get::<_, String>(11)?).unwrap_or_default();

    Ok(WorkOrder {
        id: row.get(0)?,
        work_order_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        category,
        priority,
        status,
        location: row.get(7)?,
        assigned_to: row.get(8)?,
        created_by: row.get(9)?,
        notes,
        activity_log,
        completed_at: row.get(12)?,
        verified_at: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}
