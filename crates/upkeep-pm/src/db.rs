use chrono::{DateTime, Utc};
use rusqlite::{Connection, Result};

use crate::types::{ChecklistItem, Frequency, PmSchedule, PmStatus};

/// Column order shared by every SELECT in this crate.
pub(crate) const PM_COLUMNS: &str = "id, pm_id, title, description, asset, frequency, \
     next_due_date, last_completed_date, assigned_to, status, checklist, \
     completion_notes, created_by, is_active, created_at, updated_at";

/// Initialise the PM schema. Idempotent; called on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    upkeep_core::ids::init_db(conn)?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS pm_schedules (
            id                   TEXT PRIMARY KEY NOT NULL,
            pm_id                TEXT NOT NULL UNIQUE,
            title                TEXT NOT NULL,
            description          TEXT,
            asset                TEXT NOT NULL,
            frequency            TEXT NOT NULL,
            next_due_date        TEXT NOT NULL,   -- RFC3339 UTC
            last_completed_date  TEXT,
            assigned_to          TEXT,
            status               TEXT NOT NULL DEFAULT 'scheduled',
            checklist            TEXT NOT NULL DEFAULT '[]',  -- JSON array
            completion_notes     TEXT,
            created_by           TEXT NOT NULL,
            is_active            INTEGER NOT NULL DEFAULT 1,
            created_at           TEXT NOT NULL,
            updated_at           TEXT NOT NULL
        );

        -- Listing sorts by due date; the active filter is on every query.
        CREATE INDEX IF NOT EXISTS idx_pm_due
            ON pm_schedules (is_active, next_due_date);",
    )
}

/// Map a SELECT row (column order from PM_COLUMNS) to a PmSchedule.
pub(crate) fn row_to_schedule(row: &rusqlite::Row<'_>) -> rusqlite::Result<PmSchedule> {
    use std::str::FromStr;

    let frequency =
        Frequency::from_str(&row.get::<_, String>(5)?).unwrap_or(Frequency::Monthly);
    let status = PmStatus::from_str(&row.get::<_, String>(9)?).unwrap_or(PmStatus::Scheduled);
    let checklist: Vec<ChecklistItem> =
        serde_json::from_str(&row.get::<_, String>(10)?).unwrap_or_default();

    Ok(PmSchedule {
        id: row.get(0)?,
        pm_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        asset: row.get(4)?,
        frequency,
        next_due_date: parse_utc(&row.get::<_, String>(6)?),
        last_completed_date: row.get::<_, Option<String>>(7)?.map(|s| parse_utc(&s)),
        assigned_to: row.get(8)?,
        status,
        checklist,
        completion_notes: row.get(11)?,
        created_by: row.get(12)?,
        is_active: row.get::<_, i32>(13)? != 0,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

/// Parse a stored RFC3339 timestamp. Rows are only ever written by this
/// crate, so a malformed value means external tampering; fall back to the
/// epoch rather than poisoning the whole listing.
fn parse_utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}
