use rusqlite::{Connection, Result};

/// Create the shared display-ID counter table. Idempotent; called by every
/// subsystem that hands out human-readable IDs.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS id_counters (
            prefix      TEXT PRIMARY KEY NOT NULL,
            next_value  INTEGER NOT NULL
        );",
    )
}

/// Allocate the next sequential display ID for `prefix`, e.g. `WO-0001`.
///
/// A single upsert-with-RETURNING statement, so concurrent allocations from
/// different connections on the same database file never hand out the same
/// number. IDs are assigned once and never reused — a deleted record leaves a
/// gap rather than letting a later record collide with its ID.
pub fn next_display_id(conn: &Connection, prefix: &str) -> Result<String> {
    let n: i64 = conn.query_row(
        "INSERT INTO id_counters (prefix, next_value) VALUES (?1, 2)
         ON CONFLICT(prefix) DO UPDATE SET next_value = next_value + 1
         RETURNING next_value - 1",
        [prefix],
        |row| row.get(0),
    )?;
    Ok(format!("{}-{:04}", prefix, n))
}
