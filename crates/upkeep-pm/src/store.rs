use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::info;
use upkeep_core::ids::next_display_id;
use upkeep_core::types::RecordId;

use crate::db::{row_to_schedule, PM_COLUMNS};
use crate::error::{PmError, Result};
use crate::lifecycle::{advance_due_date, bucket, derive_status};
use crate::types::{ChecklistItem, NewPmSchedule, PmListFilter, PmSchedule, PmUpdate};

/// Thread-safe store for PM schedules.
///
/// Wraps a single SQLite connection in a `Mutex`; every mutation runs the
/// status derivation at this write boundary, never in a background task.
pub struct PmStore {
    db: Mutex<Connection>,
}

impl PmStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Create a schedule. The display ID is allocated inside the same
    /// critical section as the insert, so consecutive creations always get
    /// distinct, increasing IDs.
    pub fn create(&self, new: NewPmSchedule, created_by: &str) -> Result<PmSchedule> {
        if new.title.trim().is_empty() {
            return Err(PmError::Validation("title is required".to_string()));
        }
        if new.asset.trim().is_empty() {
            return Err(PmError::Validation("asset is required".to_string()));
        }

        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let id = RecordId::new().0;
        let status = bucket(now, new.next_due_date);
        let checklist_json = serde_json::to_string(&new.checklist)?;

        let db = self.db.lock().unwrap();
        let pm_id = next_display_id(&db, "PM")?;
        db.execute(
            "INSERT INTO pm_schedules
             (id, pm_id, title, description, asset, frequency, next_due_date,
              last_completed_date, assigned_to, status, checklist,
              completion_notes, created_by, is_active, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,NULL,?8,?9,?10,NULL,?11,1,?12,?12)",
            rusqlite::params![
                id,
                pm_id,
                new.title,
                new.description,
                new.asset,
                new.frequency.to_string(),
                new.next_due_date.to_rfc3339(),
                new.assigned_to,
                status.to_string(),
                checklist_json,
                created_by,
                now_str
            ],
        )?;
        info!(%pm_id, title = %new.title, "pm schedule created");

        Ok(PmSchedule {
            id,
            pm_id,
            title: new.title,
            description: new.description,
            asset: new.asset,
            frequency: new.frequency,
            next_due_date: new.next_due_date,
            last_completed_date: None,
            assigned_to: new.assigned_to,
            status,
            checklist: new.checklist,
            completion_notes: None,
            created_by: created_by.to_string(),
            is_active: true,
            created_at: now_str.clone(),
            updated_at: now_str,
        })
    }

    /// Fetch an active schedule. Soft-deleted rows read as NotFound.
    pub fn get(&self, id: &str) -> Result<PmSchedule> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            &format!("SELECT {PM_COLUMNS} FROM pm_schedules WHERE id = ?1 AND is_active = 1"),
            rusqlite::params![id],
            row_to_schedule,
        ) {
            Ok(s) => Ok(s),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(PmError::NotFound(id.to_string())),
            Err(e) => Err(PmError::Database(e)),
        }
    }

    /// Fetch a schedule regardless of the active flag. Internal paths only
    /// (soft delete, audits); the HTTP read path always goes through `get`.
    pub fn get_any(&self, id: &str) -> Result<PmSchedule> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            &format!("SELECT {PM_COLUMNS} FROM pm_schedules WHERE id = ?1"),
            rusqlite::params![id],
            row_to_schedule,
        ) {
            Ok(s) => Ok(s),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(PmError::NotFound(id.to_string())),
            Err(e) => Err(PmError::Database(e)),
        }
    }

    /// List active schedules ordered by next due date (soonest first).
    /// Returns (page of schedules, total matching count).
    pub fn list(&self, filter: &PmListFilter) -> Result<(Vec<PmSchedule>, u64)> {
        let mut clauses = vec!["is_active = 1".to_string()];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(freq) = filter.frequency {
            params.push(Box::new(freq.to_string()));
            clauses.push(format!("frequency = ?{}", params.len()));
        }
        if let Some(status) = filter.status {
            params.push(Box::new(status.to_string()));
            clauses.push(format!("status = ?{}", params.len()));
        }
        if let Some(user_id) = &filter.assigned_to {
            params.push(Box::new(user_id.clone()));
            clauses.push(format!("assigned_to = ?{}", params.len()));
        }
        if let Some(term) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", term.trim());
            params.push(Box::new(pattern));
            let n = params.len();
            clauses.push(format!(
                "(pm_id LIKE ?{n} OR title LIKE ?{n} OR asset LIKE ?{n})"
            ));
        }

        let where_sql = clauses.join(" AND ");
        let limit = if filter.limit == 0 { 10 } else { filter.limit };
        // u64 so an absurd caller-supplied page cannot overflow the multiply.
        let offset = (u64::from(filter.page.max(1)) - 1) * u64::from(limit);

        let db = self.db.lock().unwrap();
        let total: u64 = db.query_row(
            &format!("SELECT COUNT(*) FROM pm_schedules WHERE {where_sql}"),
            rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
            |row| row.get::<_, i64>(0),
        )? as u64;

        let mut stmt = db.prepare(&format!(
            "SELECT {PM_COLUMNS} FROM pm_schedules WHERE {where_sql}
             ORDER BY next_due_date ASC LIMIT {limit} OFFSET {offset}"
        ))?;
        let schedules = stmt
            .query_map(
                rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
                row_to_schedule,
            )?
            .filter_map(|r| r.ok())
            .collect();

        Ok((schedules, total))
    }

    /// Apply a partial update, then re-derive status from the (possibly new)
    /// due date. A sticky `completed` survives derivation; everything else is
    /// recomputed — the caller cannot park a schedule in a stale bucket.
    pub fn update(&self, id: &str, update: PmUpdate) -> Result<PmSchedule> {
        self.update_at(id, update, Utc::now())
    }

    fn update_at(&self, id: &str, update: PmUpdate, now: DateTime<Utc>) -> Result<PmSchedule> {
        let mut schedule = self.get(id)?;

        if let Some(title) = update.title {
            if title.trim().is_empty() {
                return Err(PmError::Validation("title is required".to_string()));
            }
            schedule.title = title;
        }
        if let Some(description) = update.description {
            schedule.description = Some(description);
        }
        if let Some(asset) = update.asset {
            if asset.trim().is_empty() {
                return Err(PmError::Validation("asset is required".to_string()));
            }
            schedule.asset = asset;
        }
        if let Some(frequency) = update.frequency {
            schedule.frequency = frequency;
        }
        if let Some(due) = update.next_due_date {
            schedule.next_due_date = due;
        }
        if let Some(assigned) = update.assigned_to {
            schedule.assigned_to = assigned;
        }
        if let Some(checklist) = update.checklist {
            schedule.checklist = checklist;
        }
        if let Some(status) = update.status {
            schedule.status = status;
        }

        schedule.status = derive_status(now, schedule.next_due_date, schedule.status);
        schedule.updated_at = now.to_rfc3339();
        self.persist(&schedule)?;
        Ok(schedule)
    }

    /// Completion workflow: record the completion, roll the due date forward
    /// one period, and re-enter the recurrence cycle with a freshly derived
    /// status (never left as `completed`).
    pub fn complete(
        &self,
        id: &str,
        notes: Option<&str>,
        checklist: Option<Vec<ChecklistItem>>,
    ) -> Result<PmSchedule> {
        self.complete_at(id, notes, checklist, Utc::now())
    }

    fn complete_at(
        &self,
        id: &str,
        notes: Option<&str>,
        checklist: Option<Vec<ChecklistItem>>,
        now: DateTime<Utc>,
    ) -> Result<PmSchedule> {
        let mut schedule = self.get(id)?;

        schedule.last_completed_date = Some(now);
        if let Some(notes) = notes {
            schedule.completion_notes = Some(notes.to_string());
        }
        if let Some(checklist) = checklist {
            schedule.checklist = checklist;
        }

        let next = advance_due_date(schedule.next_due_date, schedule.frequency)
            .ok_or_else(|| PmError::InvalidDate("next due date out of range".to_string()))?;
        schedule.next_due_date = next;
        schedule.status = bucket(now, next);
        schedule.updated_at = now.to_rfc3339();

        self.persist(&schedule)?;
        info!(pm_id = %schedule.pm_id, next_due = %next, "pm task completed; schedule rolled forward");
        Ok(schedule)
    }

    /// Soft delete: hides the schedule from lists and detail reads while the
    /// row stays in storage.
    pub fn soft_delete(&self, id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let rows = db.execute(
            "UPDATE pm_schedules SET is_active = 0, updated_at = ?2
             WHERE id = ?1 AND is_active = 1",
            rusqlite::params![id, now],
        )?;
        if rows == 0 {
            return Err(PmError::NotFound(id.to_string()));
        }
        info!(pm = %id, "pm schedule soft-deleted");
        Ok(())
    }

    /// Write every mutable field back. `pm_id`, `created_by`, and
    /// `created_at` are immutable by construction — they are not in the SET.
    fn persist(&self, schedule: &PmSchedule) -> Result<()> {
        let checklist_json = serde_json::to_string(&schedule.checklist)?;
        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "UPDATE pm_schedules SET
                title=?2, description=?3, asset=?4, frequency=?5,
                next_due_date=?6, last_completed_date=?7, assigned_to=?8,
                status=?9, checklist=?10, completion_notes=?11, updated_at=?12
             WHERE id=?1",
            rusqlite::params![
                schedule.id,
                schedule.title,
                schedule.description,
                schedule.asset,
                schedule.frequency.to_string(),
                schedule.next_due_date.to_rfc3339(),
                schedule.last_completed_date.map(|dt| dt.to_rfc3339()),
                schedule.assigned_to,
                schedule.status.to_string(),
                checklist_json,
                schedule.completion_notes,
                schedule.updated_at
            ],
        )?;
        if rows == 0 {
            return Err(PmError::NotFound(schedule.id.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Frequency, PmStatus};
    use chrono::{Duration, TimeZone};

    fn store() -> PmStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        PmStore::new(conn)
    }

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn new_schedule(due: DateTime<Utc>) -> NewPmSchedule {
        NewPmSchedule {
            title: "Filter change".to_string(),
            description: None,
            asset: "AHU-3".to_string(),
            frequency: Frequency::Monthly,
            next_due_date: due,
            assigned_to: None,
            checklist: vec![],
        }
    }

    #[test]
    fn consecutive_creations_get_distinct_increasing_ids() {
        let store = store();
        let far = Utc::now() + Duration::days(60);
        let a = store.create(new_schedule(far), "u-1").unwrap();
        let b = store.create(new_schedule(far), "u-1").unwrap();
        assert_eq!(a.pm_id, "PM-0001");
        assert_eq!(b.pm_id, "PM-0002");
        assert!(a.pm_id < b.pm_id);
    }

    #[test]
    fn status_is_derived_at_creation() {
        let store = store();
        let overdue = store
            .create(new_schedule(Utc::now() - Duration::days(3)), "u-1")
            .unwrap();
        assert_eq!(overdue.status, PmStatus::Overdue);

        let soon = store
            .create(new_schedule(Utc::now() + Duration::days(2)), "u-1")
            .unwrap();
        assert_eq!(soon.status, PmStatus::Upcoming);

        let far = store
            .create(new_schedule(Utc::now() + Duration::days(30)), "u-1")
            .unwrap();
        assert_eq!(far.status, PmStatus::Scheduled);
    }

    #[test]
    fn past_due_schedule_becomes_overdue_on_next_save() {
        let store = store();
        let created = store
            .create(new_schedule(utc(2024, 6, 7)), "u-1")
            .unwrap();

        // Save with no field changes, three days after the due date.
        let saved = store
            .update_at(&created.id, PmUpdate::default(), utc(2024, 6, 10))
            .unwrap();
        assert_eq!(saved.status, PmStatus::Overdue);
    }

    #[test]
    fn explicit_completed_is_sticky_through_updates() {
        let store = store();
        let created = store
            .create(new_schedule(utc(2024, 6, 1)), "u-1")
            .unwrap();

        let marked = store
            .update_at(
                &created.id,
                PmUpdate {
                    status: Some(PmStatus::Completed),
                    ..Default::default()
                },
                utc(2024, 6, 10),
            )
            .unwrap();
        assert_eq!(marked.status, PmStatus::Completed);

        // A later unrelated update must not clear it.
        let renamed = store
            .update_at(
                &created.id,
                PmUpdate {
                    title: Some("Filter change (revised)".to_string()),
                    ..Default::default()
                },
                utc(2024, 6, 20),
            )
            .unwrap();
        assert_eq!(renamed.status, PmStatus::Completed);
    }

    #[test]
    fn quarterly_completion_rolls_forward_and_rederives() {
        let store = store();
        let mut new = new_schedule(utc(2024, 1, 15));
        new.frequency = Frequency::Quarterly;
        let created = store.create(new, "u-1").unwrap();

        let done = store
            .complete_at(&created.id, Some("replaced belts"), None, utc(2024, 2, 1))
            .unwrap();

        assert_eq!(done.next_due_date, utc(2024, 4, 15));
        assert_eq!(done.last_completed_date, Some(utc(2024, 2, 1)));
        assert_eq!(done.completion_notes.as_deref(), Some("replaced belts"));
        // 2024-04-15 is more than 7 days after 2024-02-01.
        assert_eq!(done.status, PmStatus::Scheduled);
    }

    #[test]
    fn monthly_completion_clamps_end_of_month() {
        let store = store();
        let created = store
            .create(new_schedule(utc(2025, 1, 31)), "u-1")
            .unwrap();
        let done = store
            .complete_at(&created.id, None, None, utc(2025, 1, 31))
            .unwrap();
        assert_eq!(done.next_due_date, utc(2025, 2, 28));
    }

    #[test]
    fn completion_clears_a_sticky_completed_status() {
        let store = store();
        let created = store
            .create(new_schedule(utc(2024, 6, 1)), "u-1")
            .unwrap();
        store
            .update_at(
                &created.id,
                PmUpdate {
                    status: Some(PmStatus::Completed),
                    ..Default::default()
                },
                utc(2024, 6, 1),
            )
            .unwrap();

        let done = store
            .complete_at(&created.id, None, None, utc(2024, 6, 1))
            .unwrap();
        // Monthly: due rolls to 2024-07-01, which is > 7 days out.
        assert_eq!(done.next_due_date, utc(2024, 7, 1));
        assert_ne!(done.status, PmStatus::Completed);
        assert_eq!(done.status, PmStatus::Scheduled);
    }

    #[test]
    fn completion_replaces_checklist_when_provided() {
        let store = store();
        let mut new = new_schedule(utc(2024, 6, 1));
        new.checklist = vec![ChecklistItem {
            item: "Inspect belts".to_string(),
            completed: false,
            completed_by: None,
            completed_at: None,
        }];
        let created = store.create(new, "u-1").unwrap();

        let ticked = vec![ChecklistItem {
            item: "Inspect belts".to_string(),
            completed: true,
            completed_by: Some("u-2".to_string()),
            completed_at: Some(utc(2024, 6, 1).to_rfc3339()),
        }];
        let done = store
            .complete_at(&created.id, None, Some(ticked.clone()), utc(2024, 6, 1))
            .unwrap();
        assert_eq!(done.checklist, ticked);

        // Completing again without a checklist keeps the stored one.
        let again = store
            .complete_at(&created.id, None, None, utc(2024, 7, 1))
            .unwrap();
        assert_eq!(again.checklist, ticked);
    }

    #[test]
    fn soft_delete_hides_from_list_and_get_but_not_get_any() {
        let store = store();
        let created = store
            .create(new_schedule(Utc::now() + Duration::days(30)), "u-1")
            .unwrap();

        store.soft_delete(&created.id).unwrap();

        let (listed, total) = store.list(&PmListFilter::default()).unwrap();
        assert!(listed.is_empty());
        assert_eq!(total, 0);
        assert!(matches!(store.get(&created.id), Err(PmError::NotFound(_))));

        let raw = store.get_any(&created.id).unwrap();
        assert!(!raw.is_active);
        assert_eq!(raw.pm_id, created.pm_id);
    }

    #[test]
    fn deleting_twice_is_not_found() {
        let store = store();
        let created = store
            .create(new_schedule(Utc::now()), "u-1")
            .unwrap();
        store.soft_delete(&created.id).unwrap();
        assert!(matches!(
            store.soft_delete(&created.id),
            Err(PmError::NotFound(_))
        ));
    }

    #[test]
    fn list_scopes_to_assignee_and_filters() {
        let store = store();
        let far = Utc::now() + Duration::days(60);

        let mut mine = new_schedule(far);
        mine.assigned_to = Some("tech-1".to_string());
        store.create(mine, "u-1").unwrap();

        let mut theirs = new_schedule(far);
        theirs.assigned_to = Some("tech-2".to_string());
        theirs.frequency = Frequency::Weekly;
        store.create(theirs, "u-1").unwrap();

        let (mine_only, total) = store
            .list(&PmListFilter {
                assigned_to: Some("tech-1".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(mine_only[0].assigned_to.as_deref(), Some("tech-1"));

        let (weekly, total) = store
            .list(&PmListFilter {
                frequency: Some(Frequency::Weekly),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(weekly[0].frequency, Frequency::Weekly);
    }

    #[test]
    fn list_with_huge_page_numbers_returns_empty_not_panic() {
        let store = store();
        store
            .create(new_schedule(Utc::now() + Duration::days(60)), "u-1")
            .unwrap();

        let (hits, total) = store
            .list(&PmListFilter {
                page: u32::MAX,
                limit: u32::MAX,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 1);
        assert!(hits.is_empty());
    }

    #[test]
    fn search_matches_display_id_title_and_asset() {
        let store = store();
        let far = Utc::now() + Duration::days(60);
        store.create(new_schedule(far), "u-1").unwrap();

        for term in ["PM-0001", "Filter", "AHU"] {
            let (hits, total) = store
                .list(&PmListFilter {
                    search: Some(term.to_string()),
                    ..Default::default()
                })
                .unwrap();
            assert_eq!(total, 1, "term {term:?} should match");
            assert_eq!(hits.len(), 1);
        }
    }

    #[test]
    fn pm_id_is_never_reassigned() {
        let store = store();
        let created = store
            .create(new_schedule(Utc::now()), "u-1")
            .unwrap();
        let updated = store
            .update(
                &created.id,
                PmUpdate {
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.pm_id, created.pm_id);

        let done = store.complete(&created.id, None, None).unwrap();
        assert_eq!(done.pm_id, created.pm_id);
    }
}
