use std::sync::Mutex;

use chrono::Utc;
use rusqlite::Connection;
use tracing::info;
use upkeep_core::ids::next_display_id;
use upkeep_core::types::RecordId;

use crate::db::{row_to_work_order, WO_COLUMNS};
use crate::error::{Result, WorkOrderError};
use crate::types::{
    ActivityEntry, NewWorkOrder, Note, WoListFilter, WoStatus, WoUpdate, WorkOrder,
};

/// The acting user stamped into notes and activity-log entries.
#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    pub id: &'a str,
    pub name: &'a str,
}

/// Thread-safe store for work orders.
pub struct WorkOrderStore {
    db: Mutex<Connection>,
}

impl WorkOrderStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Create a work order, seeding the activity log with a `created` entry.
    pub fn create(&self, new: NewWorkOrder, actor: Actor<'_>) -> Result<WorkOrder> {
        if new.title.trim().is_empty() {
            return Err(WorkOrderError::Validation("title is required".to_string()));
        }
        if new.description.trim().is_empty() {
            return Err(WorkOrderError::Validation(
                "description is required".to_string(),
            ));
        }
        if new.location.trim().is_empty() {
            return Err(WorkOrderError::Validation(
                "location is required".to_string(),
            ));
        }

        let now = Utc::now().to_rfc3339();
        let id = RecordId::new().0;
        let activity_log = vec![ActivityEntry {
            action: "created".to_string(),
            user_id: actor.id.to_string(),
            user_name: actor.name.to_string(),
            details: "Work order created".to_string(),
            timestamp: now.clone(),
        }];
        let log_json = serde_json::to_string(&activity_log)?;

        let db = self.db.lock().unwrap();
        let work_order_id = next_display_id(&db, "WO")?;
        db.execute(
            "INSERT INTO work_orders
             (id, work_order_id, title, description, category, priority, status,
              location, assigned_to, created_by, notes, activity_log,
              completed_at, verified_at, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,'open',?7,?8,?9,'[]',?10,NULL,NULL,?11,?11)",
            rusqlite::params![
                id,
                work_order_id,
                new.title,
                new.description,
                new.category.to_string(),
                new.priority.to_string(),
                new.location,
                new.assigned_to,
                actor.id,
                log_json,
                now
            ],
        )?;
        info!(%work_order_id, title = %new.title, "work order created");

        Ok(WorkOrder {
            id,
            work_order_id,
            title: new.title,
            description: new.description,
            category: new.category,
            priority: new.priority,
            status: WoStatus::Open,
            location: new.location,
            assigned_to: new.assigned_to,
            created_by: actor.id.to_string(),
            notes: vec![],
            activity_log,
            completed_at: None,
            verified_at: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Fetch a work order by primary key.
    pub fn get(&self, id: &str) -> Result<WorkOrder> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            &format!("SELECT {WO_COLUMNS} FROM work_orders WHERE id = ?1"),
            rusqlite::params![id],
            row_to_work_order,
        ) {
            Ok(wo) => Ok(wo),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(WorkOrderError::NotFound(id.to_string()))
            }
            Err(e) => Err(WorkOrderError::Database(e)),
        }
    }

    /// List work orders, newest first. Returns (page, total matching count).
    pub fn list(&self, filter: &WoListFilter) -> Result<(Vec<WorkOrder>, u64)> {
        let mut clauses = vec!["1=1".to_string()];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(category) = filter.category {
            params.push(Box::new(category.to_string()));
            clauses.push(format!("category = ?{}", params.len()));
        }
        if let Some(priority) = filter.priority {
            params.push(Box::new(priority.to_string()));
            clauses.push(format!("priority = ?{}", params.len()));
        }
        if let Some(status) = filter.status {
            params.push(Box::new(status.to_string()));
            clauses.push(format!("status = ?{}", params.len()));
        }
        if let Some(term) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", term.trim());
            params.push(Box::new(pattern));
            let n = params.len();
            clauses.push(format!(
                "(work_order_id LIKE ?{n} OR title LIKE ?{n} OR description LIKE ?{n})"
            ));
        }

        let where_sql = clauses.join(" AND ");
        let limit = if filter.limit == 0 { 10 } else { filter.limit };
        // u64 so an absurd caller-supplied page cannot overflow the multiply.
        let offset = (u64::from(filter.page.max(1)) - 1) * u64::from(limit);

        let db = self.db.lock().unwrap();
        let total: u64 = db.query_row(
            &format!("SELECT COUNT(*) FROM work_orders WHERE {where_sql}"),
            rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
            |row| row.get::<_, i64>(0),
        )? as u64;

        let mut stmt = db.prepare(&format!(
            "SELECT {WO_COLUMNS} FROM work_orders WHERE {where_sql}
             ORDER BY created_at DESC LIMIT {limit} OFFSET {offset}"
        ))?;
        let orders = stmt
            .query_map(
                rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
                row_to_work_order,
            )?
            .filter_map(|r| r.ok())
            .collect();

        Ok((orders, total))
    }

    /// Apply a partial update and append an `updated` activity entry.
    pub fn update(&self, id: &str, update: WoUpdate, actor: Actor<'_>) -> Result<WorkOrder> {
        let mut wo = self.get(id)?;

        if let Some(title) = update.title {
            if title.trim().is_empty() {
                return Err(WorkOrderError::Validation("title is required".to_string()));
            }
            wo.title = title;
        }
        if let Some(description) = update.description {
            wo.description = description;
        }
        if let Some(category) = update.category {
            wo.category = category;
        }
        if let Some(priority) = update.priority {
            wo.priority = priority;
        }
        if let Some(location) = update.location {
            wo.location = location;
        }
        if let Some(assigned) = update.assigned_to {
            wo.assigned_to = assigned;
        }

        let now = Utc::now().to_rfc3339();
        wo.activity_log.push(ActivityEntry {
            action: "updated".to_string(),
            user_id: actor.id.to_string(),
            user_name: actor.name.to_string(),
            details: "Work order details updated".to_string(),
            timestamp: now.clone(),
        });
        wo.updated_at = now;

        self.persist(&wo)?;
        Ok(wo)
    }

    /// Transition status, stamping completed_at / verified_at the first time
    /// each is reached, and log the change. Returns the updated order and the
    /// status it moved from (for notification text).
    pub fn set_status(
        &self,
        id: &str,
        status: WoStatus,
        actor: Actor<'_>,
    ) -> Result<(WorkOrder, WoStatus)> {
        let mut wo = self.get(id)?;
        let old_status = wo.status;
        let now = Utc::now().to_rfc3339();

        wo.status = status;
        if status == WoStatus::Completed && wo.completed_at.is_none() {
            wo.completed_at = Some(now.clone());
        }
        if status == WoStatus::Verified && wo.verified_at.is_none() {
            wo.verified_at = Some(now.clone());
        }

        wo.activity_log.push(ActivityEntry {
            action: "status_changed".to_string(),
            user_id: actor.id.to_string(),
            user_name: actor.name.to_string(),
            details: format!("Status changed from {old_status} to {status}"),
            timestamp: now.clone(),
        });
        wo.updated_at = now;

        self.persist(&wo)?;
        info!(work_order_id = %wo.work_order_id, from = %old_status, to = %status, "status changed");
        Ok((wo, old_status))
    }

    /// Append a note (and the matching activity entry).
    pub fn add_note(&self, id: &str, text: &str, actor: Actor<'_>) -> Result<WorkOrder> {
        if text.trim().is_empty() {
            return Err(WorkOrderError::Validation(
                "note text is required".to_string(),
            ));
        }
        let mut wo = self.get(id)?;
        let now = Utc::now().to_rfc3339();

        wo.notes.push(Note {
            user_id: actor.id.to_string(),
            user_name: actor.name.to_string(),
            text: text.to_string(),
            created_at: now.clone(),
        });
        wo.activity_log.push(ActivityEntry {
            action: "note_added".to_string(),
            user_id: actor.id.to_string(),
            user_name: actor.name.to_string(),
            details: "Added a note".to_string(),
            timestamp: now.clone(),
        });
        wo.updated_at = now;

        self.persist(&wo)?;
        Ok(wo)
    }

    /// Hard delete. Work orders have no soft-delete flag; the display ID is
    /// never reissued, so a later record cannot collide with the deleted one.
    pub fn delete(&self, id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let rows = db.execute("DELETE FROM work_orders WHERE id = ?1", [id])?;
        if rows == 0 {
            return Err(WorkOrderError::NotFound(id.to_string()));
        }
        info!(work_order = %id, "work order deleted");
        Ok(())
    }

    /// Write every mutable field back. `work_order_id`, `created_by`, and
    /// `created_at` are immutable by construction.
    fn persist(&self, wo: &WorkOrder) -> Result<()> {
        let notes_json = serde_json::to_string(&wo.notes)?;
        let log_json = serde_json::to_string(&wo.activity_log)?;
        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "UPDATE work_orders SET
                title=?2, description=?3, category=?4, priority=?5, status=?6,
                location=?7, assigned_to=?8, notes=?9, activity_log=?10,
                completed_at=?11, verified_at=?12, updated_at=?13
             WHERE id=?1",
            rusqlite::params![
                wo.id,
                wo.title,
                wo.description,
                wo.category.to_string(),
                wo.priority.to_string(),
                wo.status.to_string(),
                wo.location,
                wo.assigned_to,
                notes_json,
                log_json,
                wo.completed_at,
                wo.verified_at,
                wo.updated_at
            ],
        )?;
        if rows == 0 {
            return Err(WorkOrderError::NotFound(wo.id.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Priority};

    const ACTOR: Actor<'_> = Actor {
        id: "u-1",
        name: "Ana",
    };

    fn store() -> WorkOrderStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        WorkOrderStore::new(conn)
    }

    fn new_order() -> NewWorkOrder {
        NewWorkOrder {
            title: "Leaking valve".to_string(),
            description: "Water pooling under sink".to_string(),
            category: Category::Plumbing,
            priority: Priority::High,
            location: "Building B, 2F".to_string(),
            assigned_to: None,
        }
    }

    #[test]
    fn create_seeds_display_id_and_activity_log() {
        let store = store();
        let a = store.create(new_order(), ACTOR).unwrap();
        let b = store.create(new_order(), ACTOR).unwrap();

        assert_eq!(a.work_order_id, "WO-0001");
        assert_eq!(b.work_order_id, "WO-0002");
        assert_eq!(a.status, WoStatus::Open);
        assert_eq!(a.activity_log.len(), 1);
        assert_eq!(a.activity_log[0].action, "created");
    }

    #[test]
    fn missing_required_fields_fail_validation() {
        let store = store();
        let mut bad = new_order();
        bad.location = "  ".to_string();
        assert!(matches!(
            store.create(bad, ACTOR),
            Err(WorkOrderError::Validation(_))
        ));
    }

    #[test]
    fn status_transition_stamps_dates_once() {
        let store = store();
        let wo = store.create(new_order(), ACTOR).unwrap();

        let (wo, old) = store.set_status(&wo.id, WoStatus::Completed, ACTOR).unwrap();
        assert_eq!(old, WoStatus::Open);
        let first_completed = wo.completed_at.clone().unwrap();

        // Re-completing does not move the original stamp.
        let (wo, _) = store.set_status(&wo.id, WoStatus::InProgress, ACTOR).unwrap();
        let (wo, _) = store.set_status(&wo.id, WoStatus::Completed, ACTOR).unwrap();
        assert_eq!(wo.completed_at.as_deref(), Some(first_completed.as_str()));

        let (wo, _) = store.set_status(&wo.id, WoStatus::Verified, ACTOR).unwrap();
        assert!(wo.verified_at.is_some());
        // created + 4 transitions
        assert_eq!(wo.activity_log.len(), 5);
        assert!(wo
            .activity_log
            .last()
            .unwrap()
            .details
            .contains("from completed to verified"));
    }

    #[test]
    fn notes_append_with_activity() {
        let store = store();
        let wo = store.create(new_order(), ACTOR).unwrap();
        let wo = store.add_note(&wo.id, "Ordered a new valve", ACTOR).unwrap();

        assert_eq!(wo.notes.len(), 1);
        assert_eq!(wo.notes[0].user_name, "Ana");
        assert_eq!(wo.activity_log.last().unwrap().action, "note_added");

        assert!(matches!(
            store.add_note(&wo.id, "   ", ACTOR),
            Err(WorkOrderError::Validation(_))
        ));
    }

    #[test]
    fn update_changes_fields_and_logs() {
        let store = store();
        let wo = store.create(new_order(), ACTOR).unwrap();

        let updated = store
            .update(
                &wo.id,
                WoUpdate {
                    priority: Some(Priority::Emergency),
                    assigned_to: Some(Some("tech-7".to_string())),
                    ..Default::default()
                },
                ACTOR,
            )
            .unwrap();
        assert_eq!(updated.priority, Priority::Emergency);
        assert_eq!(updated.assigned_to.as_deref(), Some("tech-7"));
        assert_eq!(updated.work_order_id, wo.work_order_id);
        assert_eq!(updated.activity_log.last().unwrap().action, "updated");

        // Explicit null clears the assignment.
        let cleared = store
            .update(
                &wo.id,
                WoUpdate {
                    assigned_to: Some(None),
                    ..Default::default()
                },
                ACTOR,
            )
            .unwrap();
        assert!(cleared.assigned_to.is_none());
    }

    #[test]
    fn list_filters_and_paginates() {
        let store = store();
        for _ in 0..3 {
            store.create(new_order(), ACTOR).unwrap();
        }
        let mut electrical = new_order();
        electrical.category = Category::Electrical;
        electrical.title = "Dead outlet".to_string();
        store.create(electrical, ACTOR).unwrap();

        let (hits, total) = store
            .list(&WoListFilter {
                category: Some(Category::Plumbing),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(hits.len(), 3);

        let (page, total) = store
            .list(&WoListFilter {
                page: 2,
                limit: 2,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 4);
        assert_eq!(page.len(), 2);

        let (hits, _) = store
            .list(&WoListFilter {
                search: Some("outlet".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].category, Category::Electrical);
    }

    #[test]
    fn list_with_huge_page_numbers_returns_empty_not_panic() {
        let store = store();
        store.create(new_order(), ACTOR).unwrap();

        let (hits, total) = store
            .list(&WoListFilter {
                page: u32::MAX,
                limit: u32::MAX,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 1);
        assert!(hits.is_empty());
    }

    #[test]
    fn delete_is_hard_and_ids_are_not_reused() {
        let store = store();
        let wo = store.create(new_order(), ACTOR).unwrap();
        store.delete(&wo.id).unwrap();

        assert!(matches!(store.get(&wo.id), Err(WorkOrderError::NotFound(_))));
        assert!(matches!(store.delete(&wo.id), Err(WorkOrderError::NotFound(_))));

        let next = store.create(new_order(), ACTOR).unwrap();
        assert_eq!(next.work_order_id, "WO-0002");
    }
}
