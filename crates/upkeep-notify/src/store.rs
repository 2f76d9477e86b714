use std::sync::Mutex;

use chrono::Utc;
use rusqlite::Connection;
use tracing::debug;
use upkeep_core::types::RecordId;

use crate::db::{row_to_notification, NOTIFICATION_COLUMNS};
use crate::error::{NotifyError, Result};
use crate::types::{NewNotification, Notification};

/// Thread-safe store for per-user notifications.
pub struct NotifyStore {
    db: Mutex<Connection>,
}

impl NotifyStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Create a notification for a single user.
    pub fn create(&self, new: NewNotification) -> Result<Notification> {
        if new.title.trim().is_empty() {
            return Err(NotifyError::Validation("title is required".to_string()));
        }
        let now = Utc::now().to_rfc3339();
        let id = RecordId::new().0;

        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO notifications
             (id, user_id, kind, title, message, read, related_id, related_kind, created_at)
             VALUES (?1,?2,?3,?4,?5,0,?6,?7,?8)",
            rusqlite::params![
                id,
                new.user_id,
                new.kind.to_string(),
                new.title,
                new.message,
                new.related_id,
                new.related_kind.map(|k| k.to_string()),
                now
            ],
        )?;
        debug!(user = %new.user_id, kind = %new.kind, "notification created");

        Ok(Notification {
            id,
            user_id: new.user_id,
            kind: new.kind,
            title: new.title,
            message: new.message,
            read: false,
            related_id: new.related_id,
            related_kind: new.related_kind,
            created_at: now,
        })
    }

    /// All notifications for one user, newest first.
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;
        let items = stmt
            .query_map([user_id], row_to_notification)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(items)
    }

    /// Unread count for one user.
    pub fn unread_count(&self, user_id: &str) -> Result<u64> {
        let db = self.db.lock().unwrap();
        let n: i64 = db.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read = 0",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    /// Mark one notification read. The row must belong to `user_id`; a row
    /// owned by someone else reads as NotFound rather than leaking existence.
    pub fn mark_read(&self, id: &str, user_id: &str) -> Result<Notification> {
        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![id, user_id],
        )?;
        if rows == 0 {
            return Err(NotifyError::NotFound(id.to_string()));
        }
        db.query_row(
            &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
            [id],
            row_to_notification,
        )
        .map_err(NotifyError::Database)
    }

    /// Mark every notification of one user read. Returns how many changed.
    pub fn mark_all_read(&self, user_id: &str) -> Result<u64> {
        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
            [user_id],
        )?;
        Ok(rows as u64)
    }

    /// Delete one notification, ownership-checked like `mark_read`.
    pub fn delete(&self, id: &str, user_id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![id, user_id],
        )?;
        if rows == 0 {
            return Err(NotifyError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NotificationKind, RelatedKind};

    fn store() -> NotifyStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        NotifyStore::new(conn)
    }

    fn notify(user: &str, title: &str) -> NewNotification {
        NewNotification {
            user_id: user.to_string(),
            kind: NotificationKind::WorkOrder,
            title: title.to_string(),
            message: "You were assigned a work order".to_string(),
            related_id: Some("wo-1".to_string()),
            related_kind: Some(RelatedKind::WorkOrder),
        }
    }

    #[test]
    fn create_and_list_scoped_to_user() {
        let store = store();
        store.create(notify("u-1", "First")).unwrap();
        store.create(notify("u-1", "Second")).unwrap();
        store.create(notify("u-2", "Other user")).unwrap();

        let mine = store.list_for_user("u-1").unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|n| n.user_id == "u-1"));
        assert!(mine.iter().all(|n| !n.read));
        assert_eq!(store.unread_count("u-1").unwrap(), 2);
        assert_eq!(store.list_for_user("u-3").unwrap().len(), 0);
    }

    #[test]
    fn empty_title_fails_validation() {
        let store = store();
        assert!(matches!(
            store.create(notify("u-1", "  ")),
            Err(NotifyError::Validation(_))
        ));
    }

    #[test]
    fn mark_read_enforces_ownership() {
        let store = store();
        let n = store.create(notify("u-1", "Assigned")).unwrap();

        assert!(matches!(
            store.mark_read(&n.id, "u-2"),
            Err(NotifyError::NotFound(_))
        ));

        let read = store.mark_read(&n.id, "u-1").unwrap();
        assert!(read.read);
        assert_eq!(store.unread_count("u-1").unwrap(), 0);
    }

    #[test]
    fn mark_all_read_counts_changes() {
        let store = store();
        store.create(notify("u-1", "One")).unwrap();
        store.create(notify("u-1", "Two")).unwrap();
        store.create(notify("u-2", "Theirs")).unwrap();

        assert_eq!(store.mark_all_read("u-1").unwrap(), 2);
        assert_eq!(store.mark_all_read("u-1").unwrap(), 0);
        assert_eq!(store.unread_count("u-2").unwrap(), 1);
    }

    #[test]
    fn delete_enforces_ownership() {
        let store = store();
        let n = store.create(notify("u-1", "Gone soon")).unwrap();

        assert!(matches!(
            store.delete(&n.id, "u-2"),
            Err(NotifyError::NotFound(_))
        ));
        store.delete(&n.id, "u-1").unwrap();
        assert!(store.list_for_user("u-1").unwrap().is_empty());
    }
}
