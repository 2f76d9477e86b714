//! `upkeep-pm` — preventive-maintenance schedules with SQLite persistence.
//!
//! # Overview
//!
//! Schedules are persisted to a SQLite `pm_schedules` table. Status is never
//! recomputed in the background: [`lifecycle::derive_status`] runs at every
//! write boundary (create / update / complete), so overdue and upcoming
//! states refresh lazily on the next write.
//!
//! # Status buckets
//!
//! | Days until due | Status    |
//! |----------------|-----------|
//! | < 0            | Overdue   |
//! | 0 ..= 7        | Upcoming  |
//! | > 7            | Scheduled |
//!
//! `Completed` is sticky: only the completion workflow clears it, by rolling
//! the due date forward one period and re-deriving from the new date.

pub mod db;
pub mod error;
pub mod lifecycle;
pub mod store;
pub mod types;

pub use error::{PmError, Result};
pub use store::PmStore;
pub use types::{
    ChecklistItem, Frequency, NewPmSchedule, PmListFilter, PmSchedule, PmStatus, PmUpdate,
};
