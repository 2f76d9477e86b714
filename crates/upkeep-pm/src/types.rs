use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recurrence interval controlling next-due-date rollover on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annually,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Annually => "annually",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "quarterly" => Ok(Frequency::Quarterly),
            "annually" => Ok(Frequency::Annually),
            other => Err(format!("unknown frequency: {other}")),
        }
    }
}

/// Lifecycle state of a schedule.
///
/// `Completed` is set only by the completion workflow and is sticky under
/// derivation; the other three are pure functions of (now, next_due_date).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PmStatus {
    Scheduled,
    Upcoming,
    Overdue,
    Completed,
}

impl std::fmt::Display for PmStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PmStatus::Scheduled => "scheduled",
            PmStatus::Upcoming => "upcoming",
            PmStatus::Overdue => "overdue",
            PmStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PmStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(PmStatus::Scheduled),
            "upcoming" => Ok(PmStatus::Upcoming),
            "overdue" => Ok(PmStatus::Overdue),
            "completed" => Ok(PmStatus::Completed),
            other => Err(format!("unknown pm status: {other}")),
        }
    }
}

/// One line of a schedule's checklist. The completer reference is recorded
/// when a technician ticks the box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub item: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_by: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

/// A persisted PM schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PmSchedule {
    /// UUIDv7 primary key.
    pub id: String,
    /// Human-readable display ID (`PM-0001`). Assigned once, never mutated.
    pub pm_id: String,
    pub title: String,
    pub description: Option<String>,
    /// The asset this schedule maintains (e.g. "AHU-3, Roof").
    pub asset: String,
    pub frequency: Frequency,
    pub next_due_date: DateTime<Utc>,
    pub last_completed_date: Option<DateTime<Utc>>,
    /// Technician user ID, if assigned.
    pub assigned_to: Option<String>,
    pub status: PmStatus,
    /// Stored as a JSON array in SQLite (no separate checklist table).
    pub checklist: Vec<ChecklistItem>,
    pub completion_notes: Option<String>,
    /// Creator user ID.
    pub created_by: String,
    /// Soft delete — inactive schedules are hidden from lists and detail reads.
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for `PmStore::create`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPmSchedule {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub asset: String,
    pub frequency: Frequency,
    pub next_due_date: DateTime<Utc>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
}

/// Partial update for `PmStore::update`. Missing fields stay unchanged;
/// `assigned_to: null` in the request body clears the assignment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PmUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub asset: Option<String>,
    pub frequency: Option<Frequency>,
    pub next_due_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<String>>,
    pub checklist: Option<Vec<ChecklistItem>>,
    /// Explicitly marking a schedule `completed` makes that status sticky
    /// until the completion workflow rolls it forward. Any other value is
    /// overridden by derivation at the write boundary.
    pub status: Option<PmStatus>,
}

/// Distinguish an absent field (outer None — leave unchanged) from an
/// explicit `null` (Some(None) — clear the assignment).
fn double_option<'de, T, D>(de: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

/// Listing filter. `assigned_to` implements the technician visibility scope.
#[derive(Debug, Clone, Default)]
pub struct PmListFilter {
    pub frequency: Option<Frequency>,
    pub status: Option<PmStatus>,
    pub search: Option<String>,
    pub assigned_to: Option<String>,
    pub page: u32,
    pub limit: u32,
}
