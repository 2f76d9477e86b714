use serde::{Deserialize, Serialize};

/// Trade category of a work order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Hvac,
    Electrical,
    Plumbing,
    FireSafety,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Hvac => "hvac",
            Category::Electrical => "electrical",
            Category::Plumbing => "plumbing",
            Category::FireSafety => "fire_safety",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "hvac" => Ok(Category::Hvac),
            "electrical" => Ok(Category::Electrical),
            "plumbing" => Ok(Category::Plumbing),
            "fire_safety" => Ok(Category::FireSafety),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// Urgency of a work order. Emergency jumps every queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Emergency,
    High,
    #[default]
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::Emergency => "emergency",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "emergency" => Ok(Priority::Emergency),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Work-order lifecycle. Completed records the technician finishing the job;
/// Verified records sign-off by whoever raised or supervises it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WoStatus {
    #[default]
    Open,
    InProgress,
    Completed,
    Verified,
}

impl std::fmt::Display for WoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WoStatus::Open => "open",
            WoStatus::InProgress => "in_progress",
            WoStatus::Completed => "completed",
            WoStatus::Verified => "verified",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for WoStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "open" => Ok(WoStatus::Open),
            "in_progress" => Ok(WoStatus::InProgress),
            "completed" => Ok(WoStatus::Completed),
            "verified" => Ok(WoStatus::Verified),
            other => Err(format!("unknown work order status: {other}")),
        }
    }
}

/// Free-text note attached to a work order. The author's name is denormalised
/// so rendering a thread never needs a user lookup per note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub user_id: String,
    pub user_name: String,
    pub text: String,
    pub created_at: String,
}

/// One line of the append-only activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Machine-readable action: created, updated, status_changed, note_added.
    pub action: String,
    pub user_id: String,
    pub user_name: String,
    pub details: String,
    pub timestamp: String,
}

/// A persisted work order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    /// UUIDv7 primary key.
    pub id: String,
    /// Human-readable display ID (`WO-0001`). Assigned once, never mutated.
    pub work_order_id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub status: WoStatus,
    pub location: String,
    /// Technician user ID, if assigned.
    pub assigned_to: Option<String>,
    /// Creator user ID.
    pub created_by: String,
    /// Stored as JSON arrays in SQLite.
    pub notes: Vec<Note>,
    pub activity_log: Vec<ActivityEntry>,
    /// Stamped the first time the order reaches the matching status.
    pub completed_at: Option<String>,
    pub verified_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for `WorkOrderStore::create`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewWorkOrder {
    pub title: String,
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    pub location: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

/// Partial update for `WorkOrderStore::update`. Missing fields stay
/// unchanged; `assigned_to: null` clears the assignment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<String>>,
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

/// Listing filter.
#[derive(Debug, Clone, Default)]
pub struct WoListFilter {
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub status: Option<WoStatus>,
    pub search: Option<String>,
    pub page: u32,
    pub limit: u32,
}
