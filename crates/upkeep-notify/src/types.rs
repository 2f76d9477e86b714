use serde::{Deserialize, Serialize};

/// Broad class of a notification, used for client-side grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    WorkOrder,
    Pm,
    Status,
    Alert,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationKind::WorkOrder => "work_order",
            NotificationKind::Pm => "pm",
            NotificationKind::Status => "status",
            NotificationKind::Alert => "alert",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "work_order" => Ok(NotificationKind::WorkOrder),
            "pm" => Ok(NotificationKind::Pm),
            "status" => Ok(NotificationKind::Status),
            "alert" => Ok(NotificationKind::Alert),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

/// What the optional `related_id` points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedKind {
    WorkOrder,
    PmSchedule,
}

impl std::fmt::Display for RelatedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RelatedKind::WorkOrder => "work_order",
            RelatedKind::PmSchedule => "pm_schedule",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for RelatedKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "work_order" => Ok(RelatedKind::WorkOrder),
            "pm_schedule" => Ok(RelatedKind::PmSchedule),
            other => Err(format!("unknown related kind: {other}")),
        }
    }
}

/// A persisted notification, owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// UUIDv7 primary key.
    pub id: String,
    /// Recipient user ID.
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    /// Primary key of the record this notification is about, if any.
    pub related_id: Option<String>,
    pub related_kind: Option<RelatedKind>,
    pub created_at: String,
}

/// Input for `NotifyStore::create`.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related_id: Option<String>,
    pub related_kind: Option<RelatedKind>,
}
