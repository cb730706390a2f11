//! Transient user-facing notices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of notice. At most one notice of each kind is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Error,
    Success,
}

impl NoticeKind {
    /// Both kinds, in display order.
    pub const ALL: [Self; 2] = [Self::Error, Self::Success];
}

/// A transient, auto-expiring message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Monotonic id, used to tell a replaced notice from its successor.
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
