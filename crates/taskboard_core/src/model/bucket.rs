//! Board bucket keys and task classification.
//!
//! # Invariants
//! - Buckets are derived, never persisted.
//! - `classify` is pure: same `(task, today)` always yields the same bucket.
//! - Completed tasks land in `Done`; pending tasks land in exactly one of
//!   `Overdue`, `DueToday`, `Upcoming`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::model::task::Task;

/// One of the four fixed board columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketKey {
    Overdue,
    DueToday,
    Upcoming,
    Done,
}

impl BucketKey {
    /// Column order as rendered on the board.
    pub const ALL: [BucketKey; 4] = [
        BucketKey::Overdue,
        BucketKey::DueToday,
        BucketKey::Upcoming,
        BucketKey::Done,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Overdue => 0,
            Self::DueToday => 1,
            Self::Upcoming => 2,
            Self::Done => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overdue => "overdue",
            Self::DueToday => "due_today",
            Self::Upcoming => "upcoming",
            Self::Done => "done",
        }
    }

    /// Column header text.
    pub fn label(self) -> &'static str {
        match self {
            Self::Overdue => "Overdue",
            Self::DueToday => "Due Today",
            Self::Upcoming => "Upcoming",
            Self::Done => "Done",
        }
    }

    /// Parses the snake_case key, also accepting the header text.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value
            .trim()
            .to_ascii_lowercase()
            .replace([' ', '-'], "_");
        match normalized.as_str() {
            "overdue" => Some(Self::Overdue),
            "due_today" | "duetoday" | "today" => Some(Self::DueToday),
            "upcoming" => Some(Self::Upcoming),
            "done" => Some(Self::Done),
            _ => None,
        }
    }

    /// Whether a user may drop a card here from another column.
    ///
    /// A task cannot be made overdue by hand.
    pub fn accepts_cross_drop(self) -> bool {
        self != Self::Overdue
    }
}

impl Display for BucketKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives the bucket of `task` relative to the calendar day `today`.
///
/// Completed tasks are always `Done`. Pending records with an untrustworthy
/// id, status or due date fall back to `Upcoming`.
pub fn classify(task: &Task, today: NaiveDate) -> BucketKey {
    if task.is_completed() {
        return BucketKey::Done;
    }
    if task.is_malformed() {
        return BucketKey::Upcoming;
    }
    match task.due_date {
        None => BucketKey::Upcoming,
        Some(due) if due < today => BucketKey::Overdue,
        Some(due) if due == today => BucketKey::DueToday,
        Some(_) => BucketKey::Upcoming,
    }
}
