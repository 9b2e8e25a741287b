//! Partial task updates derived from board drops.
//!
//! # Invariants
//! - A patch carries only `status` and/or `due_date`.
//! - Dropping into `Overdue` never yields a patch.
//! - Applying the derived patch to a task makes it classify into the
//!   target bucket for the same `today`.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::model::bucket::BucketKey;
use crate::model::task::{Task, TaskStatus};

/// Partial update sent to the Task Store, e.g. as a `PUT /tasks/{id}` body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// Serialized as `yyyy-mm-dd`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.due_date.is_none()
    }

    /// Derives the patch for dropping `task` into `target`.
    ///
    /// Returns `None` for `Overdue`.
    pub fn for_drop(
        target: BucketKey,
        task: &Task,
        today: NaiveDate,
        policy: UpcomingDatePolicy,
    ) -> Option<Self> {
        match target {
            BucketKey::Overdue => None,
            BucketKey::Done => Some(Self {
                status: Some(TaskStatus::Completed),
                due_date: None,
            }),
            BucketKey::DueToday => Some(Self {
                status: Some(TaskStatus::Pending),
                due_date: Some(today),
            }),
            BucketKey::Upcoming => Some(Self {
                status: Some(TaskStatus::Pending),
                due_date: Some(policy.upcoming_date(task.due_date, today)),
            }),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Due date assigned when a card is dropped into `Upcoming`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpcomingDatePolicy {
    /// Always reset to the day after `today`.
    #[default]
    Tomorrow,
    /// Keep a due date that is already after `today`; otherwise tomorrow.
    KeepFuture,
}

impl UpcomingDatePolicy {
    pub fn upcoming_date(self, current: Option<NaiveDate>, today: NaiveDate) -> NaiveDate {
        match (self, current) {
            (Self::KeepFuture, Some(due)) if due > today => due,
            _ => tomorrow(today),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tomorrow => "tomorrow",
            Self::KeepFuture => "keep_future",
        }
    }
}

impl FromStr for UpcomingDatePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tomorrow" => Ok(Self::Tomorrow),
            "keep_future" | "keep-future" => Ok(Self::KeepFuture),
            other => Err(format!(
                "unsupported upcoming policy `{other}`; expected tomorrow|keep_future"
            )),
        }
    }
}

fn tomorrow(today: NaiveDate) -> NaiveDate {
    // Only `NaiveDate::MAX` has no successor.
    today.checked_add_days(Days::new(1)).unwrap_or(today)
}
