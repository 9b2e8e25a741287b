//! Task domain model and record decoding.
//!
//! # Responsibility
//! - Define the canonical task shape consumed by the board.
//! - Decode loosely-typed store records without failing the whole list.
//!
//! # Invariants
//! - `id` is stable for the lifetime of a task and never reused.
//! - A record that cannot be decoded cleanly is still represented; its
//!   problems are listed in `defects` instead of aborting the load.
//! - Priority and relations are display-only and never patched here.

use chrono::{DateTime, NaiveDate};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;
use uuid::Uuid;

use crate::model::patch::TaskPatch;

const LOCAL_ID_PREFIX: &str = "local-";
const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Opaque stable task identifier assigned by the Task Store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a fresh store identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Board-local identifier for records that arrived without one.
    ///
    /// Such ids are never sent to the store.
    pub fn local_placeholder() -> Self {
        Self(format!("{LOCAL_ID_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for TaskId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

/// Task lifecycle state as stored by the CRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Display-only priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Read-only summary of an associated CRM entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

impl RelationSummary {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
        }
    }
}

/// Display references carried on a task card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRelations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opportunity: Option<RelationSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<RelationSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<RelationSummary>,
}

/// Problem found while decoding one store record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RecordDefect {
    MissingId,
    UnparsableDueDate(String),
    UnknownStatus(String),
    UnknownPriority(String),
}

impl RecordDefect {
    /// Whether this defect makes the derived bucket untrustworthy.
    pub fn affects_classification(&self) -> bool {
        !matches!(self, Self::UnknownPriority(_))
    }
}

/// Canonical task record used by the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    /// Calendar date only; time of day is never used.
    pub due_date: Option<NaiveDate>,
    pub priority: TaskPriority,
    #[serde(default)]
    pub relations: TaskRelations,
    /// Decoding problems. Empty for records produced by this crate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defects: Vec<RecordDefect>,
}

impl Task {
    /// Creates a pending, medium-priority task without due date.
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: TaskStatus::Pending,
            due_date: None,
            priority: TaskPriority::default(),
            relations: TaskRelations::default(),
            defects: Vec::new(),
        }
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Whether decoding problems prevent trusting status/due date.
    pub fn is_malformed(&self) -> bool {
        self.defects
            .iter()
            .any(RecordDefect::affects_classification)
    }

    /// Whether this task can be addressed in store patches.
    pub fn has_store_id(&self) -> bool {
        !self.defects.contains(&RecordDefect::MissingId)
    }

    /// Applies the fields present in `patch`.
    ///
    /// Status and due date become trustworthy once explicitly set, so the
    /// matching defects are cleared.
    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(status) = patch.status {
            self.status = status;
            self.defects
                .retain(|defect| !matches!(defect, RecordDefect::UnknownStatus(_)));
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = Some(due_date);
            self.defects
                .retain(|defect| !matches!(defect, RecordDefect::UnparsableDueDate(_)));
        }
    }

    /// Validates a task before it is written to a local store.
    ///
    /// # Errors
    /// - `BlankId` / `BlankTitle` when those fields are empty after trim.
    /// - `Malformed` when the task still carries decoding defects.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id.as_str().trim().is_empty() {
            return Err(TaskValidationError::BlankId);
        }
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::BlankTitle(self.id.clone()));
        }
        if !self.defects.is_empty() {
            return Err(TaskValidationError::Malformed(self.id.clone()));
        }
        Ok(())
    }

    /// Decodes one store record. Never fails; see [`RecordDefect`].
    pub fn from_record(record: TaskRecord) -> Self {
        let mut defects = Vec::new();

        let id = match record.id.and_then(RecordId::into_task_id) {
            Some(id) => id,
            None => {
                defects.push(RecordDefect::MissingId);
                TaskId::local_placeholder()
            }
        };

        let status = match record.status.as_deref() {
            Some(raw) => TaskStatus::parse(raw).unwrap_or_else(|| {
                defects.push(RecordDefect::UnknownStatus(raw.to_string()));
                TaskStatus::Pending
            }),
            None => TaskStatus::Pending,
        };

        let due_date = match record.due_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match parse_due_date(raw) {
                Some(date) => Some(date),
                None => {
                    defects.push(RecordDefect::UnparsableDueDate(raw.to_string()));
                    None
                }
            },
        };

        let priority = match record.priority.as_deref() {
            Some(raw) => TaskPriority::parse(raw).unwrap_or_else(|| {
                defects.push(RecordDefect::UnknownPriority(raw.to_string()));
                TaskPriority::default()
            }),
            None => TaskPriority::default(),
        };

        Self {
            id,
            title: record.title.unwrap_or_default(),
            status,
            due_date,
            priority,
            relations: TaskRelations {
                opportunity: record.opportunity.and_then(RelationRecord::into_summary),
                contact: record.contact.and_then(RelationRecord::into_summary),
                assignee: record.assignee.and_then(RelationRecord::into_summary),
            },
            defects,
        }
    }
}

/// Errors from task validation on local store writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskValidationError {
    #[error("task id must not be blank")]
    BlankId,
    #[error("task title must not be blank: {0}")]
    BlankTitle(TaskId),
    #[error("task record carries decoding defects: {0}")]
    Malformed(TaskId),
}

/// Identifier as it appears on the wire; the CRM API uses numeric ids.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl RecordId {
    fn into_task_id(self) -> Option<TaskId> {
        match self {
            Self::Number(value) => Some(TaskId::from(value)),
            Self::Text(value) if value.trim().is_empty() => None,
            Self::Text(value) => Some(TaskId::from(value.trim())),
        }
    }
}

/// Relation summary as it appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RelationRecord {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default, alias = "title")]
    pub name: Option<String>,
}

impl RelationRecord {
    fn into_summary(self) -> Option<RelationSummary> {
        let id = self.id.and_then(RecordId::into_task_id).map(|id| id.0);
        if id.is_none() && self.name.is_none() {
            return None;
        }
        Some(RelationSummary {
            id,
            name: self.name.unwrap_or_default(),
        })
    }
}

/// Loosely-typed task record supplied by the Task Store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskRecord {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "dueDate")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub opportunity: Option<RelationRecord>,
    #[serde(default)]
    pub contact: Option<RelationRecord>,
    #[serde(default, alias = "assigned_to")]
    pub assignee: Option<RelationRecord>,
}

/// Parses a JSON array of task records.
///
/// Elements that are not decodable as records at all are skipped and logged;
/// decodable records with bad fields are kept with defects.
///
/// # Errors
/// Returns an error when `json` is not a JSON array.
pub fn parse_task_records(json: &str) -> Result<Vec<Task>, serde_json::Error> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut tasks = Vec::with_capacity(values.len());

    for (position, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<TaskRecord>(value) {
            Ok(record) => {
                let task = Task::from_record(record);
                if !task.defects.is_empty() {
                    warn!(
                        "event=task_decode module=model status=warn position={} task_id={} defects={}",
                        position,
                        task.id,
                        task.defects.len()
                    );
                }
                tasks.push(task);
            }
            Err(err) => {
                warn!(
                    "event=task_decode module=model status=error position={} error={}",
                    position, err
                );
            }
        }
    }

    Ok(tasks)
}

/// Accepts `yyyy-mm-dd` or an RFC 3339 timestamp (date taken in its own offset).
pub fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, ISO_DATE_FORMAT) {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|timestamp| timestamp.date_naive())
}

/// Formats a date as `yyyy-mm-dd`.
pub fn format_due_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}
