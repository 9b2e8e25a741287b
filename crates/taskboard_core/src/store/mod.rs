//! Task Store contracts and the local SQLite implementation.
//!
//! # Responsibility
//! - Define the collaborator seam the board reconciles against.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `patch_task` returns the canonical record after the update.
//! - Store APIs return semantic errors (`NotFound`, `Rejected`) in addition
//!   to transport and database errors.

use thiserror::Error;

use crate::db::DbError;
use crate::model::patch::TaskPatch;
use crate::model::task::{Task, TaskId, TaskValidationError};

pub mod sqlite;

pub use sqlite::SqliteTaskStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by a Task Store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error(transparent)]
    Validation(#[from] TaskValidationError),
    /// The store refused the update (e.g. HTTP 4xx from the CRM API).
    #[error("patch rejected: {0}")]
    Rejected(String),
    /// The request never produced an answer (e.g. network failure).
    #[error("transport failure: {0}")]
    Transport(String),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("invalid persisted task data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// System of record for tasks.
pub trait TaskStore {
    /// Lists tasks in board input order.
    fn list_tasks(&self) -> StoreResult<Vec<Task>>;
    fn get_task(&self, id: &TaskId) -> StoreResult<Option<Task>>;
    fn create_task(&self, task: &Task) -> StoreResult<TaskId>;
    /// Applies a partial update and returns the canonical record.
    fn patch_task(&self, id: &TaskId, patch: &TaskPatch) -> StoreResult<Task>;
}

impl<S: TaskStore + ?Sized> TaskStore for &S {
    fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        (**self).list_tasks()
    }

    fn get_task(&self, id: &TaskId) -> StoreResult<Option<Task>> {
        (**self).get_task(id)
    }

    fn create_task(&self, task: &Task) -> StoreResult<TaskId> {
        (**self).create_task(task)
    }

    fn patch_task(&self, id: &TaskId, patch: &TaskPatch) -> StoreResult<Task> {
        (**self).patch_task(id, patch)
    }
}
