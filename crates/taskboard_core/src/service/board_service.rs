//! Board use-case service for synchronous hosts.
//!
//! # Responsibility
//! - Load the board from a Task Store and drive drops end to end.
//! - Send each pending patch to the store right after the local move and
//!   feed the answer back into the synchronizer.
//!
//! # Invariants
//! - The local move is applied before the store is called.
//! - Store failures are reported, never retried.

use chrono::NaiveDate;
use thiserror::Error;

use crate::board::sync::{
    BoardError, BoardSynchronizer, DropOutcome, DropTarget, PatchSettled, SyncOptions,
};
use crate::model::task::{Task, TaskId};
use crate::store::{StoreError, TaskStore};

/// Errors from board service operations.
#[derive(Debug, Error)]
pub enum BoardServiceError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of one drag-and-drop performed through the service.
#[derive(Debug)]
pub struct MoveReport {
    pub outcome: DropOutcome,
    /// Present only for cross-bucket moves.
    pub settled: Option<PatchSettled>,
}

/// Board facade bound to one store.
pub struct BoardService<S: TaskStore> {
    store: S,
    sync: BoardSynchronizer,
}

impl<S: TaskStore> BoardService<S> {
    /// Lists tasks from `store` and classifies them against `today`.
    pub fn load(store: S, today: NaiveDate, options: SyncOptions) -> Result<Self, StoreError> {
        let tasks = store.list_tasks()?;
        Ok(Self {
            store,
            sync: BoardSynchronizer::new(tasks, today, options),
        })
    }

    pub fn synchronizer(&self) -> &BoardSynchronizer {
        &self.sync
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Re-reads the store and reclassifies every task.
    pub fn refresh(&mut self, today: NaiveDate) -> Result<(), BoardServiceError> {
        let tasks = self.store.list_tasks()?;
        self.sync.refresh(tasks, today)?;
        Ok(())
    }

    /// Adds a task to the store and reloads the board.
    pub fn add_task(&mut self, task: &Task) -> Result<TaskId, BoardServiceError> {
        let id = self.store.create_task(task)?;
        self.refresh(self.sync.today())?;
        Ok(id)
    }

    /// Performs a full pick-up and drop of `task_id`.
    ///
    /// `target = None` behaves as a release outside the board.
    pub fn move_task(
        &mut self,
        task_id: &TaskId,
        target: Option<DropTarget>,
    ) -> Result<MoveReport, BoardServiceError> {
        self.sync.on_drag_start(task_id)?;
        let outcome = self.sync.on_drag_end(target)?;

        let settled = match outcome.pending_patch() {
            Some(pending) => {
                let result = self.store.patch_task(&pending.task_id, &pending.patch);
                Some(self.sync.complete_patch(pending.ticket, result)?)
            }
            None => None,
        };

        Ok(MoveReport { outcome, settled })
    }
}
