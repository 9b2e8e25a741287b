//! Drag-and-drop synchronizer for the task board.
//!
//! # Responsibility
//! - Drive the `Idle -> Dragging -> Idle` lifecycle from UI drag callbacks.
//! - Apply drops to the local board before any store call is made.
//! - Emit exactly one [`PendingPatch`] per cross-bucket move and reconcile
//!   its outcome against the moved task only.
//!
//! # Invariants
//! - Bucket arrays are not mutated while a drag is in progress, except by
//!   patch reconciliation of other tasks.
//! - A cancelled or rejected drop leaves the board exactly as before the drag.
//! - Classification is re-run over the whole list only on `refresh`, which is
//!   refused mid-drag.
//! - A settled patch only ever touches the task it was issued for.

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

use crate::board::{Board, BucketView};
use crate::model::bucket::{classify, BucketKey};
use crate::model::patch::{TaskPatch, UpcomingDatePolicy};
use crate::model::task::{Task, TaskId};
use crate::store::StoreError;

/// What happens to the optimistic move when its patch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchFailurePolicy {
    /// Leave the card where it was dropped; the caller decides on a refetch.
    #[default]
    KeepOptimistic,
    /// Restore the task's prior fields and position.
    Rollback,
}

impl PatchFailurePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeepOptimistic => "keep",
            Self::Rollback => "rollback",
        }
    }
}

impl FromStr for PatchFailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keep" | "keep_optimistic" => Ok(Self::KeepOptimistic),
            "rollback" => Ok(Self::Rollback),
            other => Err(format!(
                "unsupported patch failure policy `{other}`; expected keep|rollback"
            )),
        }
    }
}

/// Tunables for drop handling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    pub upcoming_policy: UpcomingDatePolicy,
    pub failure_policy: PatchFailurePolicy,
}

/// Identifies one issued patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchTicket(u64);

impl PatchTicket {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl Display for PatchTicket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Patch the caller must send to the Task Store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingPatch {
    pub ticket: PatchTicket,
    pub task_id: TaskId,
    pub patch: TaskPatch,
}

/// Active drag: which card was picked up and where from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DragSession {
    pub task_id: TaskId,
    pub source: BucketKey,
    pub source_index: usize,
    /// Bucket under the pointer, for the overlay preview.
    pub hover: Option<BucketKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

/// Drop position reported by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTarget {
    pub bucket: BucketKey,
    /// Final index inside `bucket`; clamped to its length.
    pub index: usize,
}

impl DropTarget {
    pub fn new(bucket: BucketKey, index: usize) -> Self {
        Self { bucket, index }
    }
}

/// Why a drop was refused. The board is left as it was before the drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum DropRejection {
    #[error("tasks cannot be moved into the overdue column")]
    OverdueTarget,
    #[error("task has no store id and cannot be patched")]
    MissingStoreId,
}

/// Result of a completed drag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropOutcome {
    /// Dropped outside any bucket, or cancelled.
    Cancelled,
    Rejected { reason: DropRejection },
    /// Same-bucket reorder; never patched.
    Reordered {
        bucket: BucketKey,
        from: usize,
        to: usize,
    },
    /// Cross-bucket move, already applied locally.
    Moved {
        from: BucketKey,
        to: BucketKey,
        index: usize,
        patch: PendingPatch,
    },
}

impl DropOutcome {
    pub fn pending_patch(&self) -> Option<&PendingPatch> {
        match self {
            Self::Moved { patch, .. } => Some(patch),
            _ => None,
        }
    }
}

/// How a patch response was absorbed.
#[derive(Debug)]
pub enum PatchSettled {
    /// Canonical record applied; `bucket` is where the task now sits.
    Confirmed {
        task_id: TaskId,
        bucket: Option<BucketKey>,
    },
    /// A newer patch for the same task is outstanding or already settled.
    Superseded { task_id: TaskId },
    Failed {
        task_id: TaskId,
        error: StoreError,
        rolled_back: bool,
    },
}

impl PatchSettled {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Misuse of the synchronizer API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("a drag of task {0} is already in progress")]
    AlreadyDragging(TaskId),
    #[error("no drag is in progress")]
    NotDragging,
    #[error("task not on board: {0}")]
    TaskNotFound(TaskId),
    #[error("cannot refresh the board while a drag is in progress")]
    DragInProgress,
    #[error("unknown patch ticket {0}")]
    UnknownTicket(PatchTicket),
    #[error("canonical record {actual} does not match patched task {expected}")]
    RecordMismatch { expected: TaskId, actual: TaskId },
}

#[derive(Debug, Clone)]
struct InFlight {
    task_id: TaskId,
    prior: Task,
    prior_bucket: BucketKey,
    prior_index: usize,
    generation: u64,
}

/// Serializable view of the whole board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardSnapshot {
    pub today: NaiveDate,
    pub buckets: Vec<BucketView>,
    pub dragging: Option<DragSession>,
    pub in_flight: usize,
}

/// Owns the board and the drag/patch lifecycle.
#[derive(Debug)]
pub struct BoardSynchronizer {
    board: Board,
    today: NaiveDate,
    options: SyncOptions,
    drag: DragState,
    in_flight: BTreeMap<PatchTicket, InFlight>,
    latest_ticket: HashMap<TaskId, PatchTicket>,
    next_ticket: u64,
    generation: u64,
}

impl BoardSynchronizer {
    /// Classifies `tasks` against `today` and starts idle.
    pub fn new(tasks: Vec<Task>, today: NaiveDate, options: SyncOptions) -> Self {
        let board = Board::classify_all(tasks, today);
        info!(
            "event=board_load module=board status=ok tasks={} today={}",
            board.len(),
            today
        );
        Self {
            board,
            today,
            options,
            drag: DragState::Idle,
            in_flight: BTreeMap::new(),
            latest_ticket: HashMap::new(),
            next_ticket: 1,
            generation: 0,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn options(&self) -> SyncOptions {
        self.options
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging(_))
    }

    /// Number of patches issued but not yet settled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            today: self.today,
            buckets: self.board.views(),
            dragging: match &self.drag {
                DragState::Dragging(session) => Some(session.clone()),
                DragState::Idle => None,
            },
            in_flight: self.in_flight.len(),
        }
    }

    /// Replaces the board with an authoritative task list.
    ///
    /// Outstanding patches stay registered; their responses still update the
    /// matching task but never roll back across a refresh.
    ///
    /// # Errors
    /// - `DragInProgress` when called mid-drag.
    pub fn refresh(&mut self, tasks: Vec<Task>, today: NaiveDate) -> Result<(), BoardError> {
        if self.is_dragging() {
            warn!("event=board_refresh module=board status=error reason=drag_in_progress");
            return Err(BoardError::DragInProgress);
        }
        self.board = Board::classify_all(tasks, today);
        self.today = today;
        self.generation += 1;
        info!(
            "event=board_refresh module=board status=ok tasks={} today={} in_flight={}",
            self.board.len(),
            today,
            self.in_flight.len()
        );
        Ok(())
    }

    /// Records the picked-up card.
    ///
    /// # Errors
    /// - `AlreadyDragging` when another drag is active.
    /// - `TaskNotFound` when `task_id` is not on the board.
    pub fn on_drag_start(&mut self, task_id: &TaskId) -> Result<DragSession, BoardError> {
        if let DragState::Dragging(session) = &self.drag {
            return Err(BoardError::AlreadyDragging(session.task_id.clone()));
        }
        let (source, source_index) = self
            .board
            .locate(task_id)
            .ok_or_else(|| BoardError::TaskNotFound(task_id.clone()))?;

        let session = DragSession {
            task_id: task_id.clone(),
            source,
            source_index,
            hover: Some(source),
        };
        debug!(
            "event=drag_start module=board task_id={} source={} index={}",
            task_id, source, source_index
        );
        self.drag = DragState::Dragging(session.clone());
        Ok(session)
    }

    /// Tracks the bucket under the pointer. Never mutates buckets.
    pub fn on_drag_over(&mut self, hover: Option<BucketKey>) -> Result<(), BoardError> {
        match &mut self.drag {
            DragState::Dragging(session) => {
                session.hover = hover;
                Ok(())
            }
            DragState::Idle => Err(BoardError::NotDragging),
        }
    }

    /// Abandons the active drag without touching the board.
    pub fn on_drag_cancel(&mut self) -> Result<DropOutcome, BoardError> {
        self.on_drag_end(None)
    }

    /// Completes the active drag.
    ///
    /// `None` means the card was released outside every bucket.
    ///
    /// # Errors
    /// - `NotDragging` when no drag is active.
    /// - `TaskNotFound` when the dragged card is no longer on the board.
    pub fn on_drag_end(&mut self, target: Option<DropTarget>) -> Result<DropOutcome, BoardError> {
        let session = match std::mem::take(&mut self.drag) {
            DragState::Dragging(session) => session,
            DragState::Idle => return Err(BoardError::NotDragging),
        };

        let Some(target) = target else {
            debug!(
                "event=drag_end module=board status=cancelled task_id={}",
                session.task_id
            );
            return Ok(DropOutcome::Cancelled);
        };

        // Patch reconciliation may have shifted the card since pickup.
        let Some((current, current_index)) = self.board.locate(&session.task_id) else {
            return Err(BoardError::TaskNotFound(session.task_id));
        };

        if target.bucket == current {
            return Ok(self.reorder(current, current_index, target.index));
        }

        self.cross_move(&session.task_id, current, current_index, target)
    }

    fn reorder(&mut self, bucket: BucketKey, from: usize, to: usize) -> DropOutcome {
        let to = match self.board.take(bucket, from) {
            Some(task) => self.board.insert(bucket, to, task),
            None => from,
        };
        debug!(
            "event=drag_end module=board status=ok kind=reorder bucket={} from={} to={}",
            bucket, from, to
        );
        DropOutcome::Reordered { bucket, from, to }
    }

    fn cross_move(
        &mut self,
        task_id: &TaskId,
        from: BucketKey,
        from_index: usize,
        target: DropTarget,
    ) -> Result<DropOutcome, BoardError> {
        let task = self
            .board
            .task(task_id)
            .ok_or_else(|| BoardError::TaskNotFound(task_id.clone()))?;
        if !task.has_store_id() {
            return Ok(self.reject(task_id, DropRejection::MissingStoreId));
        }
        let Some(patch) =
            TaskPatch::for_drop(target.bucket, task, self.today, self.options.upcoming_policy)
        else {
            return Ok(self.reject(task_id, DropRejection::OverdueTarget));
        };

        let mut task = self
            .board
            .take(from, from_index)
            .ok_or_else(|| BoardError::TaskNotFound(task_id.clone()))?;
        let prior = task.clone();
        task.apply_patch(&patch);
        let index = self.board.insert(target.bucket, target.index, task);

        let ticket = PatchTicket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight.insert(
            ticket,
            InFlight {
                task_id: task_id.clone(),
                prior,
                prior_bucket: from,
                prior_index: from_index,
                generation: self.generation,
            },
        );
        self.latest_ticket.insert(task_id.clone(), ticket);

        info!(
            "event=drag_end module=board status=ok kind=move task_id={} from={} to={} index={} ticket={}",
            task_id, from, target.bucket, index, ticket
        );
        Ok(DropOutcome::Moved {
            from,
            to: target.bucket,
            index,
            patch: PendingPatch {
                ticket,
                task_id: task_id.clone(),
                patch,
            },
        })
    }

    fn reject(&self, task_id: &TaskId, reason: DropRejection) -> DropOutcome {
        info!(
            "event=drag_end module=board status=rejected task_id={} reason={:?}",
            task_id, reason
        );
        DropOutcome::Rejected { reason }
    }

    /// Absorbs the store's answer to a patch issued by [`Self::on_drag_end`].
    ///
    /// Success replaces the task with the canonical record, moving it only if
    /// the record classifies elsewhere. Failure is reported back and handled
    /// per [`PatchFailurePolicy`]; it is never retried here.
    ///
    /// # Errors
    /// - `UnknownTicket` when the ticket was never issued or already settled.
    /// - `RecordMismatch` when the canonical record has a different id.
    pub fn complete_patch(
        &mut self,
        ticket: PatchTicket,
        result: Result<Task, StoreError>,
    ) -> Result<PatchSettled, BoardError> {
        let expected = self
            .in_flight
            .get(&ticket)
            .map(|entry| entry.task_id.clone())
            .ok_or(BoardError::UnknownTicket(ticket))?;
        if let Ok(canonical) = &result {
            if canonical.id != expected {
                return Err(BoardError::RecordMismatch {
                    expected,
                    actual: canonical.id.clone(),
                });
            }
        }

        let entry = self
            .in_flight
            .remove(&ticket)
            .ok_or(BoardError::UnknownTicket(ticket))?;
        let task_id = entry.task_id.clone();

        if self.latest_ticket.get(&task_id) != Some(&ticket) {
            debug!(
                "event=patch_settle module=board status=superseded task_id={} ticket={}",
                task_id, ticket
            );
            return Ok(PatchSettled::Superseded { task_id });
        }
        self.latest_ticket.remove(&task_id);

        match result {
            Ok(canonical) => {
                let bucket = self.reconcile(canonical);
                info!(
                    "event=patch_settle module=board status=ok task_id={} ticket={}",
                    task_id, ticket
                );
                Ok(PatchSettled::Confirmed { task_id, bucket })
            }
            Err(error) => {
                let rolled_back = self.options.failure_policy == PatchFailurePolicy::Rollback
                    && entry.generation == self.generation
                    && self.roll_back(entry);
                warn!(
                    "event=patch_settle module=board status=error task_id={} ticket={} rolled_back={} error={}",
                    task_id, ticket, rolled_back, error
                );
                Ok(PatchSettled::Failed {
                    task_id,
                    error,
                    rolled_back,
                })
            }
        }
    }

    fn reconcile(&mut self, canonical: Task) -> Option<BucketKey> {
        let (bucket, index) = self.board.locate(&canonical.id)?;
        let target = classify(&canonical, self.today);
        if target == bucket {
            if let Some(task) = self.board.task_mut(&canonical.id) {
                *task = canonical;
            }
            return Some(bucket);
        }

        self.board.take(bucket, index)?;
        self.board.push(target, canonical);
        Some(target)
    }

    fn roll_back(&mut self, entry: InFlight) -> bool {
        let Some((bucket, index)) = self.board.locate(&entry.task_id) else {
            return false;
        };
        if self.board.take(bucket, index).is_none() {
            return false;
        }
        self.board
            .insert(entry.prior_bucket, entry.prior_index, entry.prior);
        true
    }
}
