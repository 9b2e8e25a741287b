//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the board drag lifecycle to Dart via FRB.
//! - Exchange task records and patch bodies as JSON so the Dart side can
//!   keep talking to the CRM REST API directly.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - One board per process; the lock is never held across a network call
//!   (the Dart side sends the patch between `board_drag_end` and
//!   `board_patch_succeeded` / `board_patch_failed`).

use chrono::NaiveDate;
use std::sync::{Mutex, MutexGuard};
use taskboard_core::{
    core_version as core_version_inner, init_logging as init_logging_inner,
    parse_task_records, ping as ping_inner, BoardConfig, BoardSynchronizer, BucketKey,
    DropOutcome, DropTarget, PatchSettled, PatchTicket, StoreError, Task,
};

static BOARD: Mutex<Option<BoardSynchronizer>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Generic response envelope for board calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardResponse {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Human-readable message for diagnostics/UI.
    pub message: String,
    /// Full board snapshot as JSON; empty when no board is loaded.
    pub board_json: String,
}

/// Patch the Dart side must send, e.g. `PUT /tasks/{task_id}` with `body_json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRequest {
    pub ticket: u64,
    pub task_id: String,
    pub body_json: String,
}

/// Response envelope for `board_drag_end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropResponse {
    pub ok: bool,
    /// `cancelled|rejected|reordered|moved`, or empty on error.
    pub outcome: String,
    pub message: String,
    /// Present only when a cross-bucket move must be persisted.
    pub patch: Option<PatchRequest>,
    pub board_json: String,
}

/// Response envelope for patch settlement calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettleResponse {
    pub ok: bool,
    /// `confirmed|superseded|failed`, or empty on error.
    pub state: String,
    /// True when the optimistic move was undone.
    pub rolled_back: bool,
    pub message: String,
    pub board_json: String,
}

/// Loads (or reloads) the board from the CRM's task list JSON.
///
/// `today` is `yyyy-mm-dd` in the user's calendar.
///
/// # FFI contract
/// - Replaces any previous board unless a drag is in progress.
/// - Policies come from `TASKBOARD_*` environment configuration.
#[flutter_rust_bridge::frb(sync)]
pub fn board_load(records_json: String, today: String) -> BoardResponse {
    let today = match parse_today(&today) {
        Ok(today) => today,
        Err(message) => return board_failure(message),
    };
    let tasks = match parse_task_records(&records_json) {
        Ok(tasks) => tasks,
        Err(err) => return board_failure(format!("board_load failed: {err}")),
    };

    let mut guard = lock_board();
    match guard.as_mut() {
        Some(sync) => {
            if let Err(err) = sync.refresh(tasks, today) {
                return board_failure(format!("board_load failed: {err}"));
            }
        }
        None => {
            let config = match BoardConfig::from_env() {
                Ok(config) => config,
                Err(err) => return board_failure(format!("board_load failed: {err}")),
            };
            *guard = Some(BoardSynchronizer::new(tasks, today, config.sync));
        }
    }
    board_success("Board loaded.", &guard)
}

/// Returns the current board snapshot.
#[flutter_rust_bridge::frb(sync)]
pub fn board_snapshot() -> BoardResponse {
    let guard = lock_board();
    if guard.is_none() {
        return board_failure("board not loaded".to_string());
    }
    board_success("", &guard)
}

/// Records that the user picked up `task_id`.
#[flutter_rust_bridge::frb(sync)]
pub fn board_drag_start(task_id: String) -> BoardResponse {
    let mut guard = lock_board();
    let Some(sync) = guard.as_mut() else {
        return board_failure("board not loaded".to_string());
    };
    match sync.on_drag_start(&task_id.as_str().into()) {
        Ok(_) => board_success("Drag started.", &guard),
        Err(err) => board_failure(format!("board_drag_start failed: {err}")),
    }
}

/// Records the bucket under the pointer (`None` when outside the board).
#[flutter_rust_bridge::frb(sync)]
pub fn board_drag_over(bucket: Option<String>) -> BoardResponse {
    let hover = match bucket.as_deref().map(parse_bucket).transpose() {
        Ok(hover) => hover,
        Err(message) => return board_failure(message),
    };
    let mut guard = lock_board();
    let Some(sync) = guard.as_mut() else {
        return board_failure("board not loaded".to_string());
    };
    match sync.on_drag_over(hover) {
        Ok(()) => board_success("", &guard),
        Err(err) => board_failure(format!("board_drag_over failed: {err}")),
    }
}

/// Completes the active drag.
///
/// `bucket = None` means the card was released outside every column.
///
/// # FFI contract
/// - The local board is already updated when this returns.
/// - When `patch` is present the caller sends it and then reports the result
///   through `board_patch_succeeded` or `board_patch_failed`.
#[flutter_rust_bridge::frb(sync)]
pub fn board_drag_end(bucket: Option<String>, index: u32) -> DropResponse {
    let target = match bucket.as_deref().map(parse_bucket).transpose() {
        Ok(target) => target.map(|bucket| DropTarget::new(bucket, index as usize)),
        Err(message) => return drop_failure(message),
    };
    let mut guard = lock_board();
    let Some(sync) = guard.as_mut() else {
        return drop_failure("board not loaded".to_string());
    };
    let outcome = match sync.on_drag_end(target) {
        Ok(outcome) => outcome,
        Err(err) => return drop_failure(format!("board_drag_end failed: {err}")),
    };

    let patch = match outcome.pending_patch() {
        Some(pending) => match pending.patch.to_json() {
            Ok(body_json) => Some(PatchRequest {
                ticket: pending.ticket.value(),
                task_id: pending.task_id.to_string(),
                body_json,
            }),
            Err(err) => return drop_failure(format!("board_drag_end failed: {err}")),
        },
        None => None,
    };
    let (outcome, message) = describe_outcome(&outcome);

    DropResponse {
        ok: true,
        outcome: outcome.to_string(),
        message,
        patch,
        board_json: snapshot_json(&guard),
    }
}

/// Cancels the active drag (e.g. escape key).
#[flutter_rust_bridge::frb(sync)]
pub fn board_drag_cancel() -> DropResponse {
    board_drag_end(None, 0)
}

/// Reports the canonical record returned by the store for `ticket`.
#[flutter_rust_bridge::frb(sync)]
pub fn board_patch_succeeded(ticket: u64, record_json: String) -> SettleResponse {
    let record = match parse_single_record(&record_json) {
        Ok(record) => record,
        Err(message) => return settle_failure(message),
    };
    settle(ticket, Ok(record))
}

/// Reports that the store rejected or never answered the patch for `ticket`.
///
/// `status_code = 0` means a transport failure (no HTTP response).
#[flutter_rust_bridge::frb(sync)]
pub fn board_patch_failed(ticket: u64, status_code: u16, message: String) -> SettleResponse {
    let error = if status_code == 0 {
        StoreError::Transport(message)
    } else {
        StoreError::Rejected(format!("{status_code} {message}"))
    };
    settle(ticket, Err(error))
}

fn settle(ticket: u64, result: Result<Task, StoreError>) -> SettleResponse {
    let mut guard = lock_board();
    let Some(sync) = guard.as_mut() else {
        return settle_failure("board not loaded".to_string());
    };
    let settled = match sync.complete_patch(PatchTicket::new(ticket), result) {
        Ok(settled) => settled,
        Err(err) => {
            log::warn!("event=patch_settle module=ffi status=error ticket={ticket} error={err}");
            return settle_failure(format!("board_patch settle failed: {err}"));
        }
    };

    let (state, rolled_back, message) = match settled {
        PatchSettled::Confirmed { .. } => ("confirmed", false, "Task saved.".to_string()),
        PatchSettled::Superseded { .. } => ("superseded", false, String::new()),
        PatchSettled::Failed {
            error, rolled_back, ..
        } => ("failed", rolled_back, format!("Task update failed: {error}")),
    };
    SettleResponse {
        ok: true,
        state: state.to_string(),
        rolled_back,
        message,
        board_json: snapshot_json(&guard),
    }
}

fn describe_outcome(outcome: &DropOutcome) -> (&'static str, String) {
    match outcome {
        DropOutcome::Cancelled => ("cancelled", String::new()),
        DropOutcome::Rejected { reason } => ("rejected", reason.to_string()),
        DropOutcome::Reordered { .. } => ("reordered", String::new()),
        DropOutcome::Moved { to, .. } => ("moved", format!("Moved to {}.", to.label())),
    }
}

fn parse_single_record(record_json: &str) -> Result<Task, String> {
    let wrapped = format!("[{record_json}]");
    let mut tasks = parse_task_records(&wrapped)
        .map_err(|err| format!("invalid task record: {err}"))?;
    match tasks.pop() {
        Some(task) if tasks.is_empty() => Ok(task),
        _ => Err("invalid task record: expected exactly one object".to_string()),
    }
}

fn parse_today(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("invalid today `{raw}`: {err}"))
}

fn parse_bucket(raw: &str) -> Result<BucketKey, String> {
    BucketKey::parse(raw).ok_or_else(|| format!("unknown bucket `{raw}`"))
}

fn lock_board() -> MutexGuard<'static, Option<BoardSynchronizer>> {
    // Board mutations finish before any call returns, so a poisoned lock still holds a whole board.
    BOARD
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn snapshot_json(guard: &MutexGuard<'_, Option<BoardSynchronizer>>) -> String {
    guard
        .as_ref()
        .and_then(|sync| match serde_json::to_string(&sync.snapshot()) {
            Ok(json) => Some(json),
            Err(err) => {
                log::warn!("event=board_snapshot module=ffi status=error error={err}");
                None
            }
        })
        .unwrap_or_default()
}

fn board_success(
    message: &str,
    guard: &MutexGuard<'_, Option<BoardSynchronizer>>,
) -> BoardResponse {
    BoardResponse {
        ok: true,
        message: message.to_string(),
        board_json: snapshot_json(guard),
    }
}

fn board_failure(message: String) -> BoardResponse {
    BoardResponse {
        ok: false,
        message,
        board_json: String::new(),
    }
}

fn drop_failure(message: String) -> DropResponse {
    DropResponse {
        ok: false,
        outcome: String::new(),
        message,
        patch: None,
        board_json: String::new(),
    }
}

fn settle_failure(message: String) -> SettleResponse {
    SettleResponse {
        ok: false,
        state: String::new(),
        rolled_back: false,
        message,
        board_json: String::new(),
    }
}
