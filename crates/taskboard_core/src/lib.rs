//! Core domain logic for the CRM task board.
//! This crate is the single source of truth for board invariants.

pub mod board;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use board::sync::{
    BoardError, BoardSnapshot, BoardSynchronizer, DragSession, DragState, DropOutcome,
    DropRejection, DropTarget, PatchFailurePolicy, PatchSettled, PatchTicket, PendingPatch,
    SyncOptions,
};
pub use board::{Board, BucketView};
pub use config::{BoardConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::bucket::{classify, BucketKey};
pub use model::patch::{TaskPatch, UpcomingDatePolicy};
pub use model::task::{
    parse_task_records, RecordDefect, RelationSummary, Task, TaskId, TaskPriority, TaskRecord,
    TaskRelations, TaskStatus, TaskValidationError,
};
pub use service::board_service::{BoardService, BoardServiceError, MoveReport};
pub use store::{SqliteTaskStore, StoreError, StoreResult, TaskStore};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
