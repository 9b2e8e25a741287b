//! Task board domain model.
//!
//! # Responsibility
//! - Define the task record, bucket keys and patch shapes used by the board.
//! - Keep classification pure and independent of any clock or UI toolkit.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - Buckets are derived from `status` and `due_date`, never stored.

pub mod bucket;
pub mod patch;
pub mod task;
