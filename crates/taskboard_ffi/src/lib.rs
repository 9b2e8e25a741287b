//! Flutter-facing bindings for the task board.
//!
//! All exported calls live in [`api`] and return plain envelopes so the
//! Dart side never sees a Rust panic.

pub mod api;
