//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls and board synchronization into use-case APIs.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod board_service;
