//! Client-side state stores.
//!
//! # Responsibility
//! - Cache remote task state for rendering layers.
//! - Persist store snapshots across process restarts.
//!
//! # Invariants
//! - Callers observe failures only through the `error` field.

pub mod persist;
pub mod state;
pub mod task_store;
