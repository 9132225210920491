//! Domain records shared by repositories, the store and callers.
//!
//! # Responsibility
//! - Define the task record mirrored from the remote task API.
//! - Define movie metadata records read from the movie API.
//!
//! # Invariants
//! - Identifiers are always assigned remotely.

pub mod movie;
pub mod task;
