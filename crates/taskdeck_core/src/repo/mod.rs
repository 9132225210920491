//! Repository layer over remote REST APIs.
//!
//! # Responsibility
//! - Define use-case oriented contracts for remote data access.
//! - Isolate URL layout and payload shapes from the store.
//!
//! # Invariants
//! - Repositories are stateless; every call is one remote attempt.
//! - Failures surface verbatim to the caller as `RepoError`.

pub mod movie_repo;
pub mod task_repo;

use crate::api::ApiError;
use crate::model::task::TaskValidationError;
use thiserror::Error;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for remote task and movie operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Validation(#[from] TaskValidationError),
    #[error("invalid remote data: {0}")]
    InvalidData(String),
}
