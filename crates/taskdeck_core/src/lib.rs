//! Core client logic for taskdeck.
//! This crate owns the task cache, its remote synchronization and the
//! movie catalog lookups; front ends only render state and invoke operations.

pub mod api;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;

pub use api::{ApiClient, ApiError, ApiResult, Session, SessionHandle};
pub use config::{AppConfig, ConfigError};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::movie::{Movie, MovieCollection};
pub use model::task::{Task, TaskId, TaskValidationError};
pub use repo::movie_repo::{HttpMovieCatalog, MovieCatalog};
pub use repo::task_repo::{HttpTaskRepository, TaskRepository};
pub use repo::{RepoError, RepoResult};
pub use store::persist::{
    PersistError, SqliteStatePersistence, StatePersistence, TASK_STORAGE_KEY,
};
pub use store::state::StoreState;
pub use store::task_store::TaskStore;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
