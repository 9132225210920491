//! HTTP plumbing shared by every remote repository.
//!
//! # Responsibility
//! - Own the authenticated JSON client and its error taxonomy.
//! - Hold the signed-in session and refresh expired access tokens.
//!
//! # Invariants
//! - Repositories never build raw requests; they go through `ApiClient`.

pub mod client;
pub mod error;
pub mod session;

pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
pub use session::{Session, SessionHandle};
