//! Task repository contract and REST implementation.
//!
//! # Responsibility
//! - Provide the four task operations used by the store.
//! - Keep the `/todos` resource layout inside this module.
//!
//! # Invariants
//! - Each operation makes exactly one remote attempt.
//! - `create` rejects blank titles before any remote call.
//!
//! # See also
//! - `store::task_store` for how results are reconciled into local state.

use crate::api::ApiClient;
use crate::model::task::{CompletionPatch, NewTask, Task, TaskId};
use crate::repo::{RepoError, RepoResult};
use async_trait::async_trait;
use serde_json::Value;

const TODOS_COLLECTION: &str = "todos";

/// Remote access to one task collection.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Fetches the whole collection in server order.
    async fn list(&self) -> RepoResult<Vec<Task>>;
    /// Creates an incomplete task and returns it with its server id.
    async fn create(&self, title: &str) -> RepoResult<Task>;
    /// Sets the completion flag; the server representation is opaque.
    async fn set_completion(&self, id: &TaskId, completed: bool) -> RepoResult<Value>;
    async fn remove(&self, id: &TaskId) -> RepoResult<()>;
}

/// `TaskRepository` over the `/todos` REST resource.
#[derive(Debug, Clone)]
pub struct HttpTaskRepository {
    client: ApiClient,
}

impl HttpTaskRepository {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[async_trait]
impl TaskRepository for HttpTaskRepository {
    async fn list(&self) -> RepoResult<Vec<Task>> {
        Ok(self.client.get_json(&[TODOS_COLLECTION], &[]).await?)
    }

    async fn create(&self, title: &str) -> RepoResult<Task> {
        let request = NewTask::from_input(title)?;
        let created: Task = self.client.post_json(&[TODOS_COLLECTION], &request).await?;
        if created.title.trim().is_empty() {
            return Err(RepoError::InvalidData(format!(
                "created task `{}` has an empty title",
                created.id
            )));
        }
        Ok(created)
    }

    async fn set_completion(&self, id: &TaskId, completed: bool) -> RepoResult<Value> {
        Ok(self
            .client
            .put_json(&[TODOS_COLLECTION, id.as_str()], &CompletionPatch { completed })
            .await?)
    }

    async fn remove(&self, id: &TaskId) -> RepoResult<()> {
        Ok(self.client.delete(&[TODOS_COLLECTION, id.as_str()]).await?)
    }
}
