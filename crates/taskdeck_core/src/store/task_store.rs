//! Task store: cached task list reconciled with the remote repository.
//!
//! # Responsibility
//! - Hold the task list plus `loading`/`error` flags for one app context.
//! - Apply repository results to the list and notify subscribers.
//! - Persist every task-changing result to durable storage.
//!
//! # Invariants
//! - Mutations run one at a time, in invocation order; each one diffs
//!   against the snapshot left by the previous one.
//! - `loading` is true exactly while a remote call is outstanding.
//! - Failures never escape: they become one fixed `error` message and leave
//!   `tasks` untouched.
//! - Task ids stay unique within `tasks`.

use crate::model::task::{dedupe_by_id, normalize_title, Task, TaskId};
use crate::repo::task_repo::TaskRepository;
use crate::repo::RepoError;
use crate::store::persist::StatePersistence;
use crate::store::state::StoreState;
use futures::future::join_all;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

pub const FETCH_FAILED: &str = "fetching tasks failed";
pub const CREATE_FAILED: &str = "creating task failed";
pub const UPDATE_FAILED: &str = "updating task failed";
pub const DELETE_FAILED: &str = "deleting task failed";
pub const DELETE_MANY_FAILED: &str = "deleting selected tasks failed";

/// Client-side cache of the remote task collection.
pub struct TaskStore<R> {
    repo: R,
    state: watch::Sender<StoreState>,
    // FIFO: tokio's mutex grants the lock in request order.
    writer: Mutex<()>,
    persistence: Option<Arc<dyn StatePersistence>>,
}

impl<R: TaskRepository> TaskStore<R> {
    /// Creates an empty, non-persistent store.
    pub fn new(repo: R) -> Self {
        Self::from_state(repo, StoreState::default(), None)
    }

    /// Creates a store rehydrated from `persistence`.
    ///
    /// `loading` and `error` always start cleared. An unreadable snapshot is
    /// logged and replaced by an empty state.
    pub fn with_persistence(repo: R, persistence: Arc<dyn StatePersistence>) -> Self {
        let initial = match persistence.load() {
            Ok(Some(state)) => {
                let mut state = state.into_rehydrated();
                let dropped = dedupe_by_id(&mut state.tasks);
                if !dropped.is_empty() {
                    warn!(
                        "event=state_rehydrate module=store status=warn duplicate_ids={}",
                        dropped.len()
                    );
                }
                info!(
                    "event=state_rehydrate module=store status=ok tasks={}",
                    state.tasks.len()
                );
                state
            }
            Ok(None) => StoreState::default(),
            Err(err) => {
                warn!(
                    "event=state_rehydrate module=store status=error error_code=snapshot_unreadable error={}",
                    err
                );
                StoreState::default()
            }
        };
        Self::from_state(repo, initial, Some(persistence))
    }

    fn from_state(
        repo: R,
        initial: StoreState,
        persistence: Option<Arc<dyn StatePersistence>>,
    ) -> Self {
        Self {
            repo,
            state: watch::Sender::new(initial),
            writer: Mutex::new(()),
            persistence,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    ///
    /// Dropping the receiver at any time is safe; the store keeps working.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.borrow().tasks.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
    }

    /// Replaces `tasks` with the server collection.
    pub async fn fetch_all(&self) {
        let _writer = self.writer.lock().await;
        let _in_flight = InFlight::begin(&self.state);
        debug!("event=task_fetch module=store status=start");

        match self.repo.list().await {
            Ok(mut tasks) => {
                let dropped = dedupe_by_id(&mut tasks);
                if !dropped.is_empty() {
                    warn!(
                        "event=task_fetch module=store status=warn duplicate_ids={}",
                        dropped.len()
                    );
                }
                info!(
                    "event=task_fetch module=store status=ok tasks={}",
                    tasks.len()
                );
                self.succeed(|current| *current = tasks);
            }
            Err(err) => self.fail("task_fetch", FETCH_FAILED, &err),
        }
    }

    /// Creates a task remotely and prepends it.
    ///
    /// Blank titles are ignored without contacting the server.
    pub async fn add(&self, title: &str) {
        let Ok(title) = normalize_title(title) else {
            debug!("event=task_create module=store status=skipped reason=blank_title");
            return;
        };

        let _writer = self.writer.lock().await;
        let _in_flight = InFlight::begin(&self.state);
        debug!("event=task_create module=store status=start");

        match self.repo.create(&title).await {
            Ok(created) => {
                info!(
                    "event=task_create module=store status=ok id={}",
                    created.id
                );
                self.succeed(|tasks| {
                    tasks.retain(|task| task.id != created.id);
                    tasks.insert(0, created);
                });
            }
            Err(err) => self.fail("task_create", CREATE_FAILED, &err),
        }
    }

    /// Flips the completion flag of `id`.
    ///
    /// Unknown ids are a silent no-op. The local entry is flipped once the
    /// remote update succeeds; the server payload is not consulted.
    pub async fn toggle(&self, id: &TaskId) {
        let _writer = self.writer.lock().await;
        let Some(completed) = self.state.borrow().find(id).map(|task| task.completed) else {
            debug!("event=task_toggle module=store status=skipped reason=unknown_id id={id}");
            return;
        };

        let _in_flight = InFlight::begin(&self.state);
        debug!("event=task_toggle module=store status=start id={id}");

        match self.repo.set_completion(id, !completed).await {
            Ok(_) => {
                info!(
                    "event=task_toggle module=store status=ok id={} completed={}",
                    id, !completed
                );
                self.succeed(|tasks| {
                    if let Some(task) = tasks.iter_mut().find(|task| &task.id == id) {
                        task.completed = !task.completed;
                    }
                });
            }
            Err(err) => self.fail("task_toggle", UPDATE_FAILED, &err),
        }
    }

    pub async fn remove(&self, id: &TaskId) {
        let _writer = self.writer.lock().await;
        let _in_flight = InFlight::begin(&self.state);
        debug!("event=task_delete module=store status=start id={id}");

        match self.repo.remove(id).await {
            Ok(()) => {
                info!("event=task_delete module=store status=ok id={id}");
                self.succeed(|tasks| tasks.retain(|task| &task.id != id));
            }
            Err(err) => self.fail("task_delete", DELETE_FAILED, &err),
        }
    }

    /// Deletes every id concurrently; all-or-nothing locally.
    ///
    /// If any delete fails, no id is removed from `tasks`, even those the
    /// server already deleted. The failed ids are logged.
    pub async fn remove_many(&self, ids: &[TaskId]) {
        let _writer = self.writer.lock().await;
        let _in_flight = InFlight::begin(&self.state);
        debug!(
            "event=task_delete_many module=store status=start ids={}",
            ids.len()
        );

        let outcomes = join_all(ids.iter().map(|id| async move {
            let outcome = self.repo.remove(id).await;
            (id, outcome)
        }))
        .await;

        let failures: Vec<(&TaskId, RepoError)> = outcomes
            .into_iter()
            .filter_map(|(id, outcome)| outcome.err().map(|err| (id, err)))
            .collect();

        match failures.first() {
            None => {
                info!(
                    "event=task_delete_many module=store status=ok ids={}",
                    ids.len()
                );
                self.succeed(|tasks| tasks.retain(|task| !ids.contains(&task.id)));
            }
            Some((_, first_err)) => {
                let failed_ids = failures
                    .iter()
                    .map(|(id, _)| id.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                warn!(
                    "event=task_delete_many module=store status=error failed={} succeeded={} failed_ids={}",
                    failures.len(),
                    ids.len() - failures.len(),
                    failed_ids
                );
                self.fail("task_delete_many", DELETE_MANY_FAILED, first_err);
            }
        }
    }

    fn succeed(&self, apply: impl FnOnce(&mut Vec<Task>)) {
        self.state.send_modify(|state| {
            apply(&mut state.tasks);
            state.loading = false;
            state.error = None;
        });
        self.persist();
    }

    fn fail(&self, event: &str, message: &'static str, err: &RepoError) {
        error!("event={event} module=store status=error error={err}");
        self.state.send_modify(|state| {
            state.loading = false;
            state.error = Some(message.to_string());
        });
    }

    fn persist(&self) {
        let Some(persistence) = self.persistence.as_ref() else {
            return;
        };
        let snapshot = self.snapshot();
        if let Err(err) = persistence.save(&snapshot) {
            error!(
                "event=state_persist module=store status=error error_code=snapshot_write_failed error={}",
                err
            );
        }
    }
}

/// Marks one remote call as outstanding; clears `loading` when dropped.
///
/// Covers futures dropped mid-call, which never reach `succeed`/`fail`.
struct InFlight<'a> {
    state: &'a watch::Sender<StoreState>,
}

impl<'a> InFlight<'a> {
    fn begin(state: &'a watch::Sender<StoreState>) -> Self {
        state.send_modify(|state| state.loading = true);
        Self { state }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state.send_if_modified(|state| {
            let was_loading = state.loading;
            state.loading = false;
            was_loading
        });
    }
}
