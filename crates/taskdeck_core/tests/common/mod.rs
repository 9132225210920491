#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use taskdeck_core::{RepoError, RepoResult, Task, TaskId, TaskRepository};
use tokio::sync::Semaphore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Create(String),
    SetCompletion(TaskId, bool),
    Remove(TaskId),
}

#[derive(Default)]
struct FakeState {
    remote: Vec<Task>,
    created: VecDeque<Task>,
    fail_list: bool,
    fail_create: bool,
    fail_update: bool,
    failing_removes: HashSet<TaskId>,
    calls: Vec<Call>,
}

/// Scriptable in-memory `TaskRepository`.
#[derive(Default)]
pub struct FakeTaskRepository {
    state: Mutex<FakeState>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call waits for one permit from `gate` before answering.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            state: Mutex::default(),
            gate: Some(gate),
        }
    }

    pub fn with_remote(self, tasks: Vec<Task>) -> Self {
        self.state.lock().unwrap().remote = tasks;
        self
    }

    pub fn push_created(&self, task: Task) {
        self.state.lock().unwrap().created.push_back(task);
    }

    pub fn fail_list(&self, fail: bool) {
        self.state.lock().unwrap().fail_list = fail;
    }

    pub fn fail_create(&self, fail: bool) {
        self.state.lock().unwrap().fail_create = fail;
    }

    pub fn fail_update(&self, fail: bool) {
        self.state.lock().unwrap().fail_update = fail;
    }

    pub fn fail_remove_of(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_removes
            .insert(TaskId::from(id));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn remote(&self) -> Vec<Task> {
        self.state.lock().unwrap().remote.clone()
    }

    async fn enter(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
        if let Some(gate) = self.gate.as_ref() {
            gate.acquire().await.unwrap().forget();
        }
        tokio::task::yield_now().await;
    }
}

fn injected(operation: &str) -> RepoError {
    RepoError::InvalidData(format!("injected {operation} failure"))
}

#[async_trait]
impl TaskRepository for FakeTaskRepository {
    async fn list(&self) -> RepoResult<Vec<Task>> {
        self.enter(Call::List).await;
        let state = self.state.lock().unwrap();
        if state.fail_list {
            return Err(injected("list"));
        }
        Ok(state.remote.clone())
    }

    async fn create(&self, title: &str) -> RepoResult<Task> {
        self.enter(Call::Create(title.to_string())).await;
        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            return Err(injected("create"));
        }
        let task = match state.created.pop_front() {
            Some(task) => task,
            None => Task::new(
                (state.remote.len() as u64 + 100).to_string(),
                title,
                false,
            ),
        };
        state.remote.insert(0, task.clone());
        Ok(task)
    }

    async fn set_completion(&self, id: &TaskId, completed: bool) -> RepoResult<Value> {
        self.enter(Call::SetCompletion(id.clone(), completed)).await;
        let mut state = self.state.lock().unwrap();
        if state.fail_update {
            return Err(injected("update"));
        }
        if let Some(task) = state.remote.iter_mut().find(|task| &task.id == id) {
            task.completed = completed;
        }
        Ok(json!({ "id": id, "completed": completed }))
    }

    async fn remove(&self, id: &TaskId) -> RepoResult<()> {
        self.enter(Call::Remove(id.clone())).await;
        let mut state = self.state.lock().unwrap();
        if state.failing_removes.contains(id) {
            return Err(injected("remove"));
        }
        state.remote.retain(|task| &task.id != id);
        Ok(())
    }
}

pub fn task(id: &str, title: &str, completed: bool) -> Task {
    Task::new(id, title, completed)
}

pub fn ids(values: &[&str]) -> Vec<TaskId> {
    values.iter().map(|value| TaskId::from(*value)).collect()
}
