use crate::model::task::{Task, TaskId};
use serde::{Deserialize, Serialize};

/// Snapshot of the task store: cached tasks plus transient status flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub loading: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl StoreState {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            ..Self::default()
        }
    }

    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.completed).count()
    }

    /// Drops transient flags that carry no meaning across reloads.
    pub fn into_rehydrated(self) -> Self {
        Self {
            tasks: self.tasks,
            loading: false,
            error: None,
        }
    }
}
