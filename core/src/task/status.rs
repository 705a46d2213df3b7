use serde::{Deserialize, Serialize};

/// Latest snapshot of a task as stored and as returned to observers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub output: String,
    pub error: String,
    pub finished: bool,
}

impl TaskStatus {
    /// The record written at launch, before the worker produces anything.
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            error: error.into(),
            finished: true,
        }
    }
}
