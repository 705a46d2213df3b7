mod spawner;

use std::sync::Arc;
use std::time::Duration;

pub use spawner::{ProcessSpawner, WorkerSpawner, WORKER_SUBCOMMAND};

use crate::error::LaunchError;
use crate::store::StatusStore;
use crate::task::{TaskDescriptor, TaskId, TaskStatus};

/// Starts tasks in isolated worker processes and returns without waiting.
#[derive(Clone)]
pub struct Launcher {
    store: Arc<dyn StatusStore>,
    spawner: Arc<dyn WorkerSpawner>,
    ttl: Duration,
}

impl Launcher {
    pub fn new(store: Arc<dyn StatusStore>, spawner: Arc<dyn WorkerSpawner>, ttl: Duration) -> Self {
        Self {
            store,
            spawner,
            ttl,
        }
    }

    /// Seed the record, start the worker, return its id.
    ///
    /// If the worker cannot be started the record is rewritten as finished
    /// with the failure in `error` before returning.
    pub async fn launch(&self, descriptor: &TaskDescriptor) -> Result<TaskId, LaunchError> {
        let task_id = TaskId::new();
        self.store
            .put(&task_id, &TaskStatus::pending(), self.ttl)
            .await?;

        match self.spawner.spawn(&task_id, descriptor).await {
            Ok(()) => {
                tracing::info!(
                    task_id = %task_id,
                    task = %descriptor.name,
                    program = %descriptor.program,
                    "task launched"
                );
                Ok(task_id)
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::error!(task_id = %task_id, task = %descriptor.name, error = %reason, "task launch failed");
                let failed = TaskStatus::failed(format!("Failed to start task: {reason}"));
                if let Err(store_err) = self.store.put(&task_id, &failed, self.ttl).await {
                    tracing::error!(task_id = %task_id, error = %store_err, "could not record launch failure");
                }
                Err(LaunchError::Spawn { task_id, reason })
            }
        }
    }
}
