use thiserror::Error;

use super::StoreError;
use crate::task::TaskId;

#[derive(Error, Debug)]
pub enum LaunchError {
    /// The initial record could not be written; no worker was started.
    #[error("failed to seed status record: {0}")]
    Store(#[from] StoreError),
    /// The worker did not start. Marking the record for `task_id` finished
    /// with `reason` is best effort.
    #[error("failed to start task {task_id}: {reason}")]
    Spawn { task_id: TaskId, reason: String },
}

#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("program not found: {program}")]
    ProgramNotFound { program: String },
    #[error("cannot locate worker executable: {0}")]
    WorkerExe(std::io::Error),
    #[error("spawn failed: {0}")]
    Io(#[from] std::io::Error),
}
