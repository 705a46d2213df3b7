use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::SpawnError;
use crate::task::{TaskDescriptor, TaskId};

/// Hidden CLI subcommand that runs a single task inside its own process.
pub const WORKER_SUBCOMMAND: &str = "worker";

#[async_trait]
pub trait WorkerSpawner: Send + Sync {
    /// Start the worker for `task_id` and return as soon as it is running.
    async fn spawn(&self, task_id: &TaskId, descriptor: &TaskDescriptor) -> Result<(), SpawnError>;
}

/// Re-executes a worker binary as a detached process per task.
pub struct ProcessSpawner {
    worker_exe: PathBuf,
    config_path: Option<PathBuf>,
}

impl ProcessSpawner {
    pub fn new(worker_exe: impl Into<PathBuf>) -> Self {
        Self {
            worker_exe: worker_exe.into(),
            config_path: None,
        }
    }

    /// Use the currently running executable as the worker binary.
    pub fn current_exe() -> Result<Self, SpawnError> {
        let exe = std::env::current_exe().map_err(SpawnError::WorkerExe)?;
        Ok(Self::new(exe))
    }

    /// Config file the worker should load, so it shares store and thresholds.
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Arguments passed to the worker binary.
    pub fn worker_args(&self, task_id: &TaskId, program: &str, args: &[String]) -> Vec<String> {
        let mut out = Vec::with_capacity(args.len() + 6);
        if let Some(cfg) = &self.config_path {
            out.push("--config".to_string());
            out.push(cfg.to_string_lossy().to_string());
        }
        out.push(WORKER_SUBCOMMAND.to_string());
        out.push("--task-id".to_string());
        out.push(task_id.to_string());
        out.push("--".to_string());
        out.push(program.to_string());
        out.extend(args.iter().cloned());
        out
    }
}

#[async_trait]
impl WorkerSpawner for ProcessSpawner {
    async fn spawn(&self, task_id: &TaskId, descriptor: &TaskDescriptor) -> Result<(), SpawnError> {
        let program = which::which(&descriptor.program).map_err(|_| {
            SpawnError::ProgramNotFound {
                program: descriptor.program.clone(),
            }
        })?;

        let mut cmd = Command::new(&self.worker_exe);
        cmd.args(self.worker_args(task_id, &program.to_string_lossy(), &descriptor.args))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);

        // Own process group: signals aimed at the launcher's group do not reach the worker.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn()?;
        let pid = child.id();
        tracing::debug!(task_id = %task_id, pid = ?pid, "worker process started");

        let task_id = *task_id;
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => {
                    tracing::debug!(task_id = %task_id, status = %status, "worker process exited")
                }
                Err(e) => tracing::warn!(task_id = %task_id, error = %e, "waiting on worker failed"),
            }
        });
        Ok(())
    }
}
