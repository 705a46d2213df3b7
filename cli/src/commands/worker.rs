use std::sync::Arc;

use jobwatch_core::api::{
    run_worker, CliError, StatusStore, TaskId, TaskStatus, WorkerRequest, WorkerSettings,
};

use super::cli::WorkerArgs;
use crate::app::AppContext;

/// Entry point of a detached worker process.
pub async fn handle_worker(args: WorkerArgs, ctx: &AppContext) -> Result<i32, CliError> {
    let task_id: TaskId = args
        .task_id
        .parse()
        .map_err(|e| CliError::Command(format!("invalid task id {:?}: {e}", args.task_id)))?;

    let store = ctx.build_store().await?;

    // From here on the seeded record must end up finished.
    let (req, settings) = match prepare(task_id, args.command, ctx) {
        Ok(prepared) => prepared,
        Err(e) => {
            record_setup_failure(&store, &task_id, &e, ctx).await;
            return Err(e);
        }
    };

    tracing::info!(task_id = %task_id, pid = std::process::id(), "worker started");
    let outcome = run_worker(req, store, &settings).await?;
    Ok(outcome.exit_code.unwrap_or(1))
}

fn prepare(
    task_id: TaskId,
    command: Vec<String>,
    ctx: &AppContext,
) -> Result<(WorkerRequest, WorkerSettings), CliError> {
    let mut command = command.into_iter();
    let program = command
        .next()
        .ok_or_else(|| CliError::Command("worker requires a program after --".to_string()))?;
    let settings = ctx.worker_settings()?;
    Ok((
        WorkerRequest {
            task_id,
            program,
            args: command.collect(),
        },
        settings,
    ))
}

async fn record_setup_failure(
    store: &Arc<dyn StatusStore>,
    task_id: &TaskId,
    err: &CliError,
    ctx: &AppContext,
) {
    tracing::error!(task_id = %task_id, error = %err, "worker setup failed");
    let failed = TaskStatus::failed(format!("Failed to start task: {err}"));
    if let Err(store_err) = store.put(task_id, &failed, ctx.cfg().store.ttl()).await {
        tracing::error!(task_id = %task_id, error = %store_err, "could not record worker setup failure");
    }
}
