use jobwatch_core::api::{resolve_task, CliError, LaunchError};

use super::cli::LaunchArgs;
use crate::app::AppContext;

/// Launch a catalog task, print its id and return without waiting for it.
pub async fn handle_launch(args: LaunchArgs, ctx: &AppContext) -> Result<i32, CliError> {
    let descriptor = resolve_task(&ctx.cfg().tasks, &args.task, &args.args)
        .ok_or_else(|| CliError::Command(format!("unknown task: {}", args.task)))?;

    let store = ctx.build_store().await?;
    let launcher = ctx.build_launcher(store)?;

    match launcher.launch(&descriptor).await {
        Ok(task_id) => {
            println!("{task_id}");
            Ok(0)
        }
        Err(LaunchError::Spawn { task_id, reason }) => {
            // The id is still useful: its record carries the failure.
            println!("{task_id}");
            Err(CliError::Launch(LaunchError::Spawn { task_id, reason }))
        }
        Err(e) => Err(e.into()),
    }
}
