use std::io::Write;
use std::time::Duration;

use jobwatch_core::api::{CliError, Poll, TaskStatus};

use super::cli::{StatusArgs, WatchArgs};
use crate::app::AppContext;

/// Exit code when the task id is unknown or its record expired.
pub const EXIT_NOT_FOUND: i32 = 3;

pub async fn handle_status(args: StatusArgs, ctx: &AppContext) -> Result<i32, CliError> {
    let reader = ctx.build_reader(ctx.build_store().await?);
    match reader.poll_str(&args.task_id).await? {
        Poll::Found(status) => {
            let json = serde_json::to_string_pretty(&status)
                .map_err(|e| CliError::Command(e.to_string()))?;
            println!("{json}");
            Ok(0)
        }
        Poll::NotFound => {
            eprintln!("task not found or expired: {}", args.task_id);
            Ok(EXIT_NOT_FOUND)
        }
    }
}

/// Poll until the task finishes, streaming newly seen output to stdout and
/// error text to stderr.
pub async fn handle_watch(args: WatchArgs, ctx: &AppContext) -> Result<i32, CliError> {
    let reader = ctx.build_reader(ctx.build_store().await?);
    let interval = Duration::from_millis(args.interval_ms.max(50));
    let mut last = TaskStatus::default();

    loop {
        let status = match reader.poll_str(&args.task_id).await? {
            Poll::Found(status) => status,
            Poll::NotFound => {
                eprintln!("task not found or expired: {}", args.task_id);
                return Ok(EXIT_NOT_FOUND);
            }
        };

        let out = unseen(&last.output, &status.output);
        let err = unseen(&last.error, &status.error);
        if !out.is_empty() {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(out.as_bytes())?;
            stdout.flush()?;
        }
        if !err.is_empty() {
            let mut stderr = std::io::stderr().lock();
            stderr.write_all(err.as_bytes())?;
            stderr.flush()?;
        }

        if status.finished {
            return Ok(0);
        }
        last = status;
        tokio::time::sleep(interval).await;
    }
}

const UNSEEN_ANCHOR_BYTES: usize = 64;

/// Part of `current` not yet shown, given the previously shown snapshot.
/// Falls back to matching the tail of `previous` when the front was truncated.
fn unseen<'a>(previous: &str, current: &'a str) -> &'a str {
    if let Some(rest) = current.strip_prefix(previous) {
        return rest;
    }
    let mut start = previous.len().saturating_sub(UNSEEN_ANCHOR_BYTES);
    while !previous.is_char_boundary(start) {
        start += 1;
    }
    let tail = &previous[start..];
    match current.rfind(tail) {
        Some(pos) if !tail.is_empty() => &current[pos + tail.len()..],
        _ => current,
    }
}
