use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::io_pump::{pump, OutputChunk, OutputStream};
use crate::config::PublisherConfig;
use crate::error::WorkerError;
use crate::filter::{FilterOutput, FilterSink, RuleSet};
use crate::publisher::{BatchedPublisher, ErrorReporter, TextSink};
use crate::store::StatusStore;
use crate::task::TaskId;

#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub task_id: TaskId,
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Clone)]
pub struct WorkerSettings {
    pub publisher: PublisherConfig,
    pub rules: RuleSet,
    pub ttl: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutcome {
    /// `None` when the task was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout_bytes: u64,
    pub stderr_bytes: u64,
}

/// Run one task to completion inside the current (worker) process,
/// streaming its filtered output into the status store.
pub async fn run_worker(
    req: WorkerRequest,
    store: Arc<dyn StatusStore>,
    settings: &WorkerSettings,
) -> Result<WorkerOutcome, WorkerError> {
    let mut publisher = BatchedPublisher::new(
        req.task_id,
        store,
        settings.publisher.clone(),
        settings.ttl,
    );

    let mut child = match Command::new(&req.program)
        .args(&req.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            tracing::error!(task_id = %req.task_id, program = %req.program, error = %e, "task spawn failed");
            publisher
                .on_error(&format!("Failed to start task: {e}\n"))
                .await;
            publisher.finish().await;
            return Err(WorkerError::Spawn(e.to_string()));
        }
    };
    tracing::info!(task_id = %req.task_id, program = %req.program, pid = ?child.id(), "task started");

    let (tx, mut rx) = mpsc::channel::<OutputChunk>(64);
    let stdout_pump = child
        .stdout
        .take()
        .map(|s| pump(s, OutputStream::Stdout, tx.clone()));
    let stderr_pump = child
        .stderr
        .take()
        .map(|s| pump(s, OutputStream::Stderr, tx.clone()));
    drop(tx);

    let mut stdout_sink = FilterSink::new(settings.rules.clone());
    let mut stderr_sink = FilterSink::new(settings.rules.clone());

    let mut ticker = tokio::time::interval(settings.publisher.flush_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe = rx.recv() => {
                let Some(chunk) = maybe else { break };
                let filtered = match chunk.stream {
                    OutputStream::Stdout => stdout_sink.write(&chunk.bytes),
                    OutputStream::Stderr => stderr_sink.write(&chunk.bytes),
                };
                deliver(&mut publisher, chunk.stream, filtered).await;
            }
            _ = ticker.tick() => publisher.tick().await,
        }
    }

    deliver(&mut publisher, OutputStream::Stdout, stdout_sink.finish()).await;
    deliver(&mut publisher, OutputStream::Stderr, stderr_sink.finish()).await;

    let stdout_bytes = join_pump(&mut publisher, stdout_pump).await;
    let stderr_bytes = join_pump(&mut publisher, stderr_pump).await;

    let exit_code = match child.wait().await {
        Ok(status) if status.success() => Some(0),
        Ok(status) => {
            match status.code() {
                Some(code) => {
                    publisher
                        .on_error(&format!("task exited with status {code}\n"))
                        .await;
                }
                None => publisher.on_error("task terminated by signal\n").await,
            }
            status.code()
        }
        Err(e) => {
            publisher.finish().await;
            return Err(WorkerError::Wait(e));
        }
    };

    publisher.finish().await;
    tracing::info!(
        task_id = %req.task_id,
        exit_code = ?exit_code,
        stdout_bytes,
        stderr_bytes,
        "task finished"
    );

    Ok(WorkerOutcome {
        exit_code,
        stdout_bytes,
        stderr_bytes,
    })
}

/// Route filtered text by stream and filter faults to the error channel.
async fn deliver<P>(publisher: &mut P, stream: OutputStream, out: FilterOutput)
where
    P: TextSink + ErrorReporter,
{
    for fault in out.faults {
        publisher
            .report_error(&format!(
                "output filter rule {} failed: {}\n",
                fault.rule, fault.message
            ))
            .await;
    }
    if out.text.is_empty() {
        return;
    }
    match stream {
        OutputStream::Stdout => publisher.write_text(&out.text).await,
        OutputStream::Stderr => publisher.report_error(&out.text).await,
    }
}

async fn join_pump<P>(
    publisher: &mut P,
    handle: Option<tokio::task::JoinHandle<Result<u64, WorkerError>>>,
) -> u64
where
    P: ErrorReporter,
{
    let Some(handle) = handle else { return 0 };
    match handle.await {
        Ok(Ok(n)) => n,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "output pump failed");
            publisher.report_error(&format!("{e}\n")).await;
            0
        }
        Err(e) => {
            tracing::warn!(error = %e, "output pump panicked");
            0
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::filter::build_rules;
    use crate::store::testing::RecordingStore;
    use crate::task::TaskStatus;
    use pretty_assertions::assert_eq;

    fn settings() -> WorkerSettings {
        WorkerSettings {
            publisher: PublisherConfig {
                flush_bytes: 16,
                flush_interval_ms: 50,
                max_output_bytes: 64 * 1024,
                max_error_bytes: 8 * 1024,
            },
            rules: build_rules(&FilterConfig::default()).unwrap(),
            ttl: Duration::from_secs(60),
        }
    }

    fn sh(task_id: TaskId, script: &str) -> WorkerRequest {
        WorkerRequest {
            task_id,
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    #[tokio::test]
    async fn filters_output_and_marks_finished() {
        let store = Arc::new(RecordingStore::new(128 * 1024));
        let id = TaskId::new();
        let script = r#"echo start; echo "SELECT *"; echo "    FROM t"; echo "warn" 1>&2; echo end"#;

        let outcome = run_worker(sh(id, script), store.clone(), &settings())
            .await
            .unwrap();

        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(
            store.current(&id).unwrap(),
            TaskStatus {
                output: "start\nend\n".to_string(),
                error: "warn\n".to_string(),
                finished: true,
            }
        );
    }

    #[tokio::test]
    async fn non_zero_exit_is_recorded_in_error() {
        let store = Arc::new(RecordingStore::new(128 * 1024));
        let id = TaskId::new();

        let outcome = run_worker(sh(id, "printf partial; exit 3"), store.clone(), &settings())
            .await
            .unwrap();

        assert_eq!(outcome.exit_code, Some(3));
        let rec = store.current(&id).unwrap();
        assert_eq!(rec.output, "partial");
        assert_eq!(rec.error, "task exited with status 3\n");
        assert!(rec.finished);
    }

    #[tokio::test]
    async fn unspawnable_program_finishes_record() {
        let store = Arc::new(RecordingStore::new(128 * 1024));
        let id = TaskId::new();
        let req = WorkerRequest {
            task_id: id,
            program: "/nonexistent/program".to_string(),
            args: vec![],
        };

        let err = run_worker(req, store.clone(), &settings()).await.unwrap_err();
        assert!(matches!(err, WorkerError::Spawn(_)));
        let rec = store.current(&id).unwrap();
        assert!(rec.finished);
        assert!(rec.error.starts_with("Failed to start task:"));
    }
}
