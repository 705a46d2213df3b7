use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::traits::{ErrorReporter, TextSink};
use super::truncate::CappedText;
use crate::config::PublisherConfig;
use crate::store::{PutOutcome, StatusStore};
use crate::task::{TaskId, TaskStatus};

pub const TOO_LARGE_FALLBACK_OUTPUT: &str =
    "Task completed but output too large for the status store";

const FALLBACK_ERROR_BYTES: usize = 1000;

/// Accumulates a task's output and error text and writes bounded snapshots to
/// the status store in batches. Single writer per task.
pub struct BatchedPublisher<S: StatusStore + ?Sized> {
    task_id: TaskId,
    store: Arc<S>,
    cfg: PublisherConfig,
    ttl: Duration,
    output: CappedText,
    error: CappedText,
    unflushed: usize,
    last_flush: Instant,
    flushed_once: bool,
    degraded: bool,
    finished: bool,
}

impl<S: StatusStore + ?Sized> BatchedPublisher<S> {
    pub fn new(task_id: TaskId, store: Arc<S>, cfg: PublisherConfig, ttl: Duration) -> Self {
        Self {
            task_id,
            store,
            cfg,
            ttl,
            output: CappedText::default(),
            error: CappedText::default(),
            unflushed: 0,
            last_flush: Instant::now(),
            flushed_once: false,
            degraded: false,
            finished: false,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn output(&self) -> &str {
        self.output.as_str()
    }

    pub fn error(&self) -> &str {
        self.error.as_str()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub async fn on_text(&mut self, text: &str) {
        if self.finished || text.is_empty() {
            return;
        }
        self.output.push(text, self.cfg.max_output_bytes);
        self.unflushed += text.len();
        self.maybe_flush().await;
    }

    pub async fn on_error(&mut self, text: &str) {
        if self.finished || text.is_empty() {
            return;
        }
        self.error.push(text, self.cfg.max_error_bytes);
        self.unflushed += text.len();
        self.maybe_flush().await;
    }

    /// Time-based flush check for periods without new input.
    pub async fn tick(&mut self) {
        if self.finished || self.degraded || self.unflushed == 0 {
            return;
        }
        if self.last_flush.elapsed() >= self.cfg.flush_interval() {
            self.flush().await;
        }
    }

    /// Write the terminal record. Safe to call more than once.
    pub async fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let status = self.snapshot(true);
        match self.store.put(&self.task_id, &status, self.ttl).await {
            Ok(PutOutcome::Stored) => {
                tracing::info!(
                    task_id = %self.task_id,
                    output_bytes = self.output.len(),
                    error_bytes = self.error.len(),
                    "task status finalized"
                );
            }
            Ok(PutOutcome::Terminal) => {
                tracing::warn!(task_id = %self.task_id, "status record already finished");
            }
            Err(e) if e.is_too_large() => {
                tracing::warn!(task_id = %self.task_id, error = %e, "final record too large, writing fallback");
                let fallback = TaskStatus {
                    output: TOO_LARGE_FALLBACK_OUTPUT.to_string(),
                    error: prefix_on_char_boundary(self.error.as_str(), FALLBACK_ERROR_BYTES).to_string(),
                    finished: true,
                };
                if let Err(e) = self.store.put(&self.task_id, &fallback, self.ttl).await {
                    tracing::error!(task_id = %self.task_id, error = %e, "fallback status write failed");
                }
            }
            Err(e) => {
                tracing::error!(task_id = %self.task_id, error = %e, "final status write failed");
            }
        }
        self.unflushed = 0;
    }

    async fn maybe_flush(&mut self) {
        if self.degraded || self.unflushed == 0 {
            return;
        }
        let due = !self.flushed_once
            || self.unflushed >= self.cfg.flush_bytes
            || self.last_flush.elapsed() >= self.cfg.flush_interval();
        if due {
            self.flush().await;
        }
    }

    async fn flush(&mut self) {
        let status = self.snapshot(false);
        match self.store.put(&self.task_id, &status, self.ttl).await {
            Ok(PutOutcome::Stored) => {
                self.unflushed = 0;
                self.last_flush = Instant::now();
                self.flushed_once = true;
            }
            Ok(PutOutcome::Terminal) => {
                tracing::warn!(task_id = %self.task_id, "status record already finished, no further updates");
                self.degraded = true;
            }
            Err(e) => {
                tracing::warn!(task_id = %self.task_id, error = %e, "status update failed, disabling further updates");
                self.degraded = true;
            }
        }
    }

    fn snapshot(&self, finished: bool) -> TaskStatus {
        TaskStatus {
            output: self.output.as_str().to_string(),
            error: self.error.as_str().to_string(),
            finished,
        }
    }
}

#[async_trait]
impl<S: StatusStore + ?Sized> TextSink for BatchedPublisher<S> {
    async fn write_text(&mut self, text: &str) {
        self.on_text(text).await;
    }
}

#[async_trait]
impl<S: StatusStore + ?Sized> ErrorReporter for BatchedPublisher<S> {
    async fn report_error(&mut self, text: &str) {
        self.on_error(text).await;
    }
}

fn prefix_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
