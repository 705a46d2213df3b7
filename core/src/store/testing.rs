use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{encode_record, PutOutcome, StatusStore};
use crate::error::StoreError;
use crate::task::{TaskId, TaskStatus};

/// In-process store that records every put and can be told to fail.
pub(crate) struct RecordingStore {
    pub records: Mutex<HashMap<TaskId, TaskStatus>>,
    pub puts: Mutex<Vec<TaskStatus>>,
    pub put_calls: AtomicUsize,
    pub fail_puts: AtomicBool,
    pub limit: usize,
}

impl RecordingStore {
    pub fn new(limit: usize) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            puts: Mutex::new(Vec::new()),
            put_calls: AtomicUsize::new(0),
            fail_puts: AtomicBool::new(false),
            limit,
        }
    }

    pub fn calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn current(&self, id: &TaskId) -> Option<TaskStatus> {
        self.records.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl StatusStore for RecordingStore {
    async fn put(
        &self,
        id: &TaskId,
        status: &TaskStatus,
        _ttl: Duration,
    ) -> Result<PutOutcome, StoreError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected failure".to_string()));
        }
        encode_record(status, self.limit)?;
        let mut records = self.records.lock().unwrap();
        if records.get(id).map(|r| r.finished).unwrap_or(false) {
            return Ok(PutOutcome::Terminal);
        }
        records.insert(*id, status.clone());
        self.puts.lock().unwrap().push(status.clone());
        Ok(PutOutcome::Stored)
    }

    async fn get(&self, id: &TaskId) -> Result<Option<TaskStatus>, StoreError> {
        Ok(self.current(id))
    }

    fn item_size_limit(&self) -> usize {
        self.limit
    }
}
