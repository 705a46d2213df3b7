#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jobwatch_core::api::{
    encode_record, PutOutcome, StatusStore, StoreError, TaskId, TaskStatus,
};
use tokio::time::Instant;

/// TTL-aware in-process store following the tokio clock, so paused-time tests
/// can expire records.
pub struct MemoryStore {
    records: Mutex<HashMap<TaskId, (TaskStatus, Instant)>>,
    history: Mutex<Vec<TaskStatus>>,
    puts: AtomicUsize,
    limit: usize,
}

impl MemoryStore {
    pub fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
            puts: AtomicUsize::new(0),
            limit,
        })
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn history(&self) -> Vec<TaskStatus> {
        self.history.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn put(
        &self,
        id: &TaskId,
        status: &TaskStatus,
        ttl: Duration,
    ) -> Result<PutOutcome, StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        encode_record(status, self.limit)?;
        let now = Instant::now();
        let mut records = self.records.lock().unwrap();
        if let Some((existing, expires)) = records.get(id) {
            if *expires > now && existing.finished {
                return Ok(PutOutcome::Terminal);
            }
        }
        records.insert(*id, (status.clone(), now + ttl));
        self.history.lock().unwrap().push(status.clone());
        Ok(PutOutcome::Stored)
    }

    async fn get(&self, id: &TaskId) -> Result<Option<TaskStatus>, StoreError> {
        let now = Instant::now();
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(id)
            .filter(|(_, expires)| *expires > now)
            .map(|(status, _)| status.clone()))
    }

    fn item_size_limit(&self) -> usize {
        self.limit
    }
}
