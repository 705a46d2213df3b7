use std::sync::Arc;

use crate::error::StoreError;
use crate::store::StatusStore;
use crate::task::{TaskId, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll {
    Found(TaskStatus),
    /// Never launched, or the record has expired.
    NotFound,
}

/// Read-only view over the status store. Cheap to clone; any number of
/// readers may poll concurrently.
#[derive(Clone)]
pub struct StatusReader {
    store: Arc<dyn StatusStore>,
}

impl StatusReader {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self { store }
    }

    pub async fn poll(&self, id: &TaskId) -> Result<Poll, StoreError> {
        Ok(match self.store.get(id).await? {
            Some(status) => Poll::Found(status),
            None => Poll::NotFound,
        })
    }

    /// Like [`poll`](Self::poll) for untrusted input; malformed ids are
    /// reported as not found.
    pub async fn poll_str(&self, raw: &str) -> Result<Poll, StoreError> {
        match raw.parse::<TaskId>() {
            Ok(id) => self.poll(&id).await,
            Err(_) => Ok(Poll::NotFound),
        }
    }
}
