//! Status store contract shared by the launcher, workers and readers.
//!
//! Backends live in `jobwatch-plugins`; they must be visible across OS
//! processes.

mod codec;
#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::task::{TaskId, TaskStatus};

pub use codec::{decode_record, encode_record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Stored,
    /// The stored record is already finished; nothing was written.
    Terminal,
}

#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Atomically replace the record and refresh its TTL, unless the stored
    /// record is already finished.
    async fn put(
        &self,
        id: &TaskId,
        status: &TaskStatus,
        ttl: Duration,
    ) -> Result<PutOutcome, StoreError>;

    /// `None` when the record never existed or has expired.
    async fn get(&self, id: &TaskId) -> Result<Option<TaskStatus>, StoreError>;

    fn item_size_limit(&self) -> usize;
}
