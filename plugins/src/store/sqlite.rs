//! SQLite-backed status store.
//!
//! One file shared by every process on the host. WAL journaling lets
//! readers run while a worker writes; each `put` is a single upsert, so a
//! reader sees either the previous snapshot or the new one.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jobwatch_core::error::StoreError;
use jobwatch_core::store::{decode_record, encode_record, PutOutcome, StatusStore};
use jobwatch_core::task::{TaskId, TaskStatus};
use rusqlite::{params, Connection, OptionalExtension};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS task_status (
    task_id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    finished INTEGER NOT NULL DEFAULT 0,
    expires_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_task_status_expires_at ON task_status(expires_at);
"#;

const UPSERT: &str = r#"
INSERT INTO task_status (task_id, payload, finished, expires_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT(task_id) DO UPDATE SET
    payload = excluded.payload,
    finished = excluded.finished,
    expires_at = excluded.expires_at,
    updated_at = excluded.updated_at
WHERE task_status.finished = 0
"#;

#[derive(Clone)]
pub struct SqliteStatusStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
    item_size_limit: usize,
}

impl SqliteStatusStore {
    pub fn open(
        path: impl AsRef<Path>,
        busy_timeout: Duration,
        item_size_limit: usize,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Backend(format!("failed to create store directory: {e}"))
            })?;
        }

        let conn = Connection::open(&path)
            .map_err(|e| StoreError::Backend(format!("failed to open database: {e}")))?;
        conn.busy_timeout(busy_timeout)
            .map_err(|e| StoreError::Backend(format!("failed to set busy timeout: {e}")))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| StoreError::Backend(format!("failed to set pragmas: {e}")))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::Backend(format!("failed to initialize schema: {e}")))?;

        tracing::debug!(path = %path.display(), "sqlite status store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
            item_size_limit,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Backend("connection lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("store task failed: {e}")))?
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn ttl_ms(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

#[async_trait]
impl StatusStore for SqliteStatusStore {
    async fn put(
        &self,
        id: &TaskId,
        status: &TaskStatus,
        ttl: Duration,
    ) -> Result<PutOutcome, StoreError> {
        let payload = encode_record(status, self.item_size_limit)?;
        let key = id.to_string();
        let finished = status.finished;

        self.with_conn(move |conn| {
            let now = now_ms();
            let expires_at = now.saturating_add(ttl_ms(ttl));
            let tx = conn.transaction().map_err(StoreError::backend)?;
            tx.execute("DELETE FROM task_status WHERE expires_at <= ?1", params![now])
                .map_err(StoreError::backend)?;
            let changed = tx
                .execute(UPSERT, params![key, payload, finished, expires_at, now])
                .map_err(StoreError::backend)?;
            tx.commit().map_err(StoreError::backend)?;

            Ok(if changed == 0 {
                PutOutcome::Terminal
            } else {
                PutOutcome::Stored
            })
        })
        .await
    }

    async fn get(&self, id: &TaskId) -> Result<Option<TaskStatus>, StoreError> {
        let key = id.to_string();
        let payload: Option<String> = self
            .with_conn(move |conn| {
                conn.query_row(
                    "SELECT payload FROM task_status WHERE task_id = ?1 AND expires_at > ?2",
                    params![key, now_ms()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(StoreError::backend)
            })
            .await?;

        payload.as_deref().map(decode_record).transpose()
    }

    fn item_size_limit(&self) -> usize {
        self.item_size_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn open(dir: &tempfile::TempDir) -> SqliteStatusStore {
        SqliteStatusStore::open(
            dir.path().join("status.db"),
            Duration::from_secs(5),
            64 * 1024,
        )
        .unwrap()
    }

    fn status(output: &str, finished: bool) -> TaskStatus {
        TaskStatus {
            output: output.to_string(),
            error: String::new(),
            finished,
        }
    }

    #[tokio::test]
    async fn put_replaces_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir);
        let id = TaskId::new();
        let ttl = Duration::from_secs(60);

        assert_eq!(store.get(&id).await.unwrap(), None);
        store.put(&id, &status("a", false), ttl).await.unwrap();
        store.put(&id, &status("ab", false), ttl).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap(), Some(status("ab", false)));
    }

    #[tokio::test]
    async fn finished_record_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir);
        let id = TaskId::new();
        let ttl = Duration::from_secs(60);

        store.put(&id, &status("done", true), ttl).await.unwrap();
        let outcome = store.put(&id, &status("again", false), ttl).await.unwrap();
        assert_eq!(outcome, PutOutcome::Terminal);
        assert_eq!(store.get(&id).await.unwrap(), Some(status("done", true)));
    }

    #[tokio::test]
    async fn oversized_record_is_rejected_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir);
        let id = TaskId::new();
        let ttl = Duration::from_secs(60);

        store.put(&id, &status("small", false), ttl).await.unwrap();
        let err = store
            .put(&id, &status(&"x".repeat(70 * 1024), false), ttl)
            .await
            .unwrap_err();
        assert!(err.is_too_large());
        assert_eq!(store.get(&id).await.unwrap(), Some(status("small", false)));
    }

    #[tokio::test]
    async fn expired_record_reads_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir);
        let id = TaskId::new();

        store
            .put(&id, &status("gone", true), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(store.get(&id).await.unwrap(), None);

        // An expired terminal record does not block a fresh write under the same id.
        let outcome = store
            .put(&id, &status("new", false), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(outcome, PutOutcome::Stored);
    }

    #[tokio::test]
    async fn creates_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("status.db");
        let store = SqliteStatusStore::open(&path, Duration::from_secs(1), 1024).unwrap();
        assert!(path.exists());
        assert_eq!(store.item_size_limit(), 1024);
    }
}
