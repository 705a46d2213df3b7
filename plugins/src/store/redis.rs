//! Redis-backed status store (`redis` feature).
//!
//! Records live under `{prefix}:status:{task_id}` as the encoded JSON
//! snapshot. Expiry is Redis's own key TTL. The terminal guard and the write
//! run in one Lua script so concurrent writers cannot interleave.

use std::time::Duration;

use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, Script};
use async_trait::async_trait;
use jobwatch_core::error::StoreError;
use jobwatch_core::store::{decode_record, encode_record, PutOutcome, StatusStore};
use jobwatch_core::task::{TaskId, TaskStatus};

/// KEYS[1] = record key.
/// ARGV[1] = payload, ARGV[2] = ttl seconds.
/// Returns 1 when written, 0 when the stored record is already finished.
const LUA_PUT_UNLESS_FINISHED: &str = r#"
local current = redis.call('GET', KEYS[1])
if current then
    local ok, decoded = pcall(cjson.decode, current)
    if ok and decoded['finished'] == true then
        return 0
    end
end
redis.call('SET', KEYS[1], ARGV[1], 'EX', tonumber(ARGV[2]))
return 1
"#;

#[derive(Clone)]
pub struct RedisStatusStore {
    conn: MultiplexedConnection,
    key_prefix: String,
    item_size_limit: usize,
}

impl RedisStatusStore {
    pub async fn connect(url: &str, item_size_limit: usize) -> Result<Self, StoreError> {
        let client = ::redis::Client::open(url)
            .map_err(|e| StoreError::Backend(format!("failed to create Redis client: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Backend(format!("failed to connect to Redis: {e}")))?;
        Ok(Self {
            conn,
            key_prefix: "jobwatch".to_string(),
            item_size_limit,
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn key(&self, id: &TaskId) -> String {
        format!("{}:status:{}", self.key_prefix, id)
    }
}

fn map_redis_error(err: ::redis::RedisError, key: &str) -> StoreError {
    StoreError::Backend(format!("Redis error for key {key}: {err}"))
}

#[async_trait]
impl StatusStore for RedisStatusStore {
    async fn put(
        &self,
        id: &TaskId,
        status: &TaskStatus,
        ttl: Duration,
    ) -> Result<PutOutcome, StoreError> {
        let payload = encode_record(status, self.item_size_limit)?;
        let key = self.key(id);
        // SET EX rejects 0.
        let ttl_secs = ttl.as_secs().max(1);

        let written: i64 = Script::new(LUA_PUT_UNLESS_FINISHED)
            .key(&key)
            .arg(payload)
            .arg(ttl_secs)
            .invoke_async(&mut self.conn.clone())
            .await
            .map_err(|e| map_redis_error(e, &key))?;

        Ok(if written == 1 {
            PutOutcome::Stored
        } else {
            PutOutcome::Terminal
        })
    }

    async fn get(&self, id: &TaskId) -> Result<Option<TaskStatus>, StoreError> {
        let key = self.key(id);
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| map_redis_error(e, &key))?;
        raw.as_deref().map(decode_record).transpose()
    }

    fn item_size_limit(&self) -> usize {
        self.item_size_limit
    }
}
