pub mod sqlite;
#[cfg(feature = "redis")]
pub mod redis;

pub use sqlite::SqliteStatusStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisStatusStore;
