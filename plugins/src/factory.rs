use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use jobwatch_core::config::{StoreConfig, StoreProvider};
use jobwatch_core::store::StatusStore;

use crate::store::SqliteStatusStore;

pub async fn build_store(cfg: &StoreConfig) -> Result<Arc<dyn StatusStore>> {
    match &cfg.provider {
        StoreProvider::Sqlite(sqlite_cfg) => {
            if sqlite_cfg.path.trim().is_empty() {
                anyhow::bail!("store.path is empty");
            }
            let store = SqliteStatusStore::open(
                &sqlite_cfg.path,
                Duration::from_millis(sqlite_cfg.busy_timeout_ms),
                cfg.item_size_limit,
            )?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "redis")]
        StoreProvider::Redis(redis_cfg) => {
            let store = crate::store::RedisStatusStore::connect(&redis_cfg.url, cfg.item_size_limit)
                .await?
                .with_prefix(redis_cfg.key_prefix.clone());
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        StoreProvider::Redis(_) => {
            anyhow::bail!("store provider \"redis\" requires building with the `redis` feature")
        }
    }
}
