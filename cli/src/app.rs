//! Shared wiring for subcommands: resolved config plus store and launcher
//! construction.

use std::path::PathBuf;
use std::sync::Arc;

use jobwatch_core::api::{
    build_rules, AppConfig, CliError, Launcher, ProcessSpawner, StatusReader, StatusStore,
    WorkerSettings,
};

#[derive(Clone)]
pub struct AppContext {
    cfg: AppConfig,
    /// Absolute path of the loaded config file, forwarded to workers.
    config_path: Option<PathBuf>,
}

impl AppContext {
    pub fn new(cfg: AppConfig, config_path: Option<PathBuf>) -> Self {
        Self { cfg, config_path }
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }

    pub async fn build_store(&self) -> Result<Arc<dyn StatusStore>, CliError> {
        jobwatch_plugins::factory::build_store(&self.cfg.store)
            .await
            .map_err(|e| CliError::Config(format!("status store: {e}")))
    }

    /// Fails on a filter config the worker could not compile, before any
    /// record is seeded.
    pub fn build_launcher(&self, store: Arc<dyn StatusStore>) -> Result<Launcher, CliError> {
        build_rules(&self.cfg.filter).map_err(|e| CliError::Config(e.to_string()))?;
        let spawner = ProcessSpawner::current_exe()
            .map_err(|e| CliError::Command(e.to_string()))?
            .with_config_path(self.config_path.clone());
        Ok(Launcher::new(store, Arc::new(spawner), self.cfg.store.ttl()))
    }

    pub fn build_reader(&self, store: Arc<dyn StatusStore>) -> StatusReader {
        StatusReader::new(store)
    }

    pub fn worker_settings(&self) -> Result<WorkerSettings, CliError> {
        let rules = build_rules(&self.cfg.filter).map_err(|e| CliError::Config(e.to_string()))?;
        Ok(WorkerSettings {
            publisher: self.cfg.publisher.clone(),
            rules,
            ttl: self.cfg.store.ttl(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobwatch_core::api::{FilterRuleConfig, RuleAction, SqliteStoreConfig, StoreProvider};

    #[tokio::test]
    async fn launcher_refuses_uncompilable_filter() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = AppConfig::default();
        cfg.store.provider = StoreProvider::Sqlite(SqliteStoreConfig {
            path: dir.path().join("status.db").to_string_lossy().to_string(),
            busy_timeout_ms: 1_000,
        });
        cfg.filter.rules.push(FilterRuleConfig {
            pattern: "[".to_string(),
            action: RuleAction::Block,
            case_insensitive: false,
            trim_start: false,
        });
        let ctx = AppContext::new(cfg, None);
        let store = ctx.build_store().await.unwrap();

        assert!(matches!(
            ctx.build_launcher(store),
            Err(CliError::Config(_))
        ));
    }
}
