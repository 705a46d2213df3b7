use std::path::{Path, PathBuf};

use super::types::{AppConfig, StoreProvider};

/// Get the default jobwatch data directory: ~/.jobwatch
pub fn get_jobwatch_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".jobwatch"))
}

/// First existing config file in priority order: explicit path,
/// ~/.jobwatch/config.toml, ./config.toml.
pub fn resolve_config_path(explicit: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(p) = explicit {
        if !p.exists() {
            anyhow::bail!("config file not found: {}", p.display());
        }
        return Ok(Some(p.to_path_buf()));
    }

    let home_config = get_jobwatch_data_dir()?.join("config.toml");
    if home_config.exists() {
        return Ok(Some(home_config));
    }

    let local_config = Path::new("config.toml");
    if local_config.exists() {
        return Ok(Some(local_config.to_path_buf()));
    }

    Ok(None)
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    load_from_path(None)
}

/// Load, fill path defaults, apply `JOBWATCH_*` overrides and validate.
pub fn load_from_path(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    let mut cfg = match resolve_config_path(explicit)? {
        Some(path) => {
            let s = std::fs::read_to_string(&path)?;
            toml::from_str::<AppConfig>(&s)
                .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?
        }
        None => AppConfig::default(),
    };

    let data_dir = get_jobwatch_data_dir()?;

    if let StoreProvider::Sqlite(ref mut sqlite) = cfg.store.provider {
        if sqlite.path.trim().is_empty() {
            std::fs::create_dir_all(&data_dir)?;
            sqlite.path = data_dir.join("status.db").to_string_lossy().to_string();
        }
    }

    if cfg
        .logging
        .directory
        .as_ref()
        .map(|s| s.trim().is_empty())
        .unwrap_or(true)
    {
        let logs_dir = data_dir.join("logs");
        std::fs::create_dir_all(&logs_dir)?;
        cfg.logging.directory = Some(logs_dir.to_string_lossy().to_string());
    }

    apply_env_overrides(&mut cfg)?;
    cfg.validate()?;
    Ok(cfg)
}

fn apply_env_overrides(cfg: &mut AppConfig) -> anyhow::Result<()> {
    if let Some(v) = env_value("JOBWATCH_STORE_PATH") {
        match cfg.store.provider {
            StoreProvider::Sqlite(ref mut sqlite) => sqlite.path = v,
            StoreProvider::Redis(_) => {
                tracing::warn!("JOBWATCH_STORE_PATH ignored: store provider is redis");
            }
        }
    }
    if let Some(v) = env_value("JOBWATCH_REDIS_URL") {
        match cfg.store.provider {
            StoreProvider::Redis(ref mut redis) => redis.url = v,
            StoreProvider::Sqlite(_) => {
                tracing::warn!("JOBWATCH_REDIS_URL ignored: store provider is sqlite");
            }
        }
    }
    if let Some(v) = env_value("JOBWATCH_FLUSH_BYTES") {
        cfg.publisher.flush_bytes = parse_env("JOBWATCH_FLUSH_BYTES", &v)?;
    }
    if let Some(v) = env_value("JOBWATCH_FLUSH_INTERVAL_MS") {
        cfg.publisher.flush_interval_ms = parse_env("JOBWATCH_FLUSH_INTERVAL_MS", &v)?;
    }
    if let Some(v) = env_value("JOBWATCH_MAX_OUTPUT_BYTES") {
        cfg.publisher.max_output_bytes = parse_env("JOBWATCH_MAX_OUTPUT_BYTES", &v)?;
    }
    if let Some(v) = env_value("JOBWATCH_TTL_SECS") {
        cfg.store.ttl_secs = parse_env("JOBWATCH_TTL_SECS", &v)?;
    }
    Ok(())
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| anyhow::anyhow!("invalid {key}={raw}: {e}"))
}
