use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bytes kept free below the store item limit for the key, the JSON framing
/// and the `finished` flag.
pub const RECORD_OVERHEAD_RESERVE: usize = 10 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub publisher: PublisherConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub http_server: HttpServerConfig,

    /// Launchable tasks keyed by name.
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskSpec>,
}

impl AppConfig {
    /// Rejects threshold combinations that could push a record past the
    /// store's per-item limit.
    pub fn validate(&self) -> anyhow::Result<()> {
        let p = &self.publisher;
        if p.flush_bytes == 0 {
            anyhow::bail!("publisher.flush_bytes must be greater than zero");
        }
        if p.flush_interval_ms == 0 {
            anyhow::bail!("publisher.flush_interval_ms must be greater than zero");
        }
        if p.max_output_bytes < 1024 || p.max_error_bytes < 1024 {
            anyhow::bail!("publisher.max_output_bytes and max_error_bytes must be at least 1024");
        }
        let needed = p
            .max_output_bytes
            .saturating_add(p.max_error_bytes)
            .saturating_add(RECORD_OVERHEAD_RESERVE);
        if needed > self.store.item_size_limit {
            anyhow::bail!(
                "publisher caps ({} + {} bytes) plus {} bytes overhead exceed store.item_size_limit ({})",
                p.max_output_bytes,
                p.max_error_bytes,
                RECORD_OVERHEAD_RESERVE,
                self.store.item_size_limit
            );
        }
        if self.store.ttl_secs == 0 {
            anyhow::bail!("store.ttl_secs must be greater than zero");
        }
        for (name, spec) in &self.tasks {
            if spec.program.trim().is_empty() {
                anyhow::bail!("tasks.{name}.program is empty");
            }
        }
        crate::filter::build_rules(&self.filter)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "jobwatch_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Flush once this many unflushed bytes have accumulated.
    #[serde(default = "default_flush_bytes")]
    pub flush_bytes: usize,

    /// Flush pending bytes once this much time has passed since the last flush.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Cap on the `output` field, measured as JSON-encoded bytes.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Cap on the `error` field, measured as JSON-encoded bytes.
    #[serde(default = "default_max_error_bytes")]
    pub max_error_bytes: usize,
}

fn default_flush_bytes() -> usize {
    4 * 1024
}

fn default_flush_interval_ms() -> u64 {
    2_000
}

fn default_max_output_bytes() -> usize {
    960 * 1024
}

fn default_max_error_bytes() -> usize {
    32 * 1024
}

impl PublisherConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            flush_bytes: default_flush_bytes(),
            flush_interval_ms: default_flush_interval_ms(),
            max_output_bytes: default_max_output_bytes(),
            max_error_bytes: default_max_error_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(flatten)]
    pub provider: StoreProvider,

    /// Hard per-record size limit of the backing store, in bytes.
    #[serde(default = "default_item_size_limit")]
    pub item_size_limit: usize,

    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider")]
pub enum StoreProvider {
    #[serde(rename = "sqlite")]
    Sqlite(SqliteStoreConfig),
    #[serde(rename = "redis")]
    Redis(RedisStoreConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Database file. Empty means `<data dir>/status.db`.
    #[serde(default)]
    pub path: String,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisStoreConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,

    #[serde(default = "default_redis_prefix")]
    pub key_prefix: String,
}

fn default_item_size_limit() -> usize {
    1024 * 1024
}

fn default_ttl_secs() -> u64 {
    3_600
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_redis_prefix() -> String {
    "jobwatch".to_string()
}

impl StoreConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: StoreProvider::Sqlite(SqliteStoreConfig::default()),
            item_size_limit: default_item_size_limit(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_redis_prefix(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Suppress the matching line.
    Drop,
    /// Suppress the matching line and the indented lines that follow it.
    Block,
    /// Forward the matching line and stop evaluating rules.
    Pass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRuleConfig {
    pub pattern: String,
    pub action: RuleAction,
    #[serde(default = "default_case_insensitive")]
    pub case_insensitive: bool,
    /// Match against the line with leading whitespace removed.
    #[serde(default)]
    pub trim_start: bool,
}

fn default_case_insensitive() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_filter_enabled")]
    pub enabled: bool,

    #[serde(default = "default_filter_rules")]
    pub rules: Vec<FilterRuleConfig>,
}

fn default_filter_enabled() -> bool {
    true
}

fn default_filter_rules() -> Vec<FilterRuleConfig> {
    vec![
        FilterRuleConfig {
            pattern: r"(\r.*\|.*\|.*%|\r.*Downloading|\r.*Progress|.*\|\s*\d+%)".to_string(),
            action: RuleAction::Drop,
            case_insensitive: true,
            trim_start: false,
        },
        FilterRuleConfig {
            pattern: r"^(SELECT|INSERT|UPDATE|DELETE|FROM|WHERE|ORDER BY|LIMIT|Status for)\b"
                .to_string(),
            action: RuleAction::Block,
            case_insensitive: true,
            trim_start: true,
        },
    ]
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: default_filter_enabled(),
            rules: default_filter_rules(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8080
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_http_host(),
            port: default_http_port(),
        }
    }
}

/// A catalog entry: the program to run and the arguments placed before the
/// caller's own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fit_under_item_limit() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_caps_above_item_limit() {
        let mut cfg = AppConfig::default();
        cfg.publisher.max_output_bytes = cfg.store.item_size_limit;
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("item_size_limit"), "{err}");
    }

    #[test]
    fn rejects_invalid_filter_pattern() {
        let mut cfg = AppConfig::default();
        cfg.filter.rules.push(FilterRuleConfig {
            pattern: "(unclosed".to_string(),
            action: RuleAction::Drop,
            case_insensitive: true,
            trim_start: false,
        });
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("(unclosed"), "{err}");

        cfg.filter.enabled = false;
        cfg.validate().unwrap();
    }

    #[test]
    fn parses_sections_from_toml() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [publisher]
            flush_bytes = 5000
            max_output_bytes = 100000

            [store]
            provider = "redis"
            url = "redis://cache:6379"
            ttl_secs = 60

            [tasks.reindex]
            program = "/usr/local/bin/reindex"
            args = ["--all"]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.publisher.flush_bytes, 5000);
        assert_eq!(cfg.publisher.flush_interval_ms, 2_000);
        match &cfg.store.provider {
            StoreProvider::Redis(r) => {
                assert_eq!(r.url, "redis://cache:6379");
                assert_eq!(r.key_prefix, "jobwatch");
            }
            other => panic!("unexpected provider {other:?}"),
        }
        assert_eq!(cfg.store.ttl_secs, 60);
        assert_eq!(cfg.tasks["reindex"].args, vec!["--all".to_string()]);
        assert_eq!(cfg.filter.rules.len(), 2);
    }
}
