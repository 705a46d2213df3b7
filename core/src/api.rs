//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `jobwatch_core::api` instead of reaching into internal modules.

pub use crate::config::{
    get_jobwatch_data_dir, load_default, load_from_path, resolve_config_path, AppConfig,
    FilterConfig, FilterRuleConfig, HttpServerConfig, LoggingConfig, PublisherConfig,
    RedisStoreConfig, RuleAction, SqliteStoreConfig, StoreConfig, StoreProvider, TaskSpec,
};
pub use crate::error::{CliError, LaunchError, SpawnError, StoreError, WorkerError};
pub use crate::filter::{build_rules, FilterFault, FilterOutput, FilterSink, LineRule, RuleSet};
pub use crate::launcher::{Launcher, ProcessSpawner, WorkerSpawner, WORKER_SUBCOMMAND};
pub use crate::publisher::{
    BatchedPublisher, ErrorReporter, TextSink, TOO_LARGE_FALLBACK_OUTPUT, TRUNCATION_MARKER,
};
pub use crate::reader::{Poll, StatusReader};
pub use crate::store::{decode_record, encode_record, PutOutcome, StatusStore};
pub use crate::task::{resolve_task, split_arguments, TaskDescriptor, TaskId, TaskStatus};
pub use crate::worker::{run_worker, WorkerOutcome, WorkerRequest, WorkerSettings};
