use thiserror::Error;

use super::{LaunchError, StoreError, WorkerError};

#[derive(Error, Debug)]
pub enum CliError {
    #[error("launch failed: {0}")]
    Launch(#[from] LaunchError),
    #[error("worker failed: {0}")]
    Worker(#[from] WorkerError),
    #[error("status store error: {0}")]
    Store(#[from] StoreError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}
