#[allow(clippy::module_inception)]
pub mod error;
pub mod launch;
pub mod store;
pub mod worker;

pub use error::CliError;
pub use launch::{LaunchError, SpawnError};
pub use store::StoreError;
pub use worker::WorkerError;
