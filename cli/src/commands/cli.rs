use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "jobwatch", version, about = "Run long tasks in the background and watch their output")]
pub struct Args {
    /// Config file (default: ~/.jobwatch/config.toml, then ./config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    /// Overrides `http_server.host`.
    #[arg(long)]
    pub host: Option<String>,

    /// Overrides `http_server.port`.
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct LaunchArgs {
    /// Task name from the `[tasks]` catalog.
    pub task: String,

    /// Extra arguments appended after the task's configured arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct StatusArgs {
    pub task_id: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct WatchArgs {
    pub task_id: String,

    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u64,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct WorkerArgs {
    #[arg(long)]
    pub task_id: String,

    /// Program and arguments, after `--`.
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the launch/poll HTTP API.
    Serve(ServeArgs),
    /// Launch a task and print its id.
    Launch(LaunchArgs),
    /// Print a task's current status as JSON.
    Status(StatusArgs),
    /// Follow a task's output until it finishes.
    Watch(WatchArgs),
    #[command(hide = true)]
    Worker(WorkerArgs),
}
