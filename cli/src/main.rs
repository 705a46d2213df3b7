use clap::Parser;
use jobwatch_cli::app::AppContext;
use jobwatch_cli::commands::{cli, launch, status, worker};
use jobwatch_cli::http;
use jobwatch_core::api as core_api;
use jobwatch_core::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, error::CliError> {
    let args = cli::Args::parse();

    let config_path = core_api::resolve_config_path(args.config.as_deref())
        .map_err(|e| error::CliError::Config(e.to_string()))?
        .map(|p| std::fs::canonicalize(&p).unwrap_or(p));
    let cfg = core_api::load_from_path(config_path.as_deref())
        .map_err(|e| error::CliError::Config(e.to_string()))?;

    // Workers have no terminal; their logs go to a file only.
    let console_allowed = !matches!(args.command, cli::Commands::Worker(_));
    init_tracing(&cfg.logging, console_allowed).map_err(error::CliError::Command)?;

    let ctx = AppContext::new(cfg, config_path);
    dispatch(args.command, ctx).await
}

fn exit_code_for_error(e: &error::CliError) -> i32 {
    // 0: success
    // 3: task not found or expired (returned as a normal exit code)
    // 11: config error
    // 20: spawn / IO / command error
    // 50: status store or internal error
    match e {
        error::CliError::Config(_) => 11,
        error::CliError::Launch(le) => match le {
            error::LaunchError::Spawn { .. } => 20,
            error::LaunchError::Store(_) => 50,
        },
        error::CliError::Worker(_) => 20,
        error::CliError::Io(_) => 20,
        error::CliError::Command(_) => 20,
        error::CliError::Store(_) => 50,
        error::CliError::Anyhow(_) => 50,
    }
}

async fn dispatch(cmd: cli::Commands, ctx: AppContext) -> Result<i32, error::CliError> {
    match cmd {
        cli::Commands::Serve(serve_args) => {
            http::handle_serve(serve_args, &ctx).await?;
            Ok(0)
        }
        cli::Commands::Launch(launch_args) => launch::handle_launch(launch_args, &ctx).await,
        cli::Commands::Status(status_args) => status::handle_status(status_args, &ctx).await,
        cli::Commands::Watch(watch_args) => status::handle_watch(watch_args, &ctx).await,
        cli::Commands::Worker(worker_args) => worker::handle_worker(worker_args, &ctx).await,
    }
}

fn init_tracing(logging: &core_api::LoggingConfig, console_allowed: bool) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("jobwatch"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("jobwatch.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    let console = logging.console && console_allowed;
    if !console && maybe_writer.is_none() {
        if !console_allowed {
            // Worker with file logging off: run silent.
            return Ok(());
        }
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
