use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use qwinit::bootstrap::{self, RunOutcome};
use qwinit::config::{Config, Settings};
use qwinit::probe::TokioSleeper;
use qwinit::quickwit::client::QuickwitClient;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Wait for Quickwit, then create its indexes and Kafka sources
#[derive(Parser, Debug)]
#[command(name = "qwinit", version, about, long_about = None)]
struct Args {
    /// Base URL of the Quickwit node
    #[arg(long, env = "TARGET_URL")]
    target_url: Option<String>,

    /// Readiness attempts before giving up
    #[arg(long, env = "MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Delay between readiness attempts
    #[arg(long, env = "RETRY_DELAY_SECONDS")]
    retry_delay_seconds: Option<u64>,

    /// Extra wait once the node reports ready
    #[arg(long, env = "SETTLE_DELAY_SECONDS")]
    settle_delay_seconds: Option<u64>,

    /// Pause between creation requests
    #[arg(long, env = "APPLY_PAUSE_MILLIS")]
    apply_pause_millis: Option<u64>,

    /// Timeout of each HTTP request
    #[arg(long, env = "REQUEST_TIMEOUT_SECONDS")]
    request_timeout_seconds: Option<u64>,

    /// Directory holding index definitions (.json, .yml, .yaml)
    #[arg(long, env = "INDEX_DEFINITIONS_DIR")]
    index_definitions_dir: Option<PathBuf>,

    /// Directory holding one sub-directory of source definitions per index
    #[arg(long, env = "SOURCE_DEFINITIONS_DIR")]
    source_definitions_dir: Option<PathBuf>,

    /// Config file (JSON or YAML)
    #[arg(long, env = "QWINIT_CONFIG")]
    config: Option<PathBuf>,

    /// List what would be created without creating anything
    #[arg(long)]
    dry_run: bool,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Also append logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl Args {
    /// Flags and environment variables as a config layer
    fn to_config(&self) -> Config {
        Config {
            target_url: self.target_url.clone(),
            max_retries: self.max_retries,
            retry_delay_seconds: self.retry_delay_seconds,
            settle_delay_seconds: self.settle_delay_seconds,
            apply_pause_millis: self.apply_pause_millis,
            request_timeout_seconds: self.request_timeout_seconds,
            index_definitions_dir: self.index_definitions_dir.clone(),
            source_definitions_dir: self.source_definitions_dir.clone(),
            health_endpoints: None,
            dry_run: self.dry_run.then_some(true),
        }
    }
}

fn setup_logging(level: LogLevel, log_file: Option<&PathBuf>) -> Result<Vec<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    let (stderr, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    let mut guards = vec![stderr_guard];

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let (file_writer, file_guard) = tracing_appender::non_blocking(file);
            guards.push(file_guard);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(stderr.and(file_writer))
                .with_ansi(false)
                .with_target(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(stderr)
                .with_target(false)
                .init();
        }
    }

    Ok(guards)
}

fn load_settings(args: &Args) -> Result<Settings> {
    let file_config = Config::load(args.config.as_deref())?;
    file_config.merge(args.to_config()).resolve()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guards = match setup_logging(args.log_level, args.log_file.as_ref()) {
        Ok(guards) => guards,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!("Invalid configuration: {:#}", err);
            return ExitCode::FAILURE;
        }
    };

    let client = match QuickwitClient::new(settings.target_url.clone(), settings.request_timeout) {
        Ok(client) => client,
        Err(err) => {
            tracing::error!("{:#}", err);
            return ExitCode::FAILURE;
        }
    };

    let outcome = bootstrap::run(&client, &TokioSleeper, &settings).await;
    match &outcome {
        RunOutcome::Done(_) => tracing::info!("Bootstrap complete"),
        RunOutcome::TimedOut(timeout) => tracing::error!("Bootstrap aborted: {}", timeout),
        RunOutcome::IndexFailed(_) => tracing::error!("Bootstrap aborted: index creation failed"),
        RunOutcome::NoUsableIndexDefinitions(_) => {
            tracing::error!("Bootstrap aborted: no usable index definitions")
        }
    }

    ExitCode::from(outcome.exit_code())
}
