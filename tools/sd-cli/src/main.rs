//! sd-cli: command-line client for the support directory.
//!
//! Keeps the session in a state directory between invocations, so
//! `sd-cli login` followed by `sd-cli whoami` behaves like a page reload in
//! the browser client.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use sd_session::{ExpiryHandler, FileStorage, ReqwestTransport, SessionConfig, SessionService};

use crate::commands::CliNavigator;

/// Default state directory when neither `--state-dir` nor `SD_STATE_DIR` is set.
const DEFAULT_STATE_DIR: &str = ".sd-session";

/// Support directory command-line client
#[derive(Parser, Debug)]
#[command(name = "sd-cli", version)]
#[command(about = "Sign in to the support directory and browse it from the terminal")]
struct Args {
    /// API root URL (overrides SD_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory holding the persisted session (overrides SD_STATE_DIR)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `sd_session=trace`
    #[arg(long, global = true, env = "SD_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SD_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "SD_PASSWORD", hide_env_values = true)]
        password: String,
        /// Defaults to --password
        #[arg(long)]
        confirm_password: Option<String>,
        #[arg(long, default_value = "")]
        city: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami {
        /// Re-read the profile from the server first
        #[arg(long)]
        refresh: bool,
    },
    /// Show the session state machine snapshot
    Status,
    /// Change profile fields; omitted fields keep their current value
    UpdateProfile {
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// Check whether a view path would render or redirect
    Access { path: String },
    /// List services
    Services {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// List categories
    Categories,
    /// Check the API is up
    Health,
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}

fn build_config(args: &Args) -> anyhow::Result<SessionConfig> {
    let mut config = SessionConfig::from_env();
    if let Some(url) = &args.api_url {
        config.api_base_url = url.clone();
    }
    if let Some(dir) = &args.state_dir {
        config.state_dir = Some(dir.clone());
    }
    if config.state_dir.is_none() {
        config.state_dir = Some(PathBuf::from(DEFAULT_STATE_DIR));
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let config = build_config(&args)?;
    let state_dir = config
        .state_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));

    let transport = Arc::new(ReqwestTransport::new(&config)?);
    let storage = Arc::new(
        FileStorage::open(&state_dir)
            .with_context(|| format!("cannot open state directory {}", state_dir.display()))?,
    );
    debug!(state_dir = %state_dir.display(), api = %config.api_base_url, "Starting sd-cli");
    let service = SessionService::new(config, transport, storage);
    let mut expiry = ExpiryHandler::new(service.subscribe(), Arc::new(CliNavigator));

    service.initialize();
    let result = commands::run(&service, args.command).await;

    expiry.drain_pending();
    result
}
