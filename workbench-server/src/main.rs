// workbench-server/src/main.rs

mod schema;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use rmcp::ServiceExt;
use server::WorkbenchServer;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use workbench_core::{ProcessRunner, Workbench, WorkbenchConfig, Workspace};

const CONFIG_FILENAME: &str = "Workbench.toml";

#[derive(Parser, Debug)]
#[command(author, version, about = "Serves workspace file, git and npm tools over MCP (stdio)")]
struct Args {
    /// Workspace root; every path the tools touch must be inside it.
    #[arg(long, env = "WORKBENCH_ROOT")]
    root: Option<PathBuf>,

    /// Path to Workbench.toml. Defaults to Workbench.toml in the working directory, if present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Logs go to stderr; stdout carries the protocol.
fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(Level::INFO.into()));

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file path {:?} has no file name", path))?;
            fs::create_dir_all(dir).with_context(|| format!("Failed to create log directory {:?}", dir))?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(guard)
}

fn load_config(explicit: Option<&Path>) -> Result<WorkbenchConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(CONFIG_FILENAME);
            if !default.is_file() {
                info!("No {} found; using defaults", CONFIG_FILENAME);
                return Ok(WorkbenchConfig::default());
            }
            default
        }
    };
    let content = fs::read_to_string(&path).with_context(|| format!("Failed to read config file {:?}", path))?;
    let config = WorkbenchConfig::from_toml_str(&content)
        .with_context(|| format!("Invalid configuration in {:?}", path))?;
    info!("Loaded configuration from {:?}", path);
    Ok(config)
}

/// CLI/env beats the config file, which beats the current directory.
fn resolve_root(cli_root: Option<PathBuf>, config: &WorkbenchConfig) -> Result<PathBuf> {
    let root = match cli_root.or_else(|| config.root.clone()) {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    let canonical = root
        .canonicalize()
        .with_context(|| format!("Workspace root {:?} does not exist", root))?;
    anyhow::ensure!(canonical.is_dir(), "Workspace root {:?} is not a directory", canonical);
    Ok(canonical)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let _guard = init_logging(args.log_file.as_deref())?;

    let config = load_config(args.config.as_deref())?;
    let root = resolve_root(args.root, &config)?;
    let workspace = Workspace::new(&root)?;
    let remote = config.remote_settings(|name| std::env::var(name).ok());
    if remote.repo_url.is_none() || remote.token.is_none() {
        info!(
            "Git credentials ({} / {}) not set; start_work will fail until they are",
            config.git.repo_url_env_var, config.git.token_env_var
        );
    }

    let runner = Arc::new(ProcessRunner::new(config.runner_limits()));
    let workbench = Workbench::new(runner, workspace, remote, &config);
    let server = WorkbenchServer::new(workbench);

    let ct = CancellationToken::new();
    let shutdown = ct.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received; shutting down");
            shutdown.cancel();
        }
    });

    info!("Starting workbench MCP server for {}", root.display());
    match server.serve_with_ct(rmcp::transport::stdio(), ct.clone()).await {
        Ok(running) => {
            let reason = running.waiting().await;
            info!(?reason, "Server loop ended");
        }
        Err(e) => error!("Server failed to start: {}", e),
    }
    ct.cancel();
    info!("Workbench MCP server stopped.");
    Ok(())
}
