//! # CostByte: AI worker runtime
//!
//! Runs the worker roster in the background: dispatcher, heartbeat monitor
//! and telemetry recorder, until Ctrl-C.
//!
//! Usage:
//!   costbyte                              # Run with ~/.costbyte/config.toml
//!   costbyte --config ./costbyte.toml     # Custom config
//!   costbyte --once --status              # One cycle of every loop, print roster
//!   costbyte --print-config               # Dump the effective config
//!   costbyte --init-config                # Write the default config file
//!   costbyte --enable MailBot             # Override `enabled = false` in config
//!
//! Exits non-zero if a loop stops on a fatal error.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use costbyte_core::traits::{Clock, LogSink, SystemClock};
use costbyte_core::CostByteConfig;
use costbyte_scheduler::{MemorySink, SqliteSink, WorkerRuntime};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "costbyte",
    version,
    about = "🤖 CostByte: AI worker runtime with heartbeat recovery"
)]
struct Cli {
    /// Config file (defaults to ~/.costbyte/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Run one cycle of every loop and exit
    #[arg(long)]
    once: bool,

    /// Print the roster status as JSON (with --once)
    #[arg(long)]
    status: bool,

    /// Print the effective config as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Write the default config to ~/.costbyte/config.toml and exit
    #[arg(long)]
    init_config: bool,

    /// Start with these workers disabled (repeatable)
    #[arg(long = "disable", value_name = "WORKER")]
    disabled: Vec<String>,

    /// Start these workers even if the config disables them (repeatable)
    #[arg(long = "enable", value_name = "WORKER")]
    enabled: Vec<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

fn init_logging(cli: &Cli) {
    let filter = if cli.verbose {
        "costbyte=debug,costbyte_scheduler=debug,costbyte_capabilities=debug"
    } else {
        "costbyte=info,costbyte_scheduler=info,costbyte_capabilities=info"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<CostByteConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = expand_path(path);
            CostByteConfig::load_from(Path::new(&path)).with_context(|| format!("loading {path}"))?
        }
        None => CostByteConfig::load()?,
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// SQLite at the configured path; in-memory ring buffers if it cannot be opened.
fn open_sink(config: &CostByteConfig) -> Arc<dyn LogSink> {
    let db_path = expand_path(&config.database.path);
    match SqliteSink::open(Path::new(&db_path)) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            tracing::warn!("⚠️ Could not open log database {db_path}: {e}; logging to memory only");
            Arc::new(MemorySink::new())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli);

    if cli.init_config {
        let path = CostByteConfig::default_path();
        if path.exists() {
            println!("⚠️  Config already exists: {}", path.display());
        } else {
            CostByteConfig::default().save()?;
            println!("✅ Default config written to {}", path.display());
        }
        return Ok(());
    }

    let config = load_config(&cli)?;

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    tracing::info!("🤖 {} v{}", config.project_name, config.version);

    let registry = costbyte_capabilities::default_registry(&config);
    let sink = open_sink(&config);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let runtime = WorkerRuntime::new(&config, registry, sink, clock)?;

    let roster = runtime.roster();
    for name in &cli.disabled {
        if !roster.disable(name).await {
            tracing::warn!("⚠️ --disable {name}: no such worker");
        }
    }
    for name in &cli.enabled {
        if !roster.enable(name).await {
            tracing::warn!("⚠️ --enable {name}: no such worker");
        }
    }

    if cli.once {
        let summary = runtime.run_once().await;
        tracing::info!(
            "✅ One cycle done: {}/{} tasks ok, {} recovered, {} samples",
            summary.dispatch.succeeded,
            summary.dispatch.attempted,
            summary.health.recovered.len(),
            summary.telemetry.written
        );
        if cli.status {
            println!("{}", serde_json::to_string_pretty(&runtime.status().await)?);
        }
        return Ok(());
    }

    let mut handle = runtime.start();
    let exited = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("waiting for Ctrl-C")?;
            None
        }
        exit = handle.first_exit() => Some(exit),
    };

    match exited {
        None => {
            tracing::info!("👋 Shutdown requested, finishing current cycles...");
            handle.stop().await?;
            Ok(())
        }
        Some((name, outcome)) => {
            tracing::error!("❌ {name} loop is down, stopping the runtime");
            if let Err(e) = handle.stop().await {
                tracing::error!("❌ Shutdown after {name} exit: {e}");
            }
            outcome.with_context(|| format!("{name} loop stopped"))?;
            anyhow::bail!("{name} loop exited unexpectedly")
        }
    }
}
