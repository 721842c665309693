//! Coursewatch development CLI
//!
//! Inspects and clears the durable snapshot mirror the watchers keep on
//! disk, and shows the configuration the engine would run with.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use coursewatch::WatchConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cmd;

#[derive(Parser)]
#[command(name = "dev")]
#[command(about = "Coursewatch development CLI")]
#[command(version)]
struct Cli {
    /// Snapshot directory (defaults to SNAPSHOT_DIR, then "snapshots")
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and clear durable resource snapshots
    #[command(subcommand)]
    Snapshots(cmd::snapshots::SnapshotsCommand),

    /// Show the effective engine configuration
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Surface library warnings (corrupt snapshots and the like) unless
    // the caller filters them out.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,coursewatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = WatchConfig::from_env().context("Failed to load configuration")?;
    let dir = cli.dir.unwrap_or_else(|| config.snapshot_dir.clone());

    match cli.command {
        Commands::Snapshots(command) => cmd::snapshots::run(&dir, command).await,
        Commands::Config => print_config(&config, &dir),
    }
}

fn print_config(config: &WatchConfig, dir: &Path) -> Result<()> {
    println!("{}", "Effective configuration".bright_cyan().bold());
    println!();
    println!("  snapshot dir          {}", dir.display());
    println!(
        "  announcement poll     {}s",
        config.announcement_interval.as_secs()
    );
    println!("  grade poll            {}s", config.grade_interval.as_secs());
    println!("  inbox poll            {}s", config.inbox_interval.as_secs());
    println!(
        "  announcement window   {}h",
        config.announcement_window.num_hours()
    );
    println!("  event bus capacity    {}", config.bus_capacity);
    Ok(())
}
