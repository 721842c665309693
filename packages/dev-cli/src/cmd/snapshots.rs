//! Snapshot inspection and cleanup commands.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use clap::Subcommand;
use colored::Colorize;
use coursewatch::{FsBackend, ResourceKind, SnapshotBackend};

#[derive(Subcommand)]
pub enum SnapshotsCommand {
    /// List cached snapshots for every resource kind
    List,

    /// Pretty-print one cached snapshot
    Show {
        /// Resource kind: announcements, grades, or inbox
        kind: ResourceKind,

        /// Storage key as shown by `dev snapshots list` (e.g. 42_u7)
        scope: String,
    },

    /// Delete cached snapshots; the next tick re-seeds them silently
    Clear {
        /// Only clear this resource kind
        #[arg(short, long)]
        kind: Option<ResourceKind>,
    },
}

pub async fn run(dir: &Path, cmd: SnapshotsCommand) -> Result<()> {
    match cmd {
        SnapshotsCommand::List => list(dir).await,
        SnapshotsCommand::Show { kind, scope } => show(dir, kind, &scope).await,
        SnapshotsCommand::Clear { kind } => clear(dir, kind).await,
    }
}

async fn list(dir: &Path) -> Result<()> {
    println!("Snapshot directory: {}", dir.display().to_string().bold());

    let mut total = 0usize;
    for kind in ResourceKind::ALL {
        let backend = FsBackend::for_kind(dir, kind);
        let mut blobs = backend
            .read_all()
            .await
            .with_context(|| format!("Failed to read {kind} snapshots"))?;
        blobs.sort_by(|a, b| a.0.cmp(&b.0));

        println!();
        println!("{}", kind.to_string().bright_cyan().bold());
        if blobs.is_empty() {
            println!("  {}", "(none)".dimmed());
            continue;
        }

        for (stem, bytes) in &blobs {
            println!(
                "  {:<24} {:>5} items  {:>9}  {}",
                stem,
                item_count(bytes),
                format_size(bytes.len()),
                modified_at(&backend, stem).await.dimmed()
            );
        }
        total += blobs.len();
    }

    println!();
    println!("{} snapshot file(s)", total.to_string().bold());
    Ok(())
}

async fn show(dir: &Path, kind: ResourceKind, scope: &str) -> Result<()> {
    let backend = FsBackend::for_kind(dir, kind);
    let blobs = backend
        .read_all()
        .await
        .with_context(|| format!("Failed to read {kind} snapshots"))?;

    let Some((_, bytes)) = blobs.iter().find(|(stem, _)| stem == scope) else {
        let known: Vec<&str> = blobs.iter().map(|(stem, _)| stem.as_str()).collect();
        if known.is_empty() {
            bail!("no {kind} snapshots under {}", backend.root().display());
        }
        bail!(
            "no {kind} snapshot named {scope:?} (known: {})",
            known.join(", ")
        );
    };

    let value: serde_json::Value = serde_json::from_slice(bytes)
        .with_context(|| format!("snapshot {kind}:{scope} is not valid JSON"))?;

    println!(
        "{} {}  ({} items)",
        kind.to_string().bright_cyan().bold(),
        scope.bold(),
        value.as_array().map(Vec::len).unwrap_or(0)
    );
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn clear(dir: &Path, kind: Option<ResourceKind>) -> Result<()> {
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => ResourceKind::ALL.to_vec(),
    };

    let mut removed = 0usize;
    for kind in kinds {
        let backend = FsBackend::for_kind(dir, kind);
        removed += clear_kind(&backend)
            .await
            .with_context(|| format!("Failed to clear {kind} snapshots"))?;
    }

    if removed == 0 {
        println!("{}", "Nothing to clear.".yellow());
    } else {
        println!(
            "{} removed {} snapshot file(s); the next tick re-seeds them silently",
            "✓".green(),
            removed
        );
    }
    Ok(())
}

async fn clear_kind(backend: &FsBackend) -> Result<usize> {
    let blobs = backend.read_all().await?;
    for (key, _) in &blobs {
        backend.remove(key).await?;
    }
    Ok(blobs.len())
}

fn item_count(bytes: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(value) => value
            .as_array()
            .map(|items| items.len().to_string())
            .unwrap_or_else(|| "?".to_string()),
        Err(_) => "?".to_string(),
    }
}

async fn modified_at(backend: &FsBackend, stem: &str) -> String {
    let path = backend.root().join(format!("{stem}.json"));
    match tokio::fs::metadata(&path).await.and_then(|m| m.modified()) {
        Ok(time) => {
            let stamp: DateTime<Local> = time.into();
            stamp.format("%Y-%m-%d %H:%M").to_string()
        }
        Err(_) => String::new(),
    }
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    }
}
