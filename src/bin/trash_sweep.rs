use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use survey_trash::db::{Filter, RetryingStore};
use survey_trash::{InMemoryStore, Sweeper, TrashConfig, TrashManager, TrashRecord};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("survey_trash=info".parse()?))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut snapshot_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut request_all = false;
    let mut watch_mode = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--snapshot" | "-s" => {
                if i + 1 < args.len() {
                    snapshot_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--request-all" => request_all = true,
            "--watch" => watch_mode = true,
            "--help" => {
                print_help();
                return Ok(());
            }
            other => warn!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    let Some(snapshot_path) = snapshot_path else {
        print_help();
        anyhow::bail!("--snapshot is required");
    };

    let config = match &config_path {
        Some(path) => TrashConfig::load(Some(path.as_path()))?,
        None => TrashConfig::from_env(),
    };
    let raw = fs::read_to_string(&snapshot_path)
        .with_context(|| format!("reading {}", snapshot_path.display()))?;
    let snapshot: serde_json::Value = serde_json::from_str(&raw)?;

    let store = Arc::new(RetryingStore::new(
        InMemoryStore::from_snapshot(&snapshot)?,
        config.store_retries,
        config.store_retry_delay(),
    ));
    let manager = Arc::new(TrashManager::new(store.clone(), &config));

    if request_all {
        let pending: Vec<TrashRecord> = manager
            .repository()
            .find(&Filter::by("stage", "initial"))
            .await?;
        let ids: Vec<String> = pending.into_iter().map(|r| r.id).collect();
        manager.request_clearing(&ids).await?;
    }

    let sweeper = Sweeper::new(Arc::clone(&manager), config.sweep_workers);

    if watch_mode {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(true);
            }
        });
        sweeper.run(config.sweep_interval(), rx).await;
    } else {
        let report = sweeper.sweep_once().await?;
        info!(
            "Report: {} cleared, {} failed, {} exhausted, {} busy",
            report.cleared.len(),
            report.failed.len(),
            report.exhausted.len(),
            report.busy.len()
        );
        for (id, reason) in &report.failed {
            warn!("Record {} failed: {}", id, reason);
        }
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    let out = serde_json::to_string_pretty(&store.inner().snapshot())?;
    fs::write(&snapshot_path, out)
        .with_context(|| format!("writing {}", snapshot_path.display()))?;
    info!("Snapshot written to {}", snapshot_path.display());

    Ok(())
}

fn print_help() {
    println!("trash-sweep: clear trashed survey data in a JSON store snapshot");
    println!();
    println!("USAGE:");
    println!("    trash-sweep --snapshot <FILE> [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -s, --snapshot <FILE>  Store snapshot, rewritten in place");
    println!("    -c, --config <FILE>    Config file (TRASH_* env vars override)");
    println!("    --request-all          Move every initial record to clearing first");
    println!("    --watch                Keep sweeping until Ctrl-C");
    println!("    --help                 Show this help");
}
