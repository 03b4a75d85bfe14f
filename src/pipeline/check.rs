// src/pipeline/check.rs

//! Check cycle entry point.

use crate::error::Result;
use crate::models::{Config, CycleReport};
use crate::pipeline::detect::ChangeDetector;
use crate::services::{Fetcher, Fingerprinter, Notifier};
use crate::storage::{FingerprintStore, SnapshotStore};

/// Run one check cycle over every configured target.
pub async fn run_check(config: &Config) -> Result<CycleReport> {
    config.validate()?;

    log::info!("Checking {} target(s)", config.targets.len());

    let fetcher = Fetcher::new(&config.fetch)?;
    let fingerprinter = Fingerprinter::new(&config.normalize)?;
    let notifier = Notifier::from_config(config)?;

    let snapshots = config.state.enabled_snapshot_dir().map(SnapshotStore::new);
    match &snapshots {
        Some(store) => log::debug!("Text snapshots kept in {}", store.dir().display()),
        None => log::debug!("Text snapshots disabled"),
    }

    let detector = ChangeDetector::new(fetcher, fingerprinter)
        .with_snapshots(snapshots)
        .with_save_mode(config.state.save_mode)
        .with_max_concurrent(config.fetch.max_concurrent);

    let mut store = FingerprintStore::load(&config.state.path).await;
    let report = detector
        .run_cycle(&config.targets, &mut store, &notifier)
        .await?;

    log::info!(
        "Cycle complete: {} new, {} changed, {} unchanged, {} failed ({}s)",
        report.first_observations(),
        report.changed(),
        report.unchanged(),
        report.failed(),
        (report.finished_at - report.started_at).num_seconds()
    );
    log::info!("Fingerprints saved to {}", store.path().display());

    Ok(report)
}
