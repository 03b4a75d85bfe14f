// src/pipeline/detect.rs

//! The change detector: one check cycle over the configured targets.
//!
//! Per target:
//!
//! ```text
//! fetch ──failed──▶ FetchFailed            (store untouched)
//!   │
//!   ▼
//! fingerprint ──no record──▶ FirstObservation  (put)
//!   │
//!   ├──equal──▶ Unchanged
//!   └──differs──▶ Changed                     (put)
//! ```
//!
//! Fetches may overlap up to `max_concurrent`, but results are consumed in
//! target order on this task, which is the only writer of the store.

use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::models::{CycleReport, DetectionEvent, Observation, SaveMode, Target};
use crate::pipeline::diff::calculate_diff;
use crate::services::fetcher::{FetchResult, PageSource};
use crate::services::fingerprint::{Fingerprinter, PageText};
use crate::services::notifier::Notifier;
use crate::storage::{FingerprintStore, SnapshotStore};
use crate::utils::clock::{Clock, SystemClock};

/// Drives check cycles.
pub struct ChangeDetector<S, C = SystemClock> {
    source: S,
    fingerprinter: Fingerprinter,
    clock: C,
    snapshots: Option<SnapshotStore>,
    save_mode: SaveMode,
    max_concurrent: usize,
}

impl<S: PageSource> ChangeDetector<S, SystemClock> {
    /// Create a detector using the wall clock, sequential fetches, one save per cycle.
    pub fn new(source: S, fingerprinter: Fingerprinter) -> Self {
        Self {
            source,
            fingerprinter,
            clock: SystemClock,
            snapshots: None,
            save_mode: SaveMode::End,
            max_concurrent: 1,
        }
    }
}

impl<S: PageSource, C: Clock> ChangeDetector<S, C> {
    /// Replace the time source.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> ChangeDetector<S, C2> {
        ChangeDetector {
            source: self.source,
            fingerprinter: self.fingerprinter,
            clock,
            snapshots: self.snapshots,
            save_mode: self.save_mode,
            max_concurrent: self.max_concurrent,
        }
    }

    /// Keep normalized text so changes can be reported line by line.
    pub fn with_snapshots(mut self, snapshots: Option<SnapshotStore>) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn with_save_mode(mut self, save_mode: SaveMode) -> Self {
        self.save_mode = save_mode;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Check every target once, emit one event per target, then save the store.
    ///
    /// Per-target problems never abort the cycle. Errors returned here are
    /// an empty target list (before anything runs) or a failed final save
    /// (after every event was delivered).
    pub async fn run_cycle(
        &self,
        targets: &[Target],
        store: &mut FingerprintStore,
        notifier: &Notifier,
    ) -> Result<CycleReport> {
        if targets.is_empty() {
            return Err(AppError::config("No targets to check"));
        }

        let started_at = self.clock.now();
        let mut events = Vec::with_capacity(targets.len());

        let mut fetches = stream::iter(targets)
            .map(|target| async move { (target, self.source.fetch(target).await) })
            .buffered(self.max_concurrent);

        while let Some((target, result)) = fetches.next().await {
            let event = self.observe(target, result, store).await;
            log::debug!("{}: {}", target.url, event.observation.label());
            notifier.dispatch(&event).await;
            events.push(event);
        }

        store.save().await?;

        Ok(CycleReport {
            started_at,
            finished_at: self.clock.now(),
            events,
        })
    }

    /// Turn one fetch result into an event, updating the store on success.
    async fn observe(
        &self,
        target: &Target,
        result: FetchResult,
        store: &mut FingerprintStore,
    ) -> DetectionEvent {
        let page = match result {
            Ok(page) => page,
            Err(failure) => {
                log::warn!("Fetch failed for {}: {}", target.url, failure);
                return DetectionEvent::new(
                    target,
                    self.clock.now(),
                    false,
                    Observation::FetchFailed { failure },
                );
            }
        };

        let text = self.fingerprinter.page_text(&page.body);
        let observation = match store.get(target.id()) {
            None => Observation::FirstObservation {
                fingerprint: text.fingerprint.clone(),
            },
            Some(previous) if previous == text.fingerprint => Observation::Unchanged,
            Some(previous) => Observation::Changed {
                previous: previous.to_string(),
                current: text.fingerprint.clone(),
                added_lines: self.added_lines(target, &text).await,
            },
        };

        if !matches!(observation, Observation::Unchanged) {
            store.put(target.id(), text.fingerprint.as_str());
            if self.save_mode == SaveMode::Each {
                if let Err(e) = store.save().await {
                    log::error!("Failed to save fingerprints after {}: {}", target.url, e);
                }
            }
        }
        self.save_snapshot(target, &text).await;

        DetectionEvent::new(target, self.clock.now(), page.via_fallback, observation)
    }

    async fn added_lines(&self, target: &Target, text: &PageText) -> Vec<String> {
        let Some(snapshots) = &self.snapshots else {
            return Vec::new();
        };
        let Some(previous) = snapshots.read(target.id()).await else {
            return Vec::new();
        };

        let diff = calculate_diff(&previous, &text.text);
        if diff.has_changes() {
            log::debug!(
                "{}: {} line(s) differ ({} added, {} removed)",
                target.url,
                diff.change_count(),
                diff.added.len(),
                diff.removed.len()
            );
        } else {
            log::debug!("{}: text changed without line-level differences", target.url);
        }
        diff.added
    }

    async fn save_snapshot(&self, target: &Target, text: &PageText) {
        if let Some(snapshots) = &self.snapshots {
            if let Err(e) = snapshots.write(target.id(), &text.text).await {
                log::warn!("Failed to save snapshot for {}: {}", target.url, e);
            }
        }
    }
}
