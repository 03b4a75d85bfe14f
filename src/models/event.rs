// src/models/event.rs

//! Observation results and the events emitted for them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchFailure;
use crate::models::Target;

/// Outcome of checking one target in one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    /// No prior fingerprint existed; this one is now the baseline.
    FirstObservation { fingerprint: String },

    /// The fingerprint matches the stored one.
    Unchanged,

    /// The fingerprint differs from the stored one.
    Changed {
        previous: String,
        current: String,
        /// Lines new since the last snapshot (empty without snapshots)
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        added_lines: Vec<String>,
    },

    /// Content could not be obtained after retries and fallback.
    FetchFailed { failure: FetchFailure },
}

impl Observation {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Observation::FirstObservation { .. } => "first_observation",
            Observation::Unchanged => "unchanged",
            Observation::Changed { .. } => "changed",
            Observation::FetchFailed { .. } => "fetch_failed",
        }
    }
}

/// An observation tagged with the target and the time it was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub target_id: String,
    pub display_name: String,
    pub timestamp: DateTime<Utc>,
    /// Content came from the fallback proxy instead of the page itself
    #[serde(default)]
    pub via_fallback: bool,
    #[serde(flatten)]
    pub observation: Observation,
}

impl DetectionEvent {
    pub fn new(
        target: &Target,
        timestamp: DateTime<Utc>,
        via_fallback: bool,
        observation: Observation,
    ) -> Self {
        Self {
            target_id: target.id().to_string(),
            display_name: target.display_name().to_string(),
            timestamp,
            via_fallback,
            observation,
        }
    }
}

/// Summary of one check cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Events in target order
    pub events: Vec<DetectionEvent>,
}

impl CycleReport {
    fn count(&self, label: &str) -> usize {
        self.events
            .iter()
            .filter(|e| e.observation.label() == label)
            .count()
    }

    pub fn first_observations(&self) -> usize {
        self.count("first_observation")
    }

    pub fn unchanged(&self) -> usize {
        self.count("unchanged")
    }

    pub fn changed(&self) -> usize {
        self.count("changed")
    }

    pub fn failed(&self) -> usize {
        self.count("fetch_failed")
    }

    /// Whether anything worth a human's attention happened.
    pub fn has_changes(&self) -> bool {
        self.changed() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_flat_with_kind_tag() {
        let target = Target::new("https://example.gov/page", "Page");
        let event = DetectionEvent::new(
            &target,
            DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            false,
            Observation::Changed {
                previous: "aa".into(),
                current: "bb".into(),
                added_lines: vec!["Edital nº 2".into()],
            },
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "changed");
        assert_eq!(json["target_id"], "https://example.gov/page");
        assert_eq!(json["previous"], "aa");
        assert_eq!(json["added_lines"][0], "Edital nº 2");
    }

    #[test]
    fn test_fetch_failed_carries_failure_kind() {
        let observation = Observation::FetchFailed {
            failure: FetchFailure::blocked("HTTP 403"),
        };
        let json = serde_json::to_value(&observation).unwrap();
        assert_eq!(json["kind"], "fetch_failed");
        assert_eq!(json["failure"]["kind"], "blocked");
        assert_eq!(json["failure"]["reason"], "HTTP 403");
    }
}
