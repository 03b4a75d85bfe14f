// src/models/messages.rs

//! Notification message templates.

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Templates for the human-readable notification text.
///
/// Supported placeholders:
/// - `{name}`, `{url}`, `{time}`, `{fallback}` in every template
/// - `{added}` in `changed`
/// - `{kind}`, `{reason}` in `fetch_failed`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Messages {
    #[serde(default = "defaults::first_observation")]
    pub first_observation: String,

    #[serde(default = "defaults::unchanged")]
    pub unchanged: String,

    #[serde(default = "defaults::changed")]
    pub changed: String,

    /// Used for `{added}` when no line-level excerpt is available
    #[serde(default = "defaults::changed_without_excerpt")]
    pub changed_without_excerpt: String,

    #[serde(default = "defaults::fetch_failed")]
    pub fetch_failed: String,

    /// Substituted for `{fallback}` when content came from the fallback proxy
    #[serde(default = "defaults::fallback_note")]
    pub fallback_note: String,

    /// chrono format string for `{time}`
    #[serde(default = "defaults::time_format")]
    pub time_format: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            first_observation: defaults::first_observation(),
            unchanged: defaults::unchanged(),
            changed: defaults::changed(),
            changed_without_excerpt: defaults::changed_without_excerpt(),
            fetch_failed: defaults::fetch_failed(),
            fallback_note: defaults::fallback_note(),
            time_format: defaults::time_format(),
        }
    }
}

impl Messages {
    /// Reject a `time_format` chrono cannot render.
    pub fn validate(&self) -> Result<()> {
        if StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(AppError::validation(format!(
                "messages.time_format is not a valid strftime format: {}",
                self.time_format
            )));
        }
        Ok(())
    }
}

mod defaults {
    pub fn first_observation() -> String {
        "🧩 First check of {name} ({url}): baseline saved{fallback}.\n📅 {time}".into()
    }
    pub fn unchanged() -> String {
        "✅ No changes on {name}{fallback}.".into()
    }
    pub fn changed() -> String {
        "🆕 Update detected on {name}{fallback}!\n{url}\n\n{added}\n\n📅 {time}".into()
    }
    pub fn changed_without_excerpt() -> String {
        "(the page text changed)".into()
    }
    pub fn fetch_failed() -> String {
        "🚨 Could not access {name} ({url}) [{kind}]: {reason}\n📅 {time}".into()
    }
    pub fn fallback_note() -> String {
        " (via fallback)".into()
    }
    pub fn time_format() -> String {
        "%d/%m/%Y %H:%M:%S".into()
    }
}
