// src/services/notifier.rs

//! Event delivery.
//!
//! The detector hands every [`DetectionEvent`] to a [`Notifier`], which fans
//! it out to each configured [`NotificationSink`]. A sink failing never stops
//! the others or the cycle; the error is logged and counted.

use std::fmt::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::FixedOffset;
use regex::{Captures, Regex};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Config, DetectionEvent, Messages, Observation};
use crate::utils::text::truncate_graphemes;

/// A consumer of detection events.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Name used in delivery error logs.
    fn name(&self) -> &str;

    async fn deliver(&self, event: &DetectionEvent) -> Result<()>;
}

/// Renders events into human-readable text using the message templates.
#[derive(Debug, Clone)]
pub struct MessageRenderer {
    messages: Messages,
    offset: FixedOffset,
    max_excerpt_chars: usize,
    placeholder: Regex,
}

impl MessageRenderer {
    pub fn new(messages: Messages, offset: FixedOffset, max_excerpt_chars: usize) -> Result<Self> {
        Ok(Self {
            messages,
            offset,
            max_excerpt_chars,
            placeholder: Regex::new(r"\{(\w+)\}")?,
        })
    }

    /// Build a renderer from the application configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let offset = config.notify.utc_offset().ok_or_else(|| {
            AppError::config(format!(
                "invalid utc offset: {} minutes",
                config.notify.utc_offset_minutes
            ))
        })?;
        Self::new(
            config.messages.clone(),
            offset,
            config.notify.max_excerpt_chars,
        )
    }

    /// Fill the template for the event's kind.
    ///
    /// Placeholders are substituted in one pass, so values taken from the
    /// page or an error message are inserted verbatim. Unknown placeholders
    /// are left as written.
    pub fn render(&self, event: &DetectionEvent) -> String {
        let m = &self.messages;
        let template = match &event.observation {
            Observation::FirstObservation { .. } => &m.first_observation,
            Observation::Unchanged => &m.unchanged,
            Observation::Changed { .. } => &m.changed,
            Observation::FetchFailed { .. } => &m.fetch_failed,
        };

        self.placeholder
            .replace_all(template, |caps: &Captures| {
                self.value(event, &caps[1])
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    fn value(&self, event: &DetectionEvent, key: &str) -> Option<String> {
        let m = &self.messages;
        match (key, &event.observation) {
            ("name", _) => Some(event.display_name.clone()),
            ("url", _) => Some(event.target_id.clone()),
            ("time", _) => Some(self.format_time(event)),
            ("fallback", _) if event.via_fallback => Some(m.fallback_note.clone()),
            ("fallback", _) => Some(String::new()),
            ("added", Observation::Changed { added_lines, .. }) => Some(self.excerpt(added_lines)),
            ("kind", Observation::FetchFailed { failure }) => Some(failure.kind.as_str().to_string()),
            ("reason", Observation::FetchFailed { failure }) => Some(failure.reason.clone()),
            _ => None,
        }
    }

    fn format_time(&self, event: &DetectionEvent) -> String {
        let local = event.timestamp.with_timezone(&self.offset);
        let mut time = String::new();
        if write!(time, "{}", local.format(&self.messages.time_format)).is_err() {
            log::warn!(
                "Cannot render time with format {:?}, using RFC 3339",
                self.messages.time_format
            );
            return local.to_rfc3339();
        }
        time
    }

    fn excerpt(&self, added_lines: &[String]) -> String {
        if added_lines.is_empty() {
            return self.messages.changed_without_excerpt.clone();
        }
        truncate_graphemes(&added_lines.join("\n"), self.max_excerpt_chars)
    }
}

/// Writes rendered messages to the log.
pub struct LogSink {
    renderer: MessageRenderer,
}

impl LogSink {
    pub fn new(renderer: MessageRenderer) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, event: &DetectionEvent) -> Result<()> {
        let message = self.renderer.render(event);
        match event.observation {
            Observation::FetchFailed { .. } => log::error!("{message}"),
            Observation::Changed { .. } => log::warn!("{message}"),
            _ => log::info!("{message}"),
        }
        Ok(())
    }
}

/// Appends each event as one JSON line, for an external deliverer to pick up.
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl NotificationSink for JsonlSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn deliver(&self, event: &DetectionEvent) -> Result<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Fan-out over every configured sink.
#[derive(Default)]
pub struct Notifier {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    pub fn with_sink(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Standard sinks for a configuration: the log, plus the events file if set.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut notifier = Self::new().with_sink(LogSink::new(MessageRenderer::from_config(config)?));
        if let Some(path) = &config.notify.events_file {
            notifier = notifier.with_sink(JsonlSink::new(path));
        }
        Ok(notifier)
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Deliver to every sink; returns how many deliveries failed.
    pub async fn dispatch(&self, event: &DetectionEvent) -> usize {
        let mut failures = 0;
        for sink in &self.sinks {
            if let Err(e) = sink.deliver(event).await {
                failures += 1;
                log::error!(
                    "Failed to deliver {} event for {} via {}: {}",
                    event.observation.label(),
                    event.target_id,
                    sink.name(),
                    e
                );
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use tempfile::TempDir;

    use super::*;
    use crate::error::FetchFailure;
    use crate::models::Target;

    fn event(observation: Observation, via_fallback: bool) -> DetectionEvent {
        let timestamp = DateTime::parse_from_rfc3339("2025-03-01T15:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        DetectionEvent::new(
            &Target::new("https://example.gov/concurso", "Concurso"),
            timestamp,
            via_fallback,
            observation,
        )
    }

    fn renderer() -> MessageRenderer {
        MessageRenderer::from_config(&Config::default()).unwrap()
    }

    #[test]
    fn test_render_changed_with_excerpt_and_local_time() {
        let text = renderer().render(&event(
            Observation::Changed {
                previous: "a".into(),
                current: "b".into(),
                added_lines: vec!["Convocação 2ª chamada".into(), "Anexo II".into()],
            },
            false,
        ));

        assert!(text.contains("Update detected on Concurso!"));
        assert!(text.contains("https://example.gov/concurso"));
        assert!(text.contains("Convocação 2ª chamada\nAnexo II"));
        assert!(text.contains("01/03/2025 12:30:00"));
    }

    #[test]
    fn test_render_changed_without_excerpt() {
        let text = renderer().render(&event(
            Observation::Changed {
                previous: "a".into(),
                current: "b".into(),
                added_lines: vec![],
            },
            false,
        ));
        assert!(text.contains("(the page text changed)"));
    }

    #[test]
    fn test_render_failure_and_fallback_note() {
        let failed = renderer().render(&event(
            Observation::FetchFailed {
                failure: FetchFailure::blocked("HTTP 403 Forbidden"),
            },
            false,
        ));
        assert!(failed.contains("[blocked]: HTTP 403 Forbidden"));

        let first = renderer().render(&event(
            Observation::FirstObservation {
                fingerprint: "ab".into(),
            },
            true,
        ));
        assert!(first.contains("baseline saved (via fallback)"));
    }

    #[test]
    fn test_page_text_placeholders_are_not_expanded() {
        let text = renderer().render(&event(
            Observation::Changed {
                previous: "a".into(),
                current: "b".into(),
                added_lines: vec!["Envie para {url} até {time}".into()],
            },
            false,
        ));
        assert!(text.contains("Envie para {url} até {time}"));
        assert!(text.contains("https://example.gov/concurso\n"));

        let failed = renderer().render(&event(
            Observation::FetchFailed {
                failure: FetchFailure::transport("proxy said {name}{fallback}"),
            },
            true,
        ));
        assert!(failed.contains("proxy said {name}{fallback}"));
    }

    #[test]
    fn test_unknown_placeholder_is_left_in_place() {
        let mut config = Config::default();
        config.messages.unchanged = "{name}: {status} {added}".into();
        let text = MessageRenderer::from_config(&config)
            .unwrap()
            .render(&event(Observation::Unchanged, false));
        assert_eq!(text, "Concurso: {status} {added}");
    }

    #[test]
    fn test_unrenderable_time_format_falls_back_to_rfc3339() {
        let mut config = Config::default();
        config.messages.time_format = "%Q".into();
        let text = MessageRenderer::from_config(&config)
            .unwrap()
            .render(&event(
                Observation::FirstObservation {
                    fingerprint: "ab".into(),
                },
                false,
            ));
        assert!(text.contains("2025-03-01T12:30:00-03:00"));
    }

    #[test]
    fn test_excerpt_is_truncated() {
        let mut config = Config::default();
        config.notify.max_excerpt_chars = 5;
        let text = MessageRenderer::from_config(&config)
            .unwrap()
            .render(&event(
                Observation::Changed {
                    previous: "a".into(),
                    current: "b".into(),
                    added_lines: vec!["Homologação final".into()],
                },
                false,
            ));
        assert!(text.contains("Homol…"));
        assert!(!text.contains("Homologação"));
    }

    #[tokio::test]
    async fn test_jsonl_sink_appends_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out/events.jsonl");
        let sink = JsonlSink::new(&path);

        sink.deliver(&event(Observation::Unchanged, false)).await.unwrap();
        sink.deliver(&event(Observation::Unchanged, true)).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["kind"], "unchanged");
        assert_eq!(second["via_fallback"], true);
    }

    struct BrokenSink;

    #[async_trait]
    impl NotificationSink for BrokenSink {
        fn name(&self) -> &str {
            "broken"
        }

        async fn deliver(&self, _event: &DetectionEvent) -> Result<()> {
            Err(AppError::delivery("broken", "chat API unreachable"))
        }
    }

    #[tokio::test]
    async fn test_dispatch_counts_failures_and_continues() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("events.jsonl");
        let notifier = Notifier::new()
            .with_sink(BrokenSink)
            .with_sink(JsonlSink::new(&path));

        let failures = notifier.dispatch(&event(Observation::Unchanged, false)).await;
        assert_eq!(failures, 1);
        assert_eq!(notifier.sink_count(), 2);
        assert!(std::fs::read_to_string(&path).unwrap().contains("unchanged"));
    }

    #[test]
    fn test_from_config_adds_events_sink() {
        let mut config = Config::default();
        assert_eq!(Notifier::from_config(&config).unwrap().sink_count(), 1);
        config.notify.events_file = Some("events.jsonl".into());
        assert_eq!(Notifier::from_config(&config).unwrap().sink_count(), 2);
    }
}
