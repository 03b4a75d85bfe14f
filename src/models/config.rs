//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;
use regex::Regex;
use reqwest::header::{HeaderName, HeaderValue};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Messages, Target};
use crate::utils::retry::{Backoff, RetryPolicy};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and retry behavior
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Fingerprint persistence
    #[serde(default)]
    pub state: StateConfig,

    /// Text normalization before hashing
    #[serde(default)]
    pub normalize: NormalizeConfig,

    /// Event rendering and delivery
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Notification templates
    #[serde(default)]
    pub messages: Messages,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Monitored pages, checked in this order
    #[serde(default)]
    pub targets: Vec<Target>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    ///
    /// Everything a cycle relies on is checked here so that a bad value
    /// aborts the run before any target is fetched.
    pub fn validate(&self) -> Result<()> {
        self.fetch.validate()?;
        self.normalize.validate()?;
        self.messages.validate()?;

        if self.state.path.as_os_str().is_empty() {
            return Err(AppError::validation("state.path is empty"));
        }
        if self.notify.utc_offset().is_none() {
            return Err(AppError::validation(
                "notify.utc_offset_minutes must be within ±24h",
            ));
        }
        if self.targets.is_empty() {
            return Err(AppError::validation("No targets defined"));
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            validate_target(target)?;
            if !seen.insert(target.id()) {
                return Err(AppError::validation(format!(
                    "Duplicate target url: {}",
                    target.url
                )));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            state: StateConfig::default(),
            normalize: NormalizeConfig::default(),
            notify: NotifyConfig::default(),
            messages: Messages::default(),
            logging: LoggingConfig::default(),
            targets: defaults::targets(),
        }
    }
}

fn validate_target(target: &Target) -> Result<()> {
    let url = Url::parse(&target.url)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::validation(format!(
            "Target url must be http(s): {}",
            target.url
        )));
    }
    if let Some(referer) = &target.policy.referer {
        Url::parse(referer)?;
    }
    for (name, value) in &target.policy.headers {
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            AppError::validation(format!("Invalid header name '{name}' for {}: {e}", target.url))
        })?;
        HeaderValue::from_str(value).map_err(|e| {
            AppError::validation(format!("Invalid value for header '{name}' on {}: {e}", target.url))
        })?;
    }
    if target.policy.insecure_tls {
        log::warn!(
            "Certificate validation is disabled for {}; its content is not authenticated",
            target.url
        );
    }
    Ok(())
}

/// Backoff shape between direct attempts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

/// HTTP client and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Accept-Language header for HTTP requests
    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,

    /// Total request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Connect timeout in seconds
    #[serde(default = "defaults::connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Direct attempts per target before giving up or falling back
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "defaults::backoff")]
    pub backoff: BackoffKind,

    /// Delay before the first retry in milliseconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,

    /// Upper bound for exponential delays in milliseconds
    #[serde(default = "defaults::max_retry_delay")]
    pub max_retry_delay_ms: u64,

    /// Targets fetched at the same time
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Read-through text extraction proxy; the target URL is appended to it
    #[serde(default)]
    pub fallback_proxy: Option<String>,
}

impl FetchConfig {
    /// Retry policy for direct attempts.
    pub fn retry_policy(&self) -> RetryPolicy {
        let base = Duration::from_millis(self.retry_delay_ms);
        let backoff = match self.backoff {
            BackoffKind::Fixed => Backoff::Fixed(base),
            BackoffKind::Exponential => Backoff::Exponential {
                base,
                max: Duration::from_millis(self.max_retry_delay_ms),
            },
        };
        RetryPolicy::new(self.max_attempts, backoff)
    }

    fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetch.user_agent is empty"));
        }
        HeaderValue::from_str(&self.user_agent)
            .map_err(|e| AppError::validation(format!("fetch.user_agent: {e}")))?;
        HeaderValue::from_str(&self.accept_language)
            .map_err(|e| AppError::validation(format!("fetch.accept_language: {e}")))?;
        if self.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(AppError::validation(
                "fetch.connect_timeout_secs must be > 0",
            ));
        }
        if self.max_attempts == 0 {
            return Err(AppError::validation("fetch.max_attempts must be > 0"));
        }
        if self.max_concurrent == 0 {
            return Err(AppError::validation("fetch.max_concurrent must be > 0"));
        }
        if let Some(proxy) = &self.fallback_proxy {
            Url::parse(proxy)?;
        }
        Ok(())
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            accept_language: defaults::accept_language(),
            timeout_secs: defaults::timeout(),
            connect_timeout_secs: defaults::connect_timeout(),
            max_attempts: defaults::max_attempts(),
            backoff: defaults::backoff(),
            retry_delay_ms: defaults::retry_delay(),
            max_retry_delay_ms: defaults::max_retry_delay(),
            max_concurrent: defaults::max_concurrent(),
            fallback_proxy: None,
        }
    }
}

/// When the fingerprint file is written.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    /// Once, after every target was processed
    End,
    /// After every store mutation, and again at the end
    Each,
}

/// Fingerprint persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// JSON file mapping target URL to fingerprint
    #[serde(default = "defaults::state_path")]
    pub path: PathBuf,

    /// Keep normalized-text snapshots for change excerpts
    #[serde(default = "defaults::snapshots")]
    pub snapshots: bool,

    /// Directory for the snapshots; an empty path disables them
    #[serde(default = "defaults::snapshot_dir")]
    pub snapshot_dir: Option<PathBuf>,

    #[serde(default = "defaults::save_mode")]
    pub save_mode: SaveMode,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: defaults::state_path(),
            snapshots: defaults::snapshots(),
            snapshot_dir: defaults::snapshot_dir(),
            save_mode: defaults::save_mode(),
        }
    }
}

impl StateConfig {
    /// Directory snapshots should be written to, if they are enabled.
    pub fn enabled_snapshot_dir(&self) -> Option<&Path> {
        if !self.snapshots {
            return None;
        }
        self.snapshot_dir
            .as_deref()
            .filter(|dir| !dir.as_os_str().is_empty())
    }
}

/// Text normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// CSS selectors whose subtrees never count as page text
    #[serde(default = "defaults::ignore_selectors")]
    pub ignore_selectors: Vec<String>,

    /// Regexes; matching text lines are dropped before hashing
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

impl NormalizeConfig {
    fn validate(&self) -> Result<()> {
        for s in &self.ignore_selectors {
            Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))?;
        }
        for p in &self.ignore_patterns {
            Regex::new(p)?;
        }
        Ok(())
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            ignore_selectors: defaults::ignore_selectors(),
            ignore_patterns: Vec::new(),
        }
    }
}

/// Event rendering and delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Offset applied to timestamps in rendered messages
    #[serde(default = "defaults::utc_offset_minutes")]
    pub utc_offset_minutes: i32,

    /// Append every event as a JSON line to this file
    #[serde(default)]
    pub events_file: Option<PathBuf>,

    /// Longest change excerpt placed in a message, in characters
    #[serde(default = "defaults::max_excerpt_chars")]
    pub max_excerpt_chars: usize,
}

impl NotifyConfig {
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: defaults::utc_offset_minutes(),
            events_file: None,
            max_excerpt_chars: defaults::max_excerpt_chars(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use super::{BackoffKind, SaveMode};
    use crate::models::Target;

    // Fetch defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0".into()
    }
    pub fn accept_language() -> String {
        "pt-BR,pt;q=0.9,en;q=0.8".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn connect_timeout() -> u64 {
        10
    }
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn backoff() -> BackoffKind {
        BackoffKind::Exponential
    }
    pub fn retry_delay() -> u64 {
        2_000
    }
    pub fn max_retry_delay() -> u64 {
        30_000
    }
    pub fn max_concurrent() -> usize {
        1
    }

    // State defaults
    pub fn state_path() -> PathBuf {
        PathBuf::from("data/hashes.json")
    }
    pub fn snapshots() -> bool {
        true
    }
    pub fn snapshot_dir() -> Option<PathBuf> {
        Some(PathBuf::from("data/snapshots"))
    }
    pub fn save_mode() -> SaveMode {
        SaveMode::End
    }

    // Normalization defaults
    pub fn ignore_selectors() -> Vec<String> {
        [
            "#cookie-banner",
            ".cookie-banner",
            "#cookie-consent",
            ".cookie-consent",
            ".cookie-notice",
            ".lgpd-banner",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    // Notification defaults
    pub fn utc_offset_minutes() -> i32 {
        -180
    }
    pub fn max_excerpt_chars() -> usize {
        3_500
    }

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn targets() -> Vec<Target> {
        vec![
            Target::new(
                "https://www.camarasjc.sp.gov.br/a-camara/concurso-publico.php",
                "Câmara de São José dos Campos - Concurso Público",
            ),
            Target::new(
                "https://www.cacapava.sp.gov.br/publicacoes/concursos-publicos/concurso-publico-012024",
                "Prefeitura de Caçapava - Concurso Público 01/2024",
            ),
        ]
    }
}
