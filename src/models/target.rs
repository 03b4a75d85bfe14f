// src/models/target.rs

//! Monitored pages and their fetch policy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single monitored web page.
///
/// The URL doubles as the key into the fingerprint store, so changing it in
/// the configuration starts a fresh baseline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Target {
    /// Page address
    pub url: String,

    /// Human-readable name used in notifications (defaults to the URL)
    #[serde(default)]
    pub name: String,

    /// How the page is fetched
    #[serde(flatten)]
    pub policy: FetchPolicy,
}

impl Target {
    /// Create a target with the default fetch policy.
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            policy: FetchPolicy::default(),
        }
    }

    /// Stable identifier used as the store key.
    pub fn id(&self) -> &str {
        &self.url
    }

    /// Name shown to humans, falling back to the URL when unnamed.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.url
        } else {
            &self.name
        }
    }
}

/// Per-target fetch behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Skip TLS certificate validation.
    ///
    /// Only for hosts with a known-broken certificate chain: the content of
    /// such a page can be tampered with in transit without detection.
    #[serde(default)]
    pub insecure_tls: bool,

    /// Extra request headers sent with every direct attempt
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Referer header for direct attempts
    #[serde(default)]
    pub referer: Option<String>,

    /// Allow the fallback proxy when direct retrieval is blocked
    #[serde(default = "default_fallback")]
    pub fallback: bool,
}

fn default_fallback() -> bool {
    true
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            insecure_tls: false,
            headers: BTreeMap::new(),
            referer: None,
            fallback: default_fallback(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_url() {
        let target = Target::new("https://example.gov/a", "  ");
        assert_eq!(target.display_name(), "https://example.gov/a");

        let named = Target::new("https://example.gov/a", "Câmara");
        assert_eq!(named.display_name(), "Câmara");
    }

    #[test]
    fn test_policy_fields_flatten_from_toml() {
        let target: Target = toml::from_str(
            r#"
            url = "https://example.gov/concurso"
            name = "Concurso"
            insecure_tls = true
            referer = "https://example.gov/"

            [headers]
            Accept = "text/html"
            "#,
        )
        .unwrap();

        assert!(target.policy.insecure_tls);
        assert!(target.policy.fallback);
        assert_eq!(target.policy.referer.as_deref(), Some("https://example.gov/"));
        assert_eq!(target.policy.headers.get("Accept").unwrap(), "text/html");
    }
}
