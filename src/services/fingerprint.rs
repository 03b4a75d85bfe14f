// src/services/fingerprint.rs

//! Page fingerprinting.
//!
//! A fingerprint is the SHA-256 of the page's visible text after
//! normalization, so markup churn (scripts, styles, attribute order,
//! indentation) never registers as a change.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::NormalizeConfig;
use crate::utils::text::normalize_whitespace;

/// Elements whose contents are never visible page text.
const SKIPPED_ELEMENTS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "iframe", "svg",
];

/// Elements whose text keeps its line breaks when rendered.
const PREFORMATTED_ELEMENTS: &[&str] = &["pre", "textarea", "listing", "plaintext"];

/// Normalized text plus its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// Visible text, one fragment per line
    pub text: String,
    /// Lowercase hex SHA-256 of `text`
    pub fingerprint: String,
}

/// Reduces raw page bodies to comparable fingerprints.
#[derive(Debug, Clone, Default)]
pub struct Fingerprinter {
    ignore_selectors: Vec<Selector>,
    ignore_patterns: Vec<Regex>,
}

impl Fingerprinter {
    /// Build a fingerprinter from normalization settings.
    pub fn new(config: &NormalizeConfig) -> Result<Self> {
        let ignore_selectors = config
            .ignore_selectors
            .iter()
            .map(|s| Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}"))))
            .collect::<Result<Vec<_>>>()?;
        let ignore_patterns = config
            .ignore_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            ignore_selectors,
            ignore_patterns,
        })
    }

    /// Extract and normalize the visible text of `body`.
    ///
    /// Bodies that do not start with markup (plain text or the markdown a
    /// read-through proxy returns) keep one line per source line.
    pub fn normalize(&self, body: &str) -> String {
        let mut fragments = Vec::new();
        if body.trim_start().starts_with('<') {
            let document = Html::parse_document(body);
            self.collect_text(document.root_element(), false, &mut fragments);
        } else {
            push_lines(body, true, &mut fragments);
        }

        fragments
            .into_iter()
            .filter(|line| !self.ignore_patterns.iter().any(|re| re.is_match(line)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Normalize `body` and hash the result.
    pub fn page_text(&self, body: &str) -> PageText {
        let text = self.normalize(body);
        let fingerprint = digest(&text);
        PageText { text, fingerprint }
    }

    /// Fingerprint of `body`.
    pub fn fingerprint(&self, body: &str) -> String {
        self.page_text(body).fingerprint
    }

    fn collect_text(&self, element: ElementRef<'_>, preformatted: bool, out: &mut Vec<String>) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                push_lines(text, preformatted, out);
            } else if let Some(child_element) = ElementRef::wrap(child) {
                if self.is_skipped(&child_element) {
                    continue;
                }
                let preformatted = preformatted
                    || PREFORMATTED_ELEMENTS.contains(&child_element.value().name());
                self.collect_text(child_element, preformatted, out);
            }
        }
    }

    fn is_skipped(&self, element: &ElementRef<'_>) -> bool {
        let name = element.value().name();
        SKIPPED_ELEMENTS.contains(&name)
            || self.ignore_selectors.iter().any(|sel| sel.matches(element))
    }
}

/// Push the non-empty, whitespace-collapsed lines of `text`. Without
/// `keep_breaks` the whole fragment collapses to one line.
fn push_lines(text: &str, keep_breaks: bool, out: &mut Vec<String>) {
    if keep_breaks {
        out.extend(
            text.lines()
                .map(normalize_whitespace)
                .filter(|line| !line.is_empty()),
        );
    } else {
        let line = normalize_whitespace(text);
        if !line.is_empty() {
            out.push(line);
        }
    }
}

/// Lowercase hex SHA-256 of `text`.
pub fn digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
