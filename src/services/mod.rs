//! Service layer for the watcher.
//!
//! This module contains the business logic for:
//! - Page retrieval with retries and fallback (`Fetcher`)
//! - Visible-text fingerprinting (`Fingerprinter`)
//! - Event delivery (`Notifier`)

pub mod fetcher;
pub mod fingerprint;
pub mod notifier;

pub use fetcher::{FetchResult, FetchedPage, Fetcher, PageSource};
pub use fingerprint::{Fingerprinter, PageText};
pub use notifier::{JsonlSink, LogSink, MessageRenderer, NotificationSink, Notifier};
