//! Pipeline entry points.
//!
//! - `run_check`: one check cycle over the configured targets
//! - `ChangeDetector`: the per-target fetch → fingerprint → compare loop

pub mod check;
pub mod detect;
pub mod diff;

pub use check::run_check;
pub use detect::ChangeDetector;
pub use diff::{LineDiff, calculate_diff};
