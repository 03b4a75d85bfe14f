//! Line-level diff between two text snapshots.
//!
//! Used to put the newly published lines of a changed page into its
//! notification. Lines are compared as a set, so text that merely moved
//! up or down the page is not reported as new.

use std::collections::HashSet;

/// Lines that appeared or disappeared between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineDiff {
    /// Lines in the current text but not the previous one, in page order
    pub added: Vec<String>,
    /// Lines in the previous text but not the current one, in page order
    pub removed: Vec<String>,
}

impl LineDiff {
    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    /// Get the total number of changed lines.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len()
    }
}

/// Lines of `from` missing in `against`, each reported once, in order.
fn missing_lines(from: &str, against: &HashSet<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    from.lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !against.contains(line) && seen.insert(*line))
        .map(str::to_string)
        .collect()
}

/// Calculate the diff between previous and current snapshots.
pub fn calculate_diff(previous: &str, current: &str) -> LineDiff {
    let prev_lines: HashSet<&str> = previous.lines().collect();
    let curr_lines: HashSet<&str> = current.lines().collect();

    LineDiff {
        added: missing_lines(current, &prev_lines),
        removed: missing_lines(previous, &curr_lines),
    }
}
