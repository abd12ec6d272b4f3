// src/pipeline/diff.rs

//! Human-readable change summaries.
//!
//! The engine reports the shape of a change (lines added/removed), not a
//! full unified diff; callers that need one have both content snapshots in
//! the run result.

use std::collections::HashMap;

use crate::signature::ChangeClass;

/// Summarize one run's change for the result record.
pub fn summarize(class: ChangeClass, old: &str, new: &str) -> String {
    match class {
        ChangeClass::Unchanged => "No change".to_string(),
        ChangeClass::FirstSeen => {
            format!("First content captured ({} lines)", line_count(new))
        }
        ChangeClass::Changed => {
            let (added, removed) = line_delta(old, new);
            if added == 0 && removed == 0 {
                // Signature moved without textual change, e.g. rotated
                // transport hints.
                "Content changed (signature only)".to_string()
            } else {
                format!("Content changed: +{added}/-{removed} lines")
            }
        }
    }
}

fn line_count(text: &str) -> usize {
    text.lines().filter(|l| !l.trim().is_empty()).count()
}

/// Count lines present in one snapshot but not the other, as multisets.
fn line_delta(old: &str, new: &str) -> (usize, usize) {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for line in new.lines().filter(|l| !l.trim().is_empty()) {
        *counts.entry(line).or_default() += 1;
    }
    for line in old.lines().filter(|l| !l.trim().is_empty()) {
        *counts.entry(line).or_default() -= 1;
    }

    let mut added = 0usize;
    let mut removed = 0usize;
    for delta in counts.values() {
        if *delta > 0 {
            added += *delta as usize;
        } else {
            removed += (-delta) as usize;
        }
    }
    (added, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unchanged() {
        assert_eq!(summarize(ChangeClass::Unchanged, "a", "a"), "No change");
    }

    #[test]
    fn test_first_seen() {
        let summary = summarize(ChangeClass::FirstSeen, "", "Permit list A\nPermit list B");
        assert_eq!(summary, "First content captured (2 lines)");
    }

    #[test]
    fn test_changed_counts_lines() {
        let old = "Permit list A\nshared line";
        let new = "Permit list B\nshared line\nextra line";
        let summary = summarize(ChangeClass::Changed, old, new);
        assert_eq!(summary, "Content changed: +2/-1 lines");
    }

    #[test]
    fn test_signature_only_change() {
        let summary = summarize(ChangeClass::Changed, "same", "same");
        assert_eq!(summary, "Content changed (signature only)");
    }

    #[test]
    fn test_repeated_lines_counted_as_multiset() {
        let old = "dup\ndup";
        let new = "dup";
        let (added, removed) = line_delta(old, new);
        assert_eq!((added, removed), (0, 1));
    }
}
