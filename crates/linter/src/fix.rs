//! Applying fixes to source text.
//!
//! Fixes are ordered by start offset (discovery order breaks ties) and the
//! output is rebuilt in one forward pass over the original text, so every
//! range refers to the text the engine saw. A fix that overlaps one already
//! accepted, or whose range is not valid for the source, is skipped and
//! reported as a conflict.
use crate::diagnostics::{Fix, LintIssue, OffsetRange};
use serde::Serialize;
use std::fmt;

/// Why a fix was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictReason {
    /// Overlaps a fix that was already accepted
    Overlap { with: OffsetRange },
    /// Ends past the end of the source
    OutOfBounds,
    /// Starts after it ends
    Inverted,
    /// Splits a multi-byte character
    NotCharBoundary,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overlap { with } => write!(f, "overlaps the fix at {with}"),
            Self::OutOfBounds => f.write_str("range is outside the source"),
            Self::Inverted => f.write_str("range starts after it ends"),
            Self::NotCharBoundary => f.write_str("range splits a character"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixConflict {
    /// Position of the rejected fix in the input slice
    pub index: usize,
    pub rule_id: String,
    pub range: OffsetRange,
    pub reason: ConflictReason,
}

/// The result of applying fixes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixOutcome {
    pub output: String,
    /// Number of fixes applied
    pub applied: usize,
    pub conflicts: Vec<FixConflict>,
}

impl FixOutcome {
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Apply the fixes carried by `issues` to `source`
#[tracing::instrument(skip_all, fields(size = source.len()))]
pub fn apply_fixes<'a>(source: &str, issues: impl IntoIterator<Item = &'a LintIssue>) -> FixOutcome {
    let fixes: Vec<(&str, &Fix)> = issues
        .into_iter()
        .filter_map(|issue| issue.fix.as_ref().map(|fix| (issue.rule_id.as_str(), fix)))
        .collect();
    apply_edits(source, &fixes)
}

/// Apply `(rule_id, fix)` pairs to `source`
pub fn apply_edits(source: &str, fixes: &[(&str, &Fix)]) -> FixOutcome {
    let mut ordered: Vec<(usize, &(&str, &Fix))> = fixes.iter().enumerate().collect();
    ordered.sort_by_key(|(_, (_, fix))| (fix.range.start, fix.range.end));

    let mut output = String::with_capacity(source.len());
    let mut cursor = 0;
    let mut last_accepted: Option<OffsetRange> = None;
    let mut applied = 0;
    let mut conflicts = Vec::new();

    for &(index, &(rule_id, fix)) in &ordered {
        let range = fix.range;
        let rejected = if range.start > range.end {
            Some(ConflictReason::Inverted)
        } else if range.end > source.len() {
            Some(ConflictReason::OutOfBounds)
        } else if !source.is_char_boundary(range.start) || !source.is_char_boundary(range.end) {
            Some(ConflictReason::NotCharBoundary)
        } else {
            last_accepted
                .filter(|prev| range.start < prev.end)
                .map(|prev| ConflictReason::Overlap { with: prev })
        };

        if let Some(reason) = rejected {
            tracing::debug!(rule = rule_id, %range, %reason, "Skipping fix");
            conflicts.push(FixConflict {
                index,
                rule_id: rule_id.to_string(),
                range,
                reason,
            });
            continue;
        }

        output.push_str(&source[cursor..range.start]);
        output.push_str(&fix.replacement);
        cursor = range.end;
        last_accepted = Some(range);
        applied += 1;
    }
    output.push_str(&source[cursor..]);

    if !conflicts.is_empty() {
        tracing::warn!(count = conflicts.len(), "Some fixes were not applied");
    }

    FixOutcome {
        output,
        applied,
        conflicts,
    }
}
