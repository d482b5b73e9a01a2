use crate::files::write_file;
use lualint_linter::{apply_edits, Fix, FixConflict, LintError, LintIssue, LintResult, OffsetRange};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

/// One fix that was (or would be) applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedFix {
    pub rule: String,
    pub message: String,
    pub range: OffsetRange,
}

/// Fixes for one file
#[derive(Debug, Clone, Serialize)]
pub struct FileFixes {
    pub applied: Vec<PlannedFix>,
    pub conflicts: Vec<FixConflict>,
    /// The fixed text was written back to disk
    pub written: bool,
}

/// Fixes computed for one file, not yet written
pub struct FixPlan {
    pub fixes: FileFixes,
    pub output: String,
    /// Indices into the linted issues whose fix made it into `output`
    applied_issues: Vec<usize>,
}

/// Apply the fixes in `result` to `source` in memory.
///
/// Returns `None` when no issue carries a fix.
pub fn plan(source: &str, result: &LintResult) -> Option<FixPlan> {
    let fixable: Vec<(usize, &LintIssue, &Fix)> = result
        .issues
        .iter()
        .enumerate()
        .filter_map(|(index, issue)| issue.fix.as_ref().map(|fix| (index, issue, fix)))
        .collect();
    if fixable.is_empty() {
        return None;
    }

    let edits: Vec<(&str, &Fix)> = fixable
        .iter()
        .map(|(_, issue, fix)| (issue.rule_id.as_str(), *fix))
        .collect();
    let outcome = apply_edits(source, &edits);

    let rejected: HashSet<usize> = outcome.conflicts.iter().map(|c| c.index).collect();
    let mut applied = Vec::with_capacity(outcome.applied);
    let mut applied_issues = Vec::with_capacity(outcome.applied);
    for (position, (index, issue, fix)) in fixable.into_iter().enumerate() {
        if rejected.contains(&position) {
            continue;
        }
        applied_issues.push(index);
        applied.push(PlannedFix {
            rule: issue.rule_id.clone(),
            message: issue.message.clone(),
            range: fix.range,
        });
    }

    Some(FixPlan {
        fixes: FileFixes {
            applied,
            conflicts: outcome.conflicts,
            written: false,
        },
        output: outcome.output,
        applied_issues,
    })
}

/// Write a plan to `path` and drop the fixed issues from `result`.
///
/// The issue counters in `result.stats` are recomputed for what remains.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn write(path: &Path, plan: FixPlan, result: &mut LintResult) -> Result<FileFixes, LintError> {
    write_file(path, &plan.output)?;
    tracing::warn!("Source rewritten; its sidecar tree is stale until regenerated");

    let fixed: HashSet<usize> = plan.applied_issues.into_iter().collect();
    let issues = std::mem::take(&mut result.issues);
    result.issues = issues
        .into_iter()
        .enumerate()
        .filter(|(index, _)| !fixed.contains(index))
        .map(|(_, issue)| issue)
        .collect();
    result.stats.issues_found = result.issues.len();
    result.stats.fixable_issues = result.fixable().count();

    Ok(FileFixes {
        written: true,
        ..plan.fixes
    })
}
