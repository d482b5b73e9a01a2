use crate::error::LintError;
use lualint_syntax::{Node, Tag};
use serde::Serialize;

/// A resolved source position. All fields are 0-indexed; `offset` is a byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl SourcePosition {
    #[must_use]
    pub const fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }

    /// 1-indexed line for display
    #[must_use]
    pub const fn display_line(&self) -> usize {
        self.line + 1
    }

    /// 1-indexed column for display
    #[must_use]
    pub const fn display_column(&self) -> usize {
        self.column + 1
    }
}

/// A resolved `start..end` range in a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SourceRange {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceRange {
    #[must_use]
    pub const fn new(start: SourcePosition, end: SourcePosition) -> Self {
        Self { start, end }
    }

    /// The byte offsets covered by this range
    #[must_use]
    pub const fn offsets(&self) -> OffsetRange {
        OffsetRange::new(self.start.offset, self.end.offset)
    }
}

/// Byte offset range in a file, start-inclusive and end-exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct OffsetRange {
    pub start: usize,
    pub end: usize,
}

impl std::fmt::Display for OffsetRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl OffsetRange {
    /// Create a new offset range
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Create a zero-width range at an offset
    #[must_use]
    pub const fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether two ranges share at least one byte, or an insertion falls strictly inside the other
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A text replacement that resolves an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fix {
    /// Byte range in the original source
    pub range: OffsetRange,
    /// The text to replace the range with (empty string means deletion)
    pub replacement: String,
}

impl Fix {
    /// Replace `start..end` with `replacement`
    #[must_use]
    pub fn replace(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            range: OffsetRange::new(start, end),
            replacement: replacement.into(),
        }
    }

    /// Create a deletion fix (replace range with empty string)
    #[must_use]
    pub fn delete(start: usize, end: usize) -> Self {
        Self {
            range: OffsetRange::new(start, end),
            replacement: String::new(),
        }
    }

    /// Create an insertion fix (insert text at position)
    #[must_use]
    pub fn insert(position: usize, text: impl Into<String>) -> Self {
        Self {
            range: OffsetRange::at(position),
            replacement: text.into(),
        }
    }
}

/// Lint severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    #[default]
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// An issue as reported by a rule from inside a listener.
///
/// The engine resolves the range: an explicit `range` wins, otherwise the
/// location of `node` is used. An issue with neither is dropped and recorded
/// as a rule error.
#[derive(Debug, Clone)]
pub struct RuleIssue<'n> {
    pub node: Option<&'n Node>,
    pub message: String,
    pub range: Option<SourceRange>,
    pub fix: Option<Fix>,
}

impl<'n> RuleIssue<'n> {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            node: None,
            message: message.into(),
            range: None,
            fix: None,
        }
    }

    /// Create an issue located at `node`
    #[must_use]
    pub fn at(node: &'n Node, message: impl Into<String>) -> Self {
        Self::new(message).with_node(node)
    }

    #[must_use]
    pub const fn with_node(mut self, node: &'n Node) -> Self {
        self.node = Some(node);
        self
    }

    #[must_use]
    pub const fn with_range(mut self, range: SourceRange) -> Self {
        self.range = Some(range);
        self
    }

    #[must_use]
    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fix = Some(fix);
        self
    }
}

/// An issue recorded in a [`LintResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintIssue {
    /// Id of the reporting rule (e.g., `"no_empty_block"`)
    pub rule_id: String,
    /// Human-readable message
    pub message: String,
    /// Severity configured for the reporting rule
    pub severity: Severity,
    /// Tag of the offending node, when the issue was reported against one
    pub node_tag: Option<Tag>,
    pub range: SourceRange,
    /// Optional auto-fix for this issue
    pub fix: Option<Fix>,
}

impl LintIssue {
    /// Returns true if this issue has an auto-fix available
    #[must_use]
    pub const fn has_fix(&self) -> bool {
        self.fix.is_some()
    }
}

/// Counters collected while linting one file
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LintStats {
    /// Rules whose listener map was built for this file
    pub rules_executed: usize,
    pub nodes_visited: usize,
    pub issues_found: usize,
    pub fixable_issues: usize,
    pub execution_time_ms: f64,
}

/// The output of linting one file
#[derive(Debug, Clone, Default, Serialize)]
pub struct LintResult {
    pub filename: String,
    /// Issues in traversal order
    pub issues: Vec<LintIssue>,
    /// Engine and rule failures
    pub errors: Vec<LintError>,
    pub stats: LintStats,
}

impl LintResult {
    #[must_use]
    pub fn empty(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    /// Issues that carry a fix, in traversal order
    pub fn fixable(&self) -> impl Iterator<Item = &LintIssue> {
        self.issues.iter().filter(|issue| issue.has_fix())
    }

    /// Count of issues at `severity`
    #[must_use]
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }

    /// Some rules failed while others ran to completion
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty()
    }

    /// No issues and no errors
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty() && self.errors.is_empty()
    }
}
