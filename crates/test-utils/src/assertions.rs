//! Snapshot formatting for lint issues
//!
//! Issues are rendered one per line with a 1-based index so that insta
//! snapshots stay readable and diffs point at the issue that changed.

/// Format a list of issues using their `Debug` representation.
///
/// # Example
///
/// ```ignore
/// use lualint_test_utils::format_issues;
///
/// let result = linter.lint_file(&tree, source, "init.lua");
/// insta::assert_snapshot!(format_issues(&result.issues));
/// ```
pub fn format_issues<D: std::fmt::Debug>(issues: &[D]) -> String {
    if issues.is_empty() {
        return String::from("(no issues)");
    }

    issues
        .iter()
        .enumerate()
        .map(|(i, d)| format!("[{}] {d:?}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format pre-rendered issue lines (for example `"1:5 rule: message"`).
/// Useful when positions or messages matter but the full structure does not.
pub fn format_messages<T: AsRef<str>>(messages: &[T]) -> String {
    if messages.is_empty() {
        return String::from("(no issues)");
    }

    messages
        .iter()
        .enumerate()
        .map(|(i, m)| format!("[{}] {}", i + 1, m.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}
