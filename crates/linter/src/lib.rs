//! # lualint-linter
//!
//! A single-pass rule engine for Lua and Luau syntax trees.
//!
//! Rules are registered in a [`RuleRegistry`], which indexes them by the node
//! tags they listen to. A [`Linter`] walks a [`Tree`](lualint_syntax::Tree)
//! once per file, calling each rule's enter and exit listeners, and returns a
//! [`LintResult`] with issues, isolated rule errors, and statistics. Fixes
//! attached to issues are applied with [`apply_fixes`].
//!
//! ```rust
//! use lualint_linter::prelude::*;
//! use lualint_syntax::{Node, Position, Tag, Tree};
//!
//! let registry = RuleRegistry::with_builtin_rules().unwrap();
//! let source = "do end";
//! let tree = Tree::new(vec![Node::new(Tag::Do)
//!     .with_span(Position::new(0, 0), Position::new(0, 6))
//!     .with_child(
//!         "body",
//!         Node::new(Tag::Block).with_span(Position::new(0, 3), Position::new(0, 3)),
//!     )]);
//!
//! let result = Linter::new(&registry).lint_file(&tree, source, "init.lua");
//! assert_eq!(result.issues[0].rule_id, "no_empty_block");
//! ```

mod context;
mod diagnostics;
mod engine;
mod error;
mod fix;
mod line_index;
mod registry;
mod retry;
mod rule;
mod rules;

pub use context::RuleContext;
pub use diagnostics::{
    Fix, LintIssue, LintResult, LintStats, OffsetRange, RuleIssue, Severity, SourcePosition,
    SourceRange,
};
pub use engine::Linter;
pub use error::{ErrorContext, ErrorKind, LintError, Result};
pub use fix::{apply_edits, apply_fixes, ConflictReason, FixConflict, FixOutcome};
pub use line_index::LineIndex;
pub use registry::{builtin_rule_ids, builtin_rules, RegisteredRule, RegistryError, RuleRegistry};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use rule::{
    validate_listener_map, validate_rule, validate_rule_manifest, Category, CreateContext,
    Fixable, Listener, ListenerFn, ListenerMap, Rule, RuleMeta, ValidationError,
};
pub use rules::{
    MaxNestingDepthOptions, MaxNestingDepthRuleImpl, NoEmptyBlockRuleImpl,
    PreferGeneralizedIterationRuleImpl,
};

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types for writing rules and
/// running the linter. Import with:
///
/// ```rust
/// use lualint_linter::prelude::*;
/// ```
pub mod prelude {
    pub use crate::context::RuleContext;
    pub use crate::diagnostics::{Fix, LintIssue, LintResult, RuleIssue, Severity};
    pub use crate::engine::Linter;
    pub use crate::fix::apply_fixes;
    pub use crate::registry::RuleRegistry;
    pub use crate::rule::{Category, CreateContext, Fixable, Listener, ListenerMap, Rule};
}
