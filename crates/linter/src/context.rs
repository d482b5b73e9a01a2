use crate::diagnostics::{LintIssue, LintStats, RuleIssue, Severity, SourceRange};
use crate::error::LintError;
use crate::line_index::LineIndex;
use crate::registry::RegisteredRule;
use lualint_syntax::{Node, NodeId};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Per-file state shared by every rule: the line table, resolved locations,
/// and everything reported so far.
#[derive(Debug)]
pub(crate) struct Collector {
    line_index: LineIndex,
    locations: HashMap<NodeId, Option<SourceRange>>,
    pub(crate) issues: Vec<LintIssue>,
    pub(crate) errors: Vec<LintError>,
    pub(crate) stats: LintStats,
}

impl Collector {
    pub(crate) fn new(line_index: LineIndex) -> Self {
        Self {
            line_index,
            locations: HashMap::new(),
            issues: Vec::new(),
            errors: Vec::new(),
            stats: LintStats::default(),
        }
    }

    /// Resolve the location of a node reached by the walk and cache it.
    ///
    /// Tree nodes stay borrowed for the whole lint call, so their addresses
    /// are unique while the cache is alive.
    pub(crate) fn visit(&mut self, node: &Node) -> Option<SourceRange> {
        let line_index = &self.line_index;
        *self
            .locations
            .entry(node.id())
            .or_insert_with(|| node.loc.as_ref().map(|loc| line_index.resolve(loc)))
    }

    /// Location of any node. Nodes outside the walk (built or cloned by a
    /// rule) are resolved from their own `loc` and never cached.
    pub(crate) fn resolve(&self, node: &Node) -> Option<SourceRange> {
        match self.locations.get(&node.id()) {
            Some(range) => *range,
            None => node.loc.as_ref().map(|loc| self.line_index.resolve(loc)),
        }
    }

    fn push_issue(&mut self, issue: LintIssue) {
        self.stats.issues_found += 1;
        if issue.has_fix() {
            self.stats.fixable_issues += 1;
        }
        self.issues.push(issue);
    }
}

/// What a listener sees while the engine walks a file.
pub struct RuleContext<'a> {
    rule: &'a RegisteredRule,
    filename: &'a str,
    source_text: &'a str,
    collector: &'a mut Collector,
}

impl<'a> RuleContext<'a> {
    pub(crate) fn new(
        rule: &'a RegisteredRule,
        filename: &'a str,
        source_text: &'a str,
        collector: &'a mut Collector,
    ) -> Self {
        Self {
            rule,
            filename,
            source_text,
            collector,
        }
    }

    #[must_use]
    pub fn rule_id(&self) -> &'a str {
        self.rule.id()
    }

    #[must_use]
    pub const fn filename(&self) -> &'a str {
        self.filename
    }

    #[must_use]
    pub const fn source_text(&self) -> &'a str {
        self.source_text
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.rule.severity()
    }

    /// Options configured for the running rule
    #[must_use]
    pub fn options(&self) -> Option<&'a serde_json::Value> {
        self.rule.options()
    }

    pub fn options_or_default<T: DeserializeOwned + Default>(&self) -> anyhow::Result<T> {
        match self.options() {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(T::default()),
        }
    }

    /// Resolved location of `node`, or `None` when the parser gave it none
    pub fn location(&self, node: &Node) -> Option<SourceRange> {
        self.collector.resolve(node)
    }

    /// The source text covered by `node`
    pub fn node_text(&self, node: &Node) -> Option<&'a str> {
        let source = self.source_text;
        let range = self.location(node)?;
        source.get(range.start.offset..range.end.offset)
    }

    /// Record an issue against the running rule.
    ///
    /// An explicit range wins over the node's location. Issues that end up
    /// with no location are dropped and recorded as a rule error instead.
    pub fn report(&mut self, issue: RuleIssue<'_>) {
        let RuleIssue {
            node,
            message,
            range,
            fix,
        } = issue;

        let range = range.or_else(|| node.and_then(|n| self.collector.resolve(n)));
        let Some(range) = range else {
            tracing::debug!(rule = self.rule_id(), %message, "Dropping issue without a location");
            self.collector.errors.push(
                LintError::rule(
                    self.rule_id(),
                    format!("Issue reported without a location: {message}"),
                )
                .with_file(self.filename),
            );
            return;
        };

        self.collector.push_issue(LintIssue {
            rule_id: self.rule_id().to_string(),
            message,
            severity: self.rule.severity(),
            node_tag: node.map(|n| n.tag),
            range,
            fix,
        });
    }
}
