use crate::diagnostics::{Fix, RuleIssue};
use crate::rule::{Category, CreateContext, Fixable, ListenerMap, Rule};
use lualint_syntax::{Node, Tag};

const ITERATORS: &[&str] = &["ipairs", "pairs"];

/// Lint rule that replaces `ipairs(t)` / `pairs(t)` in generic `for` loops
/// with Luau's generalized iteration (`for k, v in t do`).
pub struct PreferGeneralizedIterationRuleImpl;

impl Rule for PreferGeneralizedIterationRuleImpl {
    fn id(&self) -> &str {
        "prefer_generalized_iteration"
    }

    fn title(&self) -> &str {
        "Prefer generalized iteration"
    }

    fn description(&self) -> &str {
        "Use generalized iteration over tables instead of ipairs() or pairs()"
    }

    fn category(&self) -> Category {
        Category::Stylistic
    }

    fn fixable(&self) -> Fixable {
        Fixable::Auto
    }

    fn docs_url(&self) -> Option<&str> {
        Some("https://luau.org/syntax#generalized-iteration")
    }

    fn create(&self, _ctx: &CreateContext<'_>) -> anyhow::Result<ListenerMap> {
        Ok(ListenerMap::new().on_enter(Tag::Forin, |node, cx| {
            let Some((call, iterator, table)) = iterator_call(node) else {
                return Ok(());
            };
            let Some(call_range) = cx.location(call) else {
                return Ok(());
            };

            let mut issue = RuleIssue::at(
                call,
                format!("Use generalized iteration instead of {iterator}()"),
            );
            if let Some(table_text) = cx.node_text(table) {
                let offsets = call_range.offsets();
                issue = issue.with_fix(Fix::replace(offsets.start, offsets.end, table_text));
            }
            cx.report(issue);
            Ok(())
        }))
    }
}

/// `(call, iterator name, argument)` when the loop iterates `ipairs(x)` or `pairs(x)`
fn iterator_call(forin: &Node) -> Option<(&Node, &str, &Node)> {
    let [call] = forin.children("exprs") else {
        return None;
    };
    if call.tag != Tag::Call {
        return None;
    }
    let callee = call.child("callee")?;
    if callee.tag != Tag::Id {
        return None;
    }
    let name = callee.name()?;
    if !ITERATORS.contains(&name) {
        return None;
    }
    let [table] = call.children("args") else {
        return None;
    };
    Some((call, name, table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Linter;
    use crate::fix::apply_fixes;
    use crate::registry::RuleRegistry;
    use lualint_test_utils::{block, call, forin, id, pos};
    use std::sync::Arc;

    fn registry() -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        registry
            .register_rule(Arc::new(PreferGeneralizedIterationRuleImpl), None)
            .unwrap();
        registry
    }

    /// `for i, value in <iter>(array) do end` on one line
    fn loop_over(iterator: &str, args: Vec<Node>) -> (String, lualint_syntax::Tree) {
        let source = format!("for i, value in {iterator}(array) do end");
        let call_end = 16 + iterator.len() + "(array)".len();
        let tree = lualint_syntax::Tree::new(vec![forin(
            pos(0, 0),
            pos(0, source.len()),
            vec![id("i", pos(0, 4)), id("value", pos(0, 7))],
            vec![call(pos(0, 16), pos(0, call_end), id(iterator, pos(0, 16)), args)],
            block(pos(0, call_end + 4), pos(0, call_end + 4), vec![]),
        )]);
        (source, tree)
    }

    #[test]
    fn test_ipairs_is_reported_and_fixed() {
        let registry = registry();
        let (source, tree) = loop_over("ipairs", vec![id("array", pos(0, 23))]);

        let result = Linter::new(&registry).lint_file(&tree, &source, "loop.lua");
        assert_eq!(result.issues.len(), 1);
        let issue = &result.issues[0];
        assert_eq!(issue.message, "Use generalized iteration instead of ipairs()");
        assert_eq!(issue.node_tag, Some(Tag::Call));
        assert_eq!(result.stats.fixable_issues, 1);

        let outcome = apply_fixes(&source, &result.issues);
        assert_eq!(outcome.output, "for i, value in array do end");
    }

    #[test]
    fn test_pairs_is_reported() {
        let registry = registry();
        let (source, tree) = loop_over("pairs", vec![id("array", pos(0, 22))]);

        let result = Linter::new(&registry).lint_file(&tree, &source, "loop.lua");
        assert_eq!(result.issues.len(), 1);
        let outcome = apply_fixes(&source, &result.issues);
        assert_eq!(outcome.output, "for i, value in array do end");
    }

    #[test]
    fn test_other_iterators_are_ignored() {
        let registry = registry();
        let (source, tree) = loop_over("next", vec![id("array", pos(0, 21))]);

        let result = Linter::new(&registry).lint_file(&tree, &source, "loop.lua");
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_wrong_arity_is_ignored() {
        let registry = registry();
        let (source, tree) = loop_over("ipairs", vec![]);

        let result = Linter::new(&registry).lint_file(&tree, &source, "loop.lua");
        assert!(result.issues.is_empty());
    }
}
