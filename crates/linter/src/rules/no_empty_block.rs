use crate::context::RuleContext;
use crate::diagnostics::RuleIssue;
use crate::rule::{Category, CreateContext, ListenerMap, Rule};
use lualint_syntax::{Node, Tag};

/// Lint rule that flags control-flow statements whose block has no statements
pub struct NoEmptyBlockRuleImpl;

/// Statements checked, with the wording used in messages
const STATEMENTS: &[(Tag, &str)] = &[
    (Tag::Do, "do block"),
    (Tag::While, "while loop"),
    (Tag::Repeat, "repeat loop"),
    (Tag::Fornum, "for loop"),
    (Tag::Forin, "for loop"),
    (Tag::If, "if branch"),
    (Tag::ElseIf, "elseif branch"),
];

impl Rule for NoEmptyBlockRuleImpl {
    fn id(&self) -> &str {
        "no_empty_block"
    }

    fn title(&self) -> &str {
        "No empty blocks"
    }

    fn description(&self) -> &str {
        "Disallows control-flow statements with an empty body"
    }

    fn category(&self) -> Category {
        Category::Stylistic
    }

    fn docs_url(&self) -> Option<&str> {
        Some("https://github.com/lualint/lualint/blob/main/docs/rules/no_empty_block.md")
    }

    fn create(&self, _ctx: &CreateContext<'_>) -> anyhow::Result<ListenerMap> {
        Ok(STATEMENTS
            .iter()
            .fold(ListenerMap::new(), |map, &(tag, what)| {
                map.on_enter(tag, move |node, cx| {
                    check_block(node, node.child("body"), what, cx);
                    if node.tag == Tag::If {
                        check_block(node, node.child("orelse"), "else branch", cx);
                    }
                    Ok(())
                })
            }))
    }
}

fn check_block(statement: &Node, block: Option<&Node>, what: &str, cx: &mut RuleContext<'_>) {
    let Some(block) = block else {
        return;
    };
    if block.tag != Tag::Block || !block.children("body").is_empty() {
        return;
    }
    // Report at the block when it has its own location, so an empty `else`
    // points at the `else` rather than the whole `if`
    let target = if block.loc.is_some() { block } else { statement };
    cx.report(RuleIssue::at(target, format!("Empty {what}")));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Linter;
    use crate::registry::RuleRegistry;
    use lualint_test_utils::{block, call, format_messages, id, pos, span, tree};
    use std::sync::Arc;

    fn check(tree: &lualint_syntax::Tree, source: &str) -> Vec<String> {
        let mut registry = RuleRegistry::new();
        registry
            .register_rule(Arc::new(NoEmptyBlockRuleImpl), None)
            .unwrap();
        Linter::new(&registry)
            .lint_file(tree, source, "blocks.lua")
            .issues
            .iter()
            .map(|issue| {
                format!(
                    "{}:{} {}",
                    issue.range.start.display_line(),
                    issue.range.start.display_column(),
                    issue.message
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_do_and_while() {
        // do end
        // while x do end
        let source = "do end\nwhile x do end";
        let file = tree(vec![
            span(Tag::Do, pos(0, 0), pos(0, 6)).with_child("body", block(pos(0, 3), pos(0, 3), vec![])),
            span(Tag::While, pos(1, 0), pos(1, 14))
                .with_child("condition", id("x", pos(1, 6)))
                .with_child("body", block(pos(1, 11), pos(1, 11), vec![])),
        ]);

        insta::assert_snapshot!(format_messages(&check(&file, source)), @r"
        [1] 1:4 Empty do block
        [2] 2:12 Empty while loop
        ");
    }

    #[test]
    fn test_non_empty_block_is_fine() {
        let source = "do f() end";
        let file = tree(vec![span(Tag::Do, pos(0, 0), pos(0, 10)).with_child(
            "body",
            block(
                pos(0, 3),
                pos(0, 6),
                vec![call(pos(0, 3), pos(0, 6), id("f", pos(0, 3)), vec![])],
            ),
        )]);
        assert!(check(&file, source).is_empty());
    }

    #[test]
    fn test_empty_else_branch() {
        let source = "if x then f() else end";
        let file = tree(vec![span(Tag::If, pos(0, 0), pos(0, 22))
            .with_child("condition", id("x", pos(0, 3)))
            .with_child(
                "body",
                block(
                    pos(0, 10),
                    pos(0, 13),
                    vec![call(pos(0, 10), pos(0, 13), id("f", pos(0, 10)), vec![])],
                ),
            )
            .with_child("orelse", block(pos(0, 14), pos(0, 18), vec![]))]);

        assert_eq!(check(&file, source), vec!["1:15 Empty else branch"]);
    }

    #[test]
    fn test_unlocated_block_reports_at_statement() {
        let source = "repeat until x";
        let file = tree(vec![span(Tag::Repeat, pos(0, 0), pos(0, 14))
            .with_child("body", Node::new(Tag::Block).with_children("body", vec![]))
            .with_child("condition", id("x", pos(0, 13)))]);

        assert_eq!(check(&file, source), vec!["1:1 Empty repeat loop"]);
    }
}
