use crate::diagnostics::RuleIssue;
use crate::rule::{Category, CreateContext, Listener, ListenerMap, Rule};
use lualint_syntax::Tag;
use serde::Deserialize;
use std::cell::Cell;
use std::rc::Rc;

/// Options for the `max_nesting_depth` rule
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaxNestingDepthOptions {
    /// Maximum allowed block nesting. Defaults to 4.
    pub max: usize,
}

impl Default for MaxNestingDepthOptions {
    fn default() -> Self {
        Self { max: 4 }
    }
}

/// Tags that open a nesting level
const NESTING: &[Tag] = &[
    Tag::Do,
    Tag::While,
    Tag::Repeat,
    Tag::If,
    Tag::Fornum,
    Tag::Forin,
    Tag::Function,
];

/// Lint rule that limits how deeply blocks may be nested
///
/// Depth is tracked with enter/exit listeners; every statement that pushes
/// the depth past the maximum is reported.
pub struct MaxNestingDepthRuleImpl;

impl Rule for MaxNestingDepthRuleImpl {
    fn id(&self) -> &str {
        "max_nesting_depth"
    }

    fn title(&self) -> &str {
        "Maximum nesting depth"
    }

    fn description(&self) -> &str {
        "Limits how deeply control-flow blocks and functions may be nested"
    }

    fn category(&self) -> Category {
        Category::Logical
    }

    fn docs_url(&self) -> Option<&str> {
        Some("https://github.com/lualint/lualint/blob/main/docs/rules/max_nesting_depth.md")
    }

    fn create(&self, ctx: &CreateContext<'_>) -> anyhow::Result<ListenerMap> {
        let opts: MaxNestingDepthOptions = ctx.options_or_default()?;
        let depth = Rc::new(Cell::new(0_usize));

        Ok(NESTING.iter().fold(ListenerMap::new(), |map, &tag| {
            let on_enter = Rc::clone(&depth);
            let on_exit = Rc::clone(&depth);
            let max = opts.max;
            map.on(
                tag,
                Listener::enter_exit(
                    move |node, cx| {
                        let current = on_enter.get() + 1;
                        on_enter.set(current);
                        if current > max {
                            cx.report(RuleIssue::at(
                                node,
                                format!("Nesting depth {current} exceeds maximum of {max}"),
                            ));
                        }
                        Ok(())
                    },
                    move |_, _| {
                        on_exit.set(on_exit.get().saturating_sub(1));
                        Ok(())
                    },
                ),
            )
        }))
    }
}
