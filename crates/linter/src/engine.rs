//! Single-pass traversal with enter/exit dispatch.
use crate::context::{Collector, RuleContext};
use crate::diagnostics::LintResult;
use crate::error::LintError;
use crate::line_index::LineIndex;
use crate::registry::{RegisteredRule, RuleRegistry};
use crate::rule::{CreateContext, ListenerFn};
use lualint_syntax::{Node, Tag, Tree};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

/// Runs every enabled rule of a registry over a tree in one walk.
#[derive(Debug, Clone, Copy)]
pub struct Linter<'r> {
    registry: &'r RuleRegistry,
}

struct DispatchEntry {
    rule: usize,
    enter: Option<ListenerFn>,
    exit: Option<ListenerFn>,
}

#[derive(Clone, Copy)]
enum Phase {
    Enter,
    Exit,
}

enum Step<'t> {
    Enter(&'t Node),
    Exit(&'t Node),
}

impl<'r> Linter<'r> {
    #[must_use]
    pub const fn new(registry: &'r RuleRegistry) -> Self {
        Self { registry }
    }

    /// Lint one parsed file.
    ///
    /// Rule failures never abort the walk: a failing listener factory or
    /// listener call is recorded in `errors` and the remaining rules keep
    /// running.
    #[tracing::instrument(skip_all, fields(file = filename))]
    pub fn lint_file(&self, tree: &Tree, source_text: &str, filename: &str) -> LintResult {
        let started = Instant::now();
        let mut result = LintResult::empty(filename);

        if self.registry.is_empty() {
            result.stats.execution_time_ms = elapsed_ms(started);
            return result;
        }

        let mut walker = Walker {
            rules: Vec::new(),
            listeners: HashMap::new(),
            filename,
            source_text,
            collector: Collector::new(LineIndex::new(source_text)),
        };

        for rule in self.registry.enabled_rules() {
            walker.instantiate(rule);
        }
        walker.collector.stats.rules_executed = walker.rules.len();

        walker.walk(&tree.body);

        let Walker { collector, .. } = walker;
        result.issues = collector.issues;
        result.errors = collector.errors;
        result.stats = collector.stats;
        result.stats.execution_time_ms = elapsed_ms(started);

        tracing::debug!(
            issues = result.stats.issues_found,
            errors = result.errors.len(),
            nodes = result.stats.nodes_visited,
            "Linted file"
        );
        result
    }

    /// Lint a single node by wrapping it in a synthetic root block
    pub fn lint_node(&self, node: &Node, source_text: &str, filename: &str) -> LintResult {
        self.lint_file(&Tree::new(vec![node.clone()]), source_text, filename)
    }
}

struct Walker<'a> {
    rules: Vec<&'a RegisteredRule>,
    listeners: HashMap<Tag, Vec<DispatchEntry>>,
    filename: &'a str,
    source_text: &'a str,
    collector: Collector,
}

impl<'a> Walker<'a> {
    /// Build a rule's listeners for this file and add them to the dispatch table
    fn instantiate(&mut self, rule: &'a RegisteredRule) {
        let ctx = CreateContext::new(self.filename, self.source_text, rule.options());
        let created = panic::catch_unwind(AssertUnwindSafe(|| rule.rule().create(&ctx)));

        let map = match created {
            Ok(Ok(map)) => map,
            Ok(Err(err)) => {
                self.rule_failed(
                    rule,
                    format!("Failed to create listeners: {err}"),
                    Some(format!("{err:#}")),
                    None,
                );
                return;
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.rule_failed(
                    rule,
                    format!("Panicked while creating listeners: {message}"),
                    None,
                    Some(message),
                );
                return;
            }
        };

        let tagged = match map.into_tagged() {
            Ok(tagged) => tagged,
            Err(err) => {
                self.rule_failed(rule, format!("Invalid listener map: {err}"), None, None);
                return;
            }
        };

        #[cfg(debug_assertions)]
        {
            let mut created: Vec<Tag> = tagged.iter().map(|(tag, _)| *tag).collect();
            let mut discovered = rule.node_types().to_vec();
            created.sort_unstable();
            discovered.sort_unstable();
            if created != discovered {
                tracing::warn!(
                    rule = rule.id(),
                    ?discovered,
                    ?created,
                    "Rule listens to different tags than at registration"
                );
            }
        }

        let index = self.rules.len();
        self.rules.push(rule);
        for (tag, listener) in tagged {
            let (enter, exit) = listener.into_parts();
            self.listeners.entry(tag).or_default().push(DispatchEntry {
                rule: index,
                enter,
                exit,
            });
        }
    }

    /// Depth-first walk. Nodes without a location are skipped along with their subtrees.
    fn walk(&mut self, body: &[Node]) {
        let mut stack: Vec<Step<'_>> = body.iter().rev().map(Step::Enter).collect();

        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(node) => {
                    if node.loc.is_none() {
                        continue;
                    }
                    self.collector.stats.nodes_visited += 1;
                    self.collector.visit(node);
                    self.dispatch(node, Phase::Enter);

                    stack.push(Step::Exit(node));
                    let mark = stack.len();
                    stack.extend(node.child_nodes().map(Step::Enter));
                    stack[mark..].reverse();
                }
                Step::Exit(node) => self.dispatch(node, Phase::Exit),
            }
        }
    }

    fn dispatch(&mut self, node: &Node, phase: Phase) {
        let Some(entries) = self.listeners.get_mut(&node.tag) else {
            return;
        };

        for entry in entries {
            let listener = match phase {
                Phase::Enter => entry.enter.as_mut(),
                Phase::Exit => entry.exit.as_mut(),
            };
            let Some(listener) = listener else {
                continue;
            };
            let rule = self.rules[entry.rule];

            let outcome = {
                let mut cx =
                    RuleContext::new(rule, self.filename, self.source_text, &mut self.collector);
                panic::catch_unwind(AssertUnwindSafe(|| listener(node, &mut cx)))
            };

            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => (err.to_string(), Some(format!("{err:#}")), None),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    (format!("panicked: {message}"), None, Some(message))
                }
            };

            let (message, cause, trace) = failure;
            let phase_name = match phase {
                Phase::Enter => "enter",
                Phase::Exit => "exit",
            };
            tracing::warn!(rule = rule.id(), tag = %node.tag, phase = phase_name, %message, "Listener failed");

            let mut err = LintError::rule(
                rule.id(),
                format!("Listener for '{}' ({phase_name}) failed: {message}", node.tag),
            )
            .with_file(self.filename);
            if let Some(range) = self.collector.resolve(node) {
                err = err.with_range(range);
            }
            if let Some(cause) = cause {
                err = err.with_cause(cause);
            }
            if let Some(trace) = trace {
                err = err.with_trace(trace);
            }
            self.collector.errors.push(err);
        }
    }

    fn rule_failed(
        &mut self,
        rule: &RegisteredRule,
        message: String,
        cause: Option<String>,
        trace: Option<String>,
    ) {
        tracing::warn!(rule = rule.id(), %message, "Rule could not be instantiated");
        let mut err = LintError::rule(rule.id(), message).with_file(self.filename);
        if let Some(cause) = cause {
            err = err.with_cause(cause);
        }
        if let Some(trace) = trace {
            err = err.with_trace(trace);
        }
        self.collector.errors.push(err);
    }
}

/// Text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RuleIssue;
    use crate::rule::{Category, Listener, ListenerMap, Rule};
    use lualint_syntax::Position;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};

    type Factory = dyn Fn() -> anyhow::Result<ListenerMap> + Send + Sync;

    struct FnRule {
        id: &'static str,
        factory: Box<Factory>,
    }

    impl Rule for FnRule {
        fn id(&self) -> &str {
            self.id
        }
        fn title(&self) -> &str {
            "Test rule"
        }
        fn description(&self) -> &str {
            "Rule built from a closure"
        }
        fn category(&self) -> Category {
            Category::Logical
        }
        fn docs_url(&self) -> Option<&str> {
            Some("https://example.com")
        }
        fn create(&self, _ctx: &CreateContext<'_>) -> anyhow::Result<ListenerMap> {
            (self.factory)()
        }
    }

    fn fn_rule(
        id: &'static str,
        factory: impl Fn() -> anyhow::Result<ListenerMap> + Send + Sync + 'static,
    ) -> Arc<dyn Rule> {
        Arc::new(FnRule {
            id,
            factory: Box::new(factory),
        })
    }

    fn id_node(name: &str, line: usize, column: usize) -> Node {
        Node::new(Tag::Id)
            .with_token(Position::new(line, column), name)
            .with_text("name", name)
    }

    /// `a(b)` on line 0
    fn call_tree() -> Tree {
        Tree::new(vec![Node::new(Tag::Call)
            .with_span(Position::new(0, 0), Position::new(0, 4))
            .with_child("callee", id_node("a", 0, 0))
            .with_children("args", vec![id_node("b", 0, 2)])])
    }

    #[test]
    fn test_enter_and_exit_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&events);
        let mut registry = RuleRegistry::new();
        registry
            .register_rule(
                fn_rule("order", move || {
                    let enter_log = Arc::clone(&log);
                    let exit_log = Arc::clone(&log);
                    let id_log = Arc::clone(&log);
                    Ok(ListenerMap::new()
                        .on(
                            Tag::Call,
                            Listener::enter_exit(
                                move |_, _| {
                                    enter_log.lock().unwrap().push("enter call".to_string());
                                    Ok(())
                                },
                                move |_, _| {
                                    exit_log.lock().unwrap().push("exit call".to_string());
                                    Ok(())
                                },
                            ),
                        )
                        .on_enter(Tag::Id, move |node, _| {
                            id_log
                                .lock()
                                .unwrap()
                                .push(format!("id {}", node.name().unwrap_or_default()));
                            Ok(())
                        }))
                }),
                None,
            )
            .unwrap();
        events.lock().unwrap().clear();

        let result = Linter::new(&registry).lint_file(&call_tree(), "a(b)", "test.lua");
        assert!(result.errors.is_empty());
        assert_eq!(result.stats.nodes_visited, 3);
        assert_eq!(result.stats.rules_executed, 1);
        assert_eq!(
            *events.lock().unwrap(),
            vec!["enter call", "id a", "id b", "exit call"]
        );
    }

    #[test]
    fn test_failing_listener_is_isolated() {
        let mut registry = RuleRegistry::new();
        registry
            .register_rule(
                fn_rule("broken", || {
                    Ok(ListenerMap::new().on_enter(Tag::Id, |_, _| anyhow::bail!("boom")))
                }),
                None,
            )
            .unwrap();
        registry
            .register_rule(
                fn_rule("reporter", || {
                    Ok(ListenerMap::new().on_enter(Tag::Id, |node, cx| {
                        cx.report(RuleIssue::at(node, "identifier"));
                        Ok(())
                    }))
                }),
                None,
            )
            .unwrap();

        let result = Linter::new(&registry).lint_file(&call_tree(), "a(b)", "test.lua");
        assert_eq!(result.issues.len(), 2);
        assert_eq!(result.errors.len(), 2);
        assert!(result
            .errors
            .iter()
            .all(|e| e.rule_id() == Some("broken") && e.message.contains("boom")));
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let mut registry = RuleRegistry::new();
        registry
            .register_rule(
                fn_rule("panics", || {
                    Ok(ListenerMap::new().on(
                        Tag::Call,
                        Listener::exit(|_, _| panic!("exit exploded")),
                    ))
                }),
                None,
            )
            .unwrap();

        let result = Linter::new(&registry).lint_file(&call_tree(), "a(b)", "test.lua");
        assert_eq!(result.errors.len(), 1);
        let err = &result.errors[0];
        assert!(err.message.contains("exit exploded"), "{}", err.message);
        assert_eq!(err.context.trace.as_deref(), Some("exit exploded"));
        assert_eq!(result.stats.nodes_visited, 3);
    }

    #[test]
    fn test_failing_factory_is_recorded_per_file() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let mut registry = RuleRegistry::new();
        registry
            .register_rule(
                fn_rule("flaky", move || {
                    let mut calls = counter.lock().unwrap();
                    *calls += 1;
                    if *calls > 1 {
                        anyhow::bail!("no listeners today");
                    }
                    Ok(ListenerMap::new().on_enter(Tag::Id, |_, _| Ok(())))
                }),
                None,
            )
            .unwrap();

        let result = Linter::new(&registry).lint_file(&call_tree(), "a(b)", "test.lua");
        assert_eq!(result.stats.rules_executed, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("no listeners today"));
        assert_eq!(result.stats.nodes_visited, 3);
    }

    #[test]
    fn test_issue_without_location_becomes_error() {
        let mut registry = RuleRegistry::new();
        registry
            .register_rule(
                fn_rule("unlocated", || {
                    Ok(ListenerMap::new().on_enter(Tag::Call, |_, cx| {
                        cx.report(RuleIssue::new("somewhere"));
                        cx.report(RuleIssue::at(&Node::new(Tag::Nil), "nowhere"));
                        Ok(())
                    }))
                }),
                None,
            )
            .unwrap();

        let result = Linter::new(&registry).lint_file(&call_tree(), "a(b)", "test.lua");
        assert!(result.issues.is_empty());
        assert_eq!(result.stats.issues_found, 0);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_state_is_fresh_per_file() {
        let mut registry = RuleRegistry::new();
        registry
            .register_rule(
                fn_rule("counter", || {
                    let seen = Rc::new(RefCell::new(0));
                    Ok(ListenerMap::new().on_enter(Tag::Id, move |node, cx| {
                        *seen.borrow_mut() += 1;
                        if *seen.borrow() == 2 {
                            cx.report(RuleIssue::at(node, "second identifier"));
                        }
                        Ok(())
                    }))
                }),
                None,
            )
            .unwrap();

        let linter = Linter::new(&registry);
        for _ in 0..2 {
            let result = linter.lint_file(&call_tree(), "a(b)", "test.lua");
            assert_eq!(result.issues.len(), 1);
            assert_eq!(result.issues[0].range.start.offset, 2);
        }
    }

    #[test]
    fn test_unlocated_subtree_is_skipped() {
        let tree = Tree::new(vec![Node::new(Tag::Call)
            .with_span(Position::new(0, 0), Position::new(0, 4))
            .with_child("callee", id_node("a", 0, 0))
            .with_children(
                "args",
                vec![Node::new(Tag::Paren).with_child("expr", id_node("b", 0, 2))],
            )]);

        let mut registry = RuleRegistry::new();
        registry
            .register_rule(
                fn_rule("ids", || {
                    Ok(ListenerMap::new().on_enter(Tag::Id, |node, cx| {
                        cx.report(RuleIssue::at(node, "id"));
                        Ok(())
                    }))
                }),
                None,
            )
            .unwrap();

        let result = Linter::new(&registry).lint_file(&tree, "a(b)", "test.lua");
        assert_eq!(result.stats.nodes_visited, 2);
        assert_eq!(result.issues.len(), 1);
    }

    #[test]
    fn test_lint_node_visits_the_node_itself() {
        let mut registry = RuleRegistry::new();
        registry
            .register_rule(
                fn_rule("calls", || {
                    Ok(ListenerMap::new().on_enter(Tag::Call, |node, cx| {
                        let text = cx.node_text(node).unwrap_or_default().to_string();
                        cx.report(RuleIssue::at(node, format!("call `{text}`")));
                        Ok(())
                    }))
                }),
                None,
            )
            .unwrap();

        let node = call_tree().body.remove(0);
        let result = Linter::new(&registry).lint_node(&node, "a(b)", "snippet.lua");
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].message, "call `a(b)`");
        assert_eq!(result.issues[0].node_tag, Some(Tag::Call));
    }

    #[test]
    fn test_panic_message_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
