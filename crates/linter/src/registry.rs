//! Rule registry, indexed by the node tags each rule listens to.
use crate::diagnostics::Severity;
use crate::error::LintError;
use crate::rule::{validate_rule, CreateContext, Rule, ValidationError};
use crate::rules::{MaxNestingDepthRuleImpl, NoEmptyBlockRuleImpl, PreferGeneralizedIterationRuleImpl};
use lualint_syntax::Tag;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, LazyLock};

/// Lazily initialized built-in rules.
/// Rules are created once and shared by every registry.
static BUILTIN_RULES: LazyLock<Vec<Arc<dyn Rule>>> = LazyLock::new(|| {
    vec![
        Arc::new(MaxNestingDepthRuleImpl),
        Arc::new(NoEmptyBlockRuleImpl),
        Arc::new(PreferGeneralizedIterationRuleImpl),
    ]
});

#[must_use]
pub fn builtin_rules() -> &'static [Arc<dyn Rule>] {
    &BUILTIN_RULES
}

#[must_use]
pub fn builtin_rule_ids() -> Vec<&'static str> {
    let mut ids: Vec<_> = builtin_rules().iter().map(|rule| rule.id()).collect();
    ids.sort_unstable();
    ids
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid rule: {0}")]
    InvalidRule(#[from] ValidationError),

    #[error("rule '{0}' is already registered")]
    DuplicateRule(String),

    #[error("rule '{id}' failed to create listeners during registration: {message}")]
    CreateFailed { id: String, message: String },

    #[error("rule '{id}' returned an invalid listener map: {source}")]
    InvalidListeners {
        id: String,
        #[source]
        source: ValidationError,
    },
}

impl From<RegistryError> for LintError {
    fn from(err: RegistryError) -> Self {
        match &err {
            RegistryError::CreateFailed { id, .. } => LintError::rule(id.clone(), err.to_string()),
            RegistryError::InvalidListeners { id, .. } => {
                let mut lint_err = LintError::validation(err.to_string());
                lint_err.context.rule_id = Some(id.clone());
                lint_err
            }
            RegistryError::InvalidRule(_) | RegistryError::DuplicateRule(_) => {
                LintError::validation(err.to_string())
            }
        }
    }
}

/// A rule plus the state the registry keeps for it
#[derive(Clone)]
pub struct RegisteredRule {
    rule: Arc<dyn Rule>,
    node_types: Vec<Tag>,
    enabled: bool,
    options: Option<serde_json::Value>,
    severity: Severity,
}

impl RegisteredRule {
    #[must_use]
    pub fn id(&self) -> &str {
        self.rule.id()
    }

    #[must_use]
    pub fn rule(&self) -> &dyn Rule {
        self.rule.as_ref()
    }

    /// Tags discovered at registration, in listener-map order
    #[must_use]
    pub fn node_types(&self) -> &[Tag] {
        &self.node_types
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn options(&self) -> Option<&serde_json::Value> {
        self.options.as_ref()
    }

    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }
}

impl std::fmt::Debug for RegisteredRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredRule")
            .field("id", &self.id())
            .field("node_types", &self.node_types)
            .field("enabled", &self.enabled)
            .field("options", &self.options)
            .field("severity", &self.severity)
            .finish()
    }
}

/// Holds rules in registration order and indexes them by tag.
///
/// Invariant: a rule id appears in the tag index exactly for the tags its
/// listener map named at registration, and in the order rules were registered.
#[derive(Debug, Default, Clone)]
pub struct RuleRegistry {
    rules: Vec<RegisteredRule>,
    positions: HashMap<String, usize>,
    by_tag: HashMap<Tag, Vec<String>>,
}

impl RuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in rule, enabled with default options
    pub fn with_builtin_rules() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register_rules(builtin_rules().iter().cloned())?;
        Ok(registry)
    }

    /// Validate and register a rule.
    ///
    /// The rule's listener map is built once with an empty context to
    /// discover which tags it listens to.
    #[tracing::instrument(skip_all, fields(rule = rule.id()))]
    pub fn register_rule(
        &mut self,
        rule: Arc<dyn Rule>,
        options: Option<serde_json::Value>,
    ) -> Result<(), RegistryError> {
        validate_rule(rule.as_ref())?;

        let id = rule.id().to_string();
        if self.positions.contains_key(&id) {
            return Err(RegistryError::DuplicateRule(id));
        }

        let node_types = discover_node_types(rule.as_ref(), options.as_ref())?;
        tracing::debug!(?node_types, "Registered rule");

        for tag in &node_types {
            self.by_tag.entry(*tag).or_default().push(id.clone());
        }
        self.positions.insert(id, self.rules.len());
        self.rules.push(RegisteredRule {
            rule,
            node_types,
            enabled: true,
            options,
            severity: Severity::default(),
        });
        Ok(())
    }

    /// Register rules in order, stopping at the first failure.
    /// Rules registered before the failure stay registered.
    pub fn register_rules(
        &mut self,
        rules: impl IntoIterator<Item = Arc<dyn Rule>>,
    ) -> Result<(), RegistryError> {
        for rule in rules {
            self.register_rule(rule, None)?;
        }
        Ok(())
    }

    /// Remove a rule and its index entries. Returns whether it was registered.
    #[tracing::instrument(skip(self))]
    pub fn unregister_rule(&mut self, rule_id: &str) -> bool {
        let Some(position) = self.positions.remove(rule_id) else {
            return false;
        };
        let removed = self.rules.remove(position);
        for tag in &removed.node_types {
            if let Some(ids) = self.by_tag.get_mut(tag) {
                ids.retain(|id| id != rule_id);
                if ids.is_empty() {
                    self.by_tag.remove(tag);
                }
            }
        }
        for (index, rule) in self.rules.iter().enumerate().skip(position) {
            self.positions.insert(rule.id().to_string(), index);
        }
        true
    }

    /// Every registered rule, enabled or not, in registration order
    #[must_use]
    pub fn get_all_rules(&self) -> &[RegisteredRule] {
        &self.rules
    }

    #[must_use]
    pub fn get_rule_by_id(&self, rule_id: &str) -> Option<&RegisteredRule> {
        self.positions.get(rule_id).map(|&index| &self.rules[index])
    }

    /// Enabled rules listening to `tag`, in registration order
    #[must_use]
    pub fn get_rules_for_node_type(&self, tag: Tag) -> Vec<&RegisteredRule> {
        self.by_tag
            .get(&tag)
            .into_iter()
            .flatten()
            .filter_map(|id| self.get_rule_by_id(id))
            .filter(|rule| rule.enabled)
            .collect()
    }

    /// Tags with at least one indexed rule, enabled or not
    #[must_use]
    pub fn get_all_node_types(&self) -> Vec<Tag> {
        let mut tags: Vec<_> = self.by_tag.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    /// Enabled rules in registration order
    pub fn enabled_rules(&self) -> impl Iterator<Item = &RegisteredRule> {
        self.rules.iter().filter(|rule| rule.enabled)
    }

    #[must_use]
    pub fn is_rule_registered(&self, rule_id: &str) -> bool {
        self.positions.contains_key(rule_id)
    }

    /// Returns whether the rule exists
    #[tracing::instrument(skip(self))]
    pub fn set_rule_enabled(&mut self, rule_id: &str, enabled: bool) -> bool {
        self.get_rule_mut(rule_id)
            .map(|rule| rule.enabled = enabled)
            .is_some()
    }

    /// Returns whether the rule exists
    #[tracing::instrument(skip(self, options))]
    pub fn set_rule_options(&mut self, rule_id: &str, options: Option<serde_json::Value>) -> bool {
        self.get_rule_mut(rule_id)
            .map(|rule| rule.options = options)
            .is_some()
    }

    /// Returns whether the rule exists
    pub fn set_rule_severity(&mut self, rule_id: &str, severity: Severity) -> bool {
        self.get_rule_mut(rule_id)
            .map(|rule| rule.severity = severity)
            .is_some()
    }

    pub fn clear(&mut self) {
        self.rules.clear();
        self.positions.clear();
        self.by_tag.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn get_rule_mut(&mut self, rule_id: &str) -> Option<&mut RegisteredRule> {
        let index = *self.positions.get(rule_id)?;
        self.rules.get_mut(index)
    }
}

fn discover_node_types(
    rule: &dyn Rule,
    options: Option<&serde_json::Value>,
) -> Result<Vec<Tag>, RegistryError> {
    let ctx = CreateContext::discovery(options);
    let created = panic::catch_unwind(AssertUnwindSafe(|| rule.create(&ctx)));
    let map = match created {
        Ok(Ok(map)) => map,
        Ok(Err(err)) => {
            return Err(RegistryError::CreateFailed {
                id: rule.id().to_string(),
                message: format!("{err:#}"),
            })
        }
        Err(payload) => {
            return Err(RegistryError::CreateFailed {
                id: rule.id().to_string(),
                message: crate::engine::panic_message(payload.as_ref()),
            })
        }
    };

    let tagged = map
        .into_tagged()
        .map_err(|source| RegistryError::InvalidListeners {
            id: rule.id().to_string(),
            source,
        })?;
    Ok(tagged.into_iter().map(|(tag, _)| tag).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Category, ListenerMap};

    struct TagRule {
        id: &'static str,
        tags: &'static [&'static str],
    }

    impl Rule for TagRule {
        fn id(&self) -> &str {
            self.id
        }
        fn title(&self) -> &str {
            "Tag rule"
        }
        fn description(&self) -> &str {
            "Listens to a fixed set of tags"
        }
        fn category(&self) -> Category {
            Category::Logical
        }
        fn docs_url(&self) -> Option<&str> {
            Some("https://example.com/tag-rule")
        }
        fn create(&self, _ctx: &CreateContext<'_>) -> anyhow::Result<ListenerMap> {
            Ok(self
                .tags
                .iter()
                .fold(ListenerMap::new(), |map, tag| map.on_enter(tag, |_, _| Ok(()))))
        }
    }

    fn rule(id: &'static str, tags: &'static [&'static str]) -> Arc<dyn Rule> {
        Arc::new(TagRule { id, tags })
    }

    fn ids(rules: &[&RegisteredRule]) -> Vec<String> {
        rules.iter().map(|r| r.id().to_string()).collect()
    }

    #[test]
    fn test_register_indexes_by_tag() {
        let mut registry = RuleRegistry::new();
        registry
            .register_rule(rule("a", &["call", "forin"]), None)
            .unwrap();
        registry.register_rule(rule("b", &["call"]), None).unwrap();

        assert_eq!(ids(&registry.get_rules_for_node_type(Tag::Call)), vec!["a", "b"]);
        assert_eq!(ids(&registry.get_rules_for_node_type(Tag::Forin)), vec!["a"]);
        assert!(registry.get_rules_for_node_type(Tag::Id).is_empty());
        assert_eq!(registry.get_all_node_types(), vec![Tag::Forin, Tag::Call]);
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let mut registry = RuleRegistry::new();
        registry.register_rule(rule("a", &["call"]), None).unwrap();
        let err = registry.register_rule(rule("a", &["id"]), None).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRule(ref id) if id == "a"));
        assert_eq!(registry.len(), 1);
        assert!(registry.get_rules_for_node_type(Tag::Id).is_empty());
    }

    #[test]
    fn test_unknown_tag_fails_registration() {
        let mut registry = RuleRegistry::new();
        let err = registry
            .register_rule(rule("bad", &["call", "lambda"]), None)
            .unwrap_err();
        assert!(err.to_string().contains("'lambda'"), "{err}");
        assert!(registry.is_empty());
        assert!(registry.get_all_node_types().is_empty());
    }

    #[test]
    fn test_disabled_rules_stay_indexed_but_are_not_returned() {
        let mut registry = RuleRegistry::new();
        registry.register_rule(rule("a", &["call"]), None).unwrap();
        registry.register_rule(rule("b", &["call"]), None).unwrap();

        assert!(registry.set_rule_enabled("a", false));
        assert_eq!(ids(&registry.get_rules_for_node_type(Tag::Call)), vec!["b"]);
        assert_eq!(registry.get_all_node_types(), vec![Tag::Call]);
        assert!(!registry.get_rule_by_id("a").unwrap().is_enabled());

        assert!(registry.set_rule_enabled("a", true));
        assert_eq!(ids(&registry.get_rules_for_node_type(Tag::Call)), vec!["a", "b"]);
        assert!(!registry.set_rule_enabled("missing", true));
    }

    #[test]
    fn test_unregister_removes_index_entries() {
        let mut registry = RuleRegistry::new();
        registry.register_rule(rule("a", &["call"]), None).unwrap();
        registry.register_rule(rule("b", &["call", "id"]), None).unwrap();
        registry.register_rule(rule("c", &["id"]), None).unwrap();

        assert!(registry.unregister_rule("b"));
        assert!(!registry.unregister_rule("b"));
        assert!(!registry.is_rule_registered("b"));
        assert_eq!(ids(&registry.get_rules_for_node_type(Tag::Call)), vec!["a"]);
        assert_eq!(ids(&registry.get_rules_for_node_type(Tag::Id)), vec!["c"]);
        assert_eq!(registry.get_rule_by_id("c").unwrap().id(), "c");
    }

    #[test]
    fn test_register_rules_is_fail_fast() {
        let mut registry = RuleRegistry::new();
        let result = registry.register_rules([
            rule("a", &["call"]),
            rule("a", &["id"]),
            rule("c", &["id"]),
        ]);
        assert!(result.is_err());
        assert!(registry.is_rule_registered("a"));
        assert!(!registry.is_rule_registered("c"));
    }

    #[test]
    fn test_options_and_severity_updates() {
        let mut registry = RuleRegistry::new();
        registry.register_rule(rule("a", &["call"]), None).unwrap();

        assert!(registry.set_rule_options("a", Some(serde_json::json!({ "max": 2 }))));
        assert!(registry.set_rule_severity("a", Severity::Error));
        let registered = registry.get_rule_by_id("a").unwrap();
        assert_eq!(registered.options(), Some(&serde_json::json!({ "max": 2 })));
        assert_eq!(registered.severity(), Severity::Error);
    }

    #[test]
    fn test_clear() {
        let mut registry = RuleRegistry::with_builtin_rules().unwrap();
        assert_eq!(registry.len(), builtin_rules().len());
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.get_all_node_types().is_empty());
    }

    #[test]
    fn test_builtin_rule_ids_are_sorted_and_unique() {
        let ids = builtin_rule_ids();
        let mut deduped = ids.clone();
        deduped.dedup();
        assert_eq!(ids, deduped);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}
