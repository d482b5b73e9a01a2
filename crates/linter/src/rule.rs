//! The rule contract.
//!
//! A rule is immutable metadata plus a factory. For every file the engine
//! calls [`Rule::create`] once and receives a [`ListenerMap`]; any state a
//! rule needs while walking that file lives in the closures of that map.
use crate::context::RuleContext;
use lualint_syntax::{Node, Tag};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// What kind of problem a rule looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Formatting,
    Stylistic,
    Logical,
}

impl Category {
    pub const ALL: &'static [Category] = &[Self::Formatting, Self::Stylistic, Self::Logical];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Formatting => "formatting",
            Self::Stylistic => "stylistic",
            Self::Logical => "logical",
        }
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether and how a rule's issues can be fixed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Fixable {
    #[default]
    None,
    Auto,
    Suggestion,
}

impl Fixable {
    pub const ALL: &'static [Fixable] = &[Self::None, Self::Auto, Self::Suggestion];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Auto => "auto",
            Self::Suggestion => "suggestion",
        }
    }
}

impl FromStr for Fixable {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownFixable(s.to_string()))
    }
}

impl fmt::Display for Fixable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A malformed rule definition or listener map
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("rule definition must be a structured record")]
    NotARecord,

    #[error("rule `{field}` must be a non-empty string")]
    EmptyField { field: &'static str },

    #[error("rule category must be one of formatting, stylistic, logical (got '{0}')")]
    UnknownCategory(String),

    #[error("rule fixable must be one of none, auto, suggestion (got '{0}')")]
    UnknownFixable(String),

    #[error("rule `docs_url` must be a string")]
    MissingDocsUrl,

    #[error("listener map key '{tag}' is not a known node type")]
    UnknownNodeType { tag: String },

    #[error("listener for '{tag}' must define an enter or an exit function")]
    EmptyListener { tag: String },
}

/// A lint rule.
///
/// Implementations must keep the set of tags returned by [`Rule::create`]
/// the same for every file: the registry discovers it once, at registration.
pub trait Rule: Send + Sync {
    /// Unique identifier for this rule (e.g., `"no_empty_block"`)
    fn id(&self) -> &str;

    /// Short human-readable name
    fn title(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    fn category(&self) -> Category;

    fn fixable(&self) -> Fixable {
        Fixable::None
    }

    /// Link to the rule's documentation
    fn docs_url(&self) -> Option<&str>;

    /// Build the listeners used for one file
    fn create(&self, ctx: &CreateContext<'_>) -> anyhow::Result<ListenerMap>;
}

/// Serializable snapshot of a rule's metadata, for listings and reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMeta {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub fixable: Fixable,
    pub docs_url: Option<String>,
}

impl RuleMeta {
    #[must_use]
    pub fn of(rule: &dyn Rule) -> Self {
        Self {
            id: rule.id().to_string(),
            title: rule.title().to_string(),
            description: rule.description().to_string(),
            category: rule.category(),
            fixable: rule.fixable(),
            docs_url: rule.docs_url().map(str::to_string),
        }
    }
}

/// What a rule factory sees when it builds listeners for a file
#[derive(Debug, Clone, Copy)]
pub struct CreateContext<'a> {
    pub filename: &'a str,
    pub source_text: &'a str,
    pub options: Option<&'a serde_json::Value>,
}

impl<'a> CreateContext<'a> {
    #[must_use]
    pub const fn new(
        filename: &'a str,
        source_text: &'a str,
        options: Option<&'a serde_json::Value>,
    ) -> Self {
        Self {
            filename,
            source_text,
            options,
        }
    }

    /// Context used at registration to discover the tags a rule listens to
    #[must_use]
    pub const fn discovery(options: Option<&'a serde_json::Value>) -> Self {
        Self::new("", "", options)
    }

    /// Deserialize the rule options, falling back to `T::default()` when none are set
    pub fn options_or_default<T: DeserializeOwned + Default>(&self) -> anyhow::Result<T> {
        match self.options {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(T::default()),
        }
    }
}

/// A listener function
pub type ListenerFn = Box<dyn FnMut(&Node, &mut RuleContext<'_>) -> anyhow::Result<()>>;

/// The functions a rule runs for one tag
pub enum Listener {
    /// Shorthand for an enter-only listener
    Enter(ListenerFn),
    /// Called before (`enter`) and after (`exit`) a node's children are visited
    Hooks {
        enter: Option<ListenerFn>,
        exit: Option<ListenerFn>,
    },
}

impl Listener {
    pub fn enter<F>(f: F) -> Self
    where
        F: FnMut(&Node, &mut RuleContext<'_>) -> anyhow::Result<()> + 'static,
    {
        Self::Enter(Box::new(f))
    }

    pub fn exit<F>(f: F) -> Self
    where
        F: FnMut(&Node, &mut RuleContext<'_>) -> anyhow::Result<()> + 'static,
    {
        Self::Hooks {
            enter: None,
            exit: Some(Box::new(f)),
        }
    }

    pub fn enter_exit<F, G>(enter: F, exit: G) -> Self
    where
        F: FnMut(&Node, &mut RuleContext<'_>) -> anyhow::Result<()> + 'static,
        G: FnMut(&Node, &mut RuleContext<'_>) -> anyhow::Result<()> + 'static,
    {
        Self::Hooks {
            enter: Some(Box::new(enter)),
            exit: Some(Box::new(exit)),
        }
    }

    #[must_use]
    pub const fn hooks(enter: Option<ListenerFn>, exit: Option<ListenerFn>) -> Self {
        Self::Hooks { enter, exit }
    }

    const fn is_empty(&self) -> bool {
        matches!(
            self,
            Self::Hooks {
                enter: None,
                exit: None
            }
        )
    }

    pub(crate) fn into_parts(self) -> (Option<ListenerFn>, Option<ListenerFn>) {
        match self {
            Self::Enter(enter) => (Some(enter), None),
            Self::Hooks { enter, exit } => (enter, exit),
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enter(_) => f.write_str("Listener::Enter"),
            Self::Hooks { enter, exit } => f
                .debug_struct("Listener::Hooks")
                .field("enter", &enter.is_some())
                .field("exit", &exit.is_some())
                .finish(),
        }
    }
}

/// Listeners keyed by node tag name, in insertion order.
///
/// Keys are kept as text so that maps naming unknown tags can be reported
/// by [`validate_listener_map`] instead of being impossible to express.
#[derive(Debug, Default)]
pub struct ListenerMap {
    entries: Vec<(String, Listener)>,
}

impl ListenerMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the listener for `tag`, replacing any earlier one
    #[must_use]
    pub fn on(mut self, tag: impl AsRef<str>, listener: Listener) -> Self {
        self.insert(tag, listener);
        self
    }

    /// Shorthand for `on(tag, Listener::enter(f))`
    #[must_use]
    pub fn on_enter<F>(self, tag: impl AsRef<str>, f: F) -> Self
    where
        F: FnMut(&Node, &mut RuleContext<'_>) -> anyhow::Result<()> + 'static,
    {
        self.on(tag, Listener::enter(f))
    }

    pub fn insert(&mut self, tag: impl AsRef<str>, listener: Listener) {
        let tag = tag.as_ref();
        if let Some(entry) = self.entries.iter_mut().find(|(key, _)| key == tag) {
            entry.1 = listener;
        } else {
            self.entries.push((tag.to_string(), listener));
        }
    }

    /// Tag names, in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate and convert into tag-keyed listeners
    pub fn into_tagged(self) -> Result<Vec<(Tag, Listener)>, ValidationError> {
        validate_listener_map(&self)?;
        self.entries
            .into_iter()
            .map(|(key, listener)| Ok((parse_tag(&key)?, listener)))
            .collect()
    }
}

fn parse_tag(key: &str) -> Result<Tag, ValidationError> {
    key.parse::<Tag>()
        .map_err(|_| ValidationError::UnknownNodeType {
            tag: key.to_string(),
        })
}

/// Check the metadata of a rule
pub fn validate_rule(rule: &dyn Rule) -> Result<(), ValidationError> {
    for (field, value) in [
        ("id", rule.id()),
        ("title", rule.title()),
        ("description", rule.description()),
    ] {
        if value.trim().is_empty() {
            return Err(ValidationError::EmptyField { field });
        }
    }
    if rule.docs_url().is_none() {
        return Err(ValidationError::MissingDocsUrl);
    }
    Ok(())
}

/// Check a rule described as a structured record, such as a rule manifest
/// read by authoring tools.
///
/// Expected keys: `id`, `title`, `description` (non-empty strings),
/// `category`, `fixable` (recognised names) and `docs_url` (string).
pub fn validate_rule_manifest(candidate: &serde_json::Value) -> Result<(), ValidationError> {
    let record = candidate.as_object().ok_or(ValidationError::NotARecord)?;

    for field in ["id", "title", "description"] {
        let present = record
            .get(field)
            .and_then(serde_json::Value::as_str)
            .is_some_and(|s| !s.trim().is_empty());
        if !present {
            return Err(ValidationError::EmptyField { field });
        }
    }

    let text_of = |field: &str| {
        record
            .get(field)
            .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
            .unwrap_or_default()
    };
    text_of("category").parse::<Category>()?;
    text_of("fixable").parse::<Fixable>()?;

    if !record
        .get("docs_url")
        .is_some_and(serde_json::Value::is_string)
    {
        return Err(ValidationError::MissingDocsUrl);
    }

    Ok(())
}

/// Check that every key names a known tag and every listener has a function
pub fn validate_listener_map(map: &ListenerMap) -> Result<(), ValidationError> {
    for (key, listener) in &map.entries {
        parse_tag(key)?;
        if listener.is_empty() {
            return Err(ValidationError::EmptyListener { tag: key.clone() });
        }
    }
    Ok(())
}
