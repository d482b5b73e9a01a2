use crate::Tag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A 0-indexed line/column position. Columns count bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Location information as produced by the parser.
///
/// Tokens carry only their start and literal text. Tokens never span lines,
/// so their end is the start column advanced by the text length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawLocation {
    Span { start: Position, end: Position },
    Token { start: Position, text: String },
}

impl RawLocation {
    #[must_use]
    pub const fn start(&self) -> Position {
        match self {
            Self::Span { start, .. } | Self::Token { start, .. } => *start,
        }
    }

    #[must_use]
    pub fn end(&self) -> Position {
        match self {
            Self::Span { end, .. } => *end,
            Self::Token { start, text } => Position::new(start.line, start.column + text.len()),
        }
    }
}

/// A tag-specific field of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Field {
    Node(Box<Node>),
    Nodes(Vec<Node>),
    Bool(bool),
    Number(f64),
    Text(String),
}

/// A syntax tree node.
///
/// Nodes are immutable once built. Which fields hold children is decided by
/// [`Tag::child_fields`]; any other field is tag-specific data such as an
/// identifier name or an operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub tag: Tag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<RawLocation>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Field>,
}

impl Node {
    #[must_use]
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            loc: None,
            fields: BTreeMap::new(),
        }
    }

    /// Attach a `start..end` span.
    #[must_use]
    pub fn with_span(mut self, start: Position, end: Position) -> Self {
        self.loc = Some(RawLocation::Span { start, end });
        self
    }

    /// Attach a token location; the end is derived from `text`.
    #[must_use]
    pub fn with_token(mut self, start: Position, text: impl Into<String>) -> Self {
        self.loc = Some(RawLocation::Token {
            start,
            text: text.into(),
        });
        self
    }

    #[must_use]
    pub fn with_child(mut self, field: &str, child: Node) -> Self {
        self.fields
            .insert(field.to_string(), Field::Node(Box::new(child)));
        self
    }

    #[must_use]
    pub fn with_children(mut self, field: &str, children: Vec<Node>) -> Self {
        self.fields.insert(field.to_string(), Field::Nodes(children));
        self
    }

    #[must_use]
    pub fn with_text(mut self, field: &str, text: impl Into<String>) -> Self {
        self.fields
            .insert(field.to_string(), Field::Text(text.into()));
        self
    }

    #[must_use]
    pub fn with_number(mut self, field: &str, value: f64) -> Self {
        self.fields.insert(field.to_string(), Field::Number(value));
        self
    }

    /// Identity of this node for the lifetime of the borrow it was reached through.
    #[must_use]
    pub fn id(&self) -> NodeId {
        NodeId(std::ptr::from_ref(self) as usize)
    }

    /// The single child stored under `field`, if any.
    #[must_use]
    pub fn child(&self, field: &str) -> Option<&Node> {
        match self.fields.get(field)? {
            Field::Node(node) => Some(node),
            _ => None,
        }
    }

    /// The children stored under `field`; a single child is returned as a one-element slice.
    #[must_use]
    pub fn children(&self, field: &str) -> &[Node] {
        match self.fields.get(field) {
            Some(Field::Nodes(nodes)) => nodes,
            Some(Field::Node(node)) => std::slice::from_ref(node.as_ref()),
            _ => &[],
        }
    }

    #[must_use]
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field)? {
            Field::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn number(&self, field: &str) -> Option<f64> {
        match self.fields.get(field)? {
            Field::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Identifier name for `id` nodes.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.text("name")
    }

    /// Iterate the child nodes in traversal order, following [`Tag::child_fields`].
    pub fn child_nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.tag
            .child_fields()
            .iter()
            .flat_map(move |field| self.children(field).iter())
    }
}

/// Opaque per-node identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A parsed file: the ordered statements of its root block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tree {
    pub body: Vec<Node>,
}

impl Tree {
    #[must_use]
    pub fn new(body: Vec<Node>) -> Self {
        Self { body }
    }

    /// Number of nodes reachable by traversal (nodes without a location are not counted,
    /// nor are their descendants).
    #[must_use]
    pub fn located_node_count(&self) -> usize {
        fn count(node: &Node) -> usize {
            if node.loc.is_none() {
                return 0;
            }
            1 + node.child_nodes().map(count).sum::<usize>()
        }
        self.body.iter().map(count).sum()
    }
}
