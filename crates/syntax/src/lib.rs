//! # Lua Syntax Trees
//!
//! This crate defines the tree shape the lualint engine traverses. Parsing Lua
//! source is not done here: a parser is an external capability expressed by the
//! [`Parse`] trait, and any parser able to emit the JSON tree format can feed
//! the engine through [`JsonTreeParser`].
//!
//! ## Tree shape
//!
//! Every [`Node`] has a [`Tag`] from a closed set, an optional [`RawLocation`],
//! and tag-specific fields. Which fields hold children is a static table
//! ([`Tag::child_fields`]), so a traversal is one generic walk:
//!
//! ```rust
//! use lualint_syntax::{Node, Tag};
//!
//! fn count(node: &Node) -> usize {
//!     1 + node.child_nodes().map(count).sum::<usize>()
//! }
//!
//! assert_eq!(count(&Node::new(Tag::Paren).with_child("expr", Node::new(Tag::Nil))), 2);
//! ```

mod node;
mod tag;

pub use node::{Field, Node, NodeId, Position, RawLocation, Tree};
pub use tag::{Tag, UnknownTag};

/// A failure to turn source text into a [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// 1-indexed line where the error occurred, when known
    pub line: Option<usize>,
    /// 1-indexed column where the error occurred, when known
    pub column: Option<usize>,
}

impl ParseError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    #[must_use]
    pub const fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

/// The parser capability: `parse(text) -> tree | ParseError`.
pub trait Parse {
    fn parse(&self, source: &str) -> Result<Tree, ParseError>;
}

/// Reads trees that an external parser serialized as JSON.
///
/// The expected document is `{"body": [<node>, ...]}` where each node is
/// `{"tag": "...", "loc": {...}, <field>: <node | [node] | scalar>}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTreeParser;

impl Parse for JsonTreeParser {
    #[tracing::instrument(skip_all, fields(size = source.len()))]
    fn parse(&self, source: &str) -> Result<Tree, ParseError> {
        serde_json::from_str::<Tree>(source).map_err(|e| {
            tracing::debug!(error = %e, "Failed to read serialized tree");
            ParseError::new(format!("invalid syntax tree: {e}")).at(e.line(), e.column())
        })
    }
}
