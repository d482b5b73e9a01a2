//! Constructors for located syntax trees.
//!
//! Positions are 0-indexed and columns count bytes, matching what a parser
//! hands to the engine. Only the shapes tests reach for often get a helper;
//! anything else is `span(tag, start, end)` plus `Node::with_*`.
//!
//! ```
//! use lualint_test_utils::{call, id, pos, tree};
//!
//! // print(x)
//! let file = tree(vec![call(
//!     pos(0, 0),
//!     pos(0, 8),
//!     id("print", pos(0, 0)),
//!     vec![id("x", pos(0, 6))],
//! )]);
//! assert_eq!(file.located_node_count(), 3);
//! ```
use lualint_syntax::{Node, Position, Tag, Tree};

#[must_use]
pub const fn pos(line: usize, column: usize) -> Position {
    Position::new(line, column)
}

#[must_use]
pub fn tree(body: Vec<Node>) -> Tree {
    Tree::new(body)
}

/// Any node with a `start..end` span
#[must_use]
pub fn span(tag: Tag, start: Position, end: Position) -> Node {
    Node::new(tag).with_span(start, end)
}

#[must_use]
pub fn id(name: &str, start: Position) -> Node {
    Node::new(Tag::Id)
        .with_token(start, name)
        .with_text("name", name)
}

/// Numeric literal; `text` is its source spelling
#[must_use]
pub fn number(text: &str, start: Position) -> Node {
    let value = text.parse().unwrap_or_default();
    Node::new(Tag::Number)
        .with_token(start, text)
        .with_number("value", value)
}

/// String literal; `text` is its source spelling, quotes included
#[must_use]
pub fn string(text: &str, start: Position) -> Node {
    let value = text.trim_matches(|c| c == '"' || c == '\'');
    Node::new(Tag::String)
        .with_token(start, text)
        .with_text("value", value)
}

#[must_use]
pub fn block(start: Position, end: Position, body: Vec<Node>) -> Node {
    span(Tag::Block, start, end).with_children("body", body)
}

#[must_use]
pub fn call(start: Position, end: Position, callee: Node, args: Vec<Node>) -> Node {
    span(Tag::Call, start, end)
        .with_child("callee", callee)
        .with_children("args", args)
}

#[must_use]
pub fn forin(start: Position, end: Position, names: Vec<Node>, exprs: Vec<Node>, body: Node) -> Node {
    span(Tag::Forin, start, end)
        .with_children("names", names)
        .with_children("exprs", exprs)
        .with_child("body", body)
}

#[must_use]
pub fn local(start: Position, end: Position, names: Vec<Node>, values: Vec<Node>) -> Node {
    span(Tag::Local, start, end)
        .with_children("names", names)
        .with_children("values", values)
}

#[must_use]
pub fn binop(start: Position, end: Position, op: &str, left: Node, right: Node) -> Node {
    span(Tag::BinOp, start, end)
        .with_text("op", op)
        .with_child("left", left)
        .with_child("right", right)
}
