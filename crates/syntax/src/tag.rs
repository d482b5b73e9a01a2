use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The syntactic kind of a [`Node`](crate::Node).
///
/// The set is closed: rules may only key listeners on these tags, and trees
/// containing any other tag are rejected when they are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    // Statements
    Block,
    Do,
    Set,
    CompoundSet,
    While,
    Repeat,
    If,
    ElseIf,
    Fornum,
    Forin,
    Local,
    LocalFunction,
    FunctionDecl,
    Goto,
    Label,
    Return,
    Break,
    Continue,
    // Expressions
    Call,
    Invoke,
    Nil,
    Dots,
    True,
    False,
    Number,
    String,
    Function,
    Table,
    Pair,
    BinOp,
    UnOp,
    Paren,
    Id,
    Index,
}

/// Error returned when a tag name is not part of the closed tag set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown node tag '{0}'")]
pub struct UnknownTag(pub String);

impl Tag {
    /// Every known tag, in declaration order.
    pub const ALL: &'static [Tag] = &[
        Tag::Block,
        Tag::Do,
        Tag::Set,
        Tag::CompoundSet,
        Tag::While,
        Tag::Repeat,
        Tag::If,
        Tag::ElseIf,
        Tag::Fornum,
        Tag::Forin,
        Tag::Local,
        Tag::LocalFunction,
        Tag::FunctionDecl,
        Tag::Goto,
        Tag::Label,
        Tag::Return,
        Tag::Break,
        Tag::Continue,
        Tag::Call,
        Tag::Invoke,
        Tag::Nil,
        Tag::Dots,
        Tag::True,
        Tag::False,
        Tag::Number,
        Tag::String,
        Tag::Function,
        Tag::Table,
        Tag::Pair,
        Tag::BinOp,
        Tag::UnOp,
        Tag::Paren,
        Tag::Id,
        Tag::Index,
    ];

    /// The lowercase name used in serialized trees and listener maps.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Do => "do",
            Self::Set => "set",
            Self::CompoundSet => "compoundset",
            Self::While => "while",
            Self::Repeat => "repeat",
            Self::If => "if",
            Self::ElseIf => "elseif",
            Self::Fornum => "fornum",
            Self::Forin => "forin",
            Self::Local => "local",
            Self::LocalFunction => "localfunction",
            Self::FunctionDecl => "functiondecl",
            Self::Goto => "goto",
            Self::Label => "label",
            Self::Return => "return",
            Self::Break => "break",
            Self::Continue => "continue",
            Self::Call => "call",
            Self::Invoke => "invoke",
            Self::Nil => "nil",
            Self::Dots => "dots",
            Self::True => "true",
            Self::False => "false",
            Self::Number => "number",
            Self::String => "string",
            Self::Function => "function",
            Self::Table => "table",
            Self::Pair => "pair",
            Self::BinOp => "binop",
            Self::UnOp => "unop",
            Self::Paren => "paren",
            Self::Id => "id",
            Self::Index => "index",
        }
    }

    /// Fields holding child nodes, in traversal order.
    ///
    /// Each named field holds either a single node or an ordered list of
    /// nodes. Traversal is a generic walk over this table, so adding a tag
    /// only requires adding its row here.
    #[must_use]
    pub const fn child_fields(self) -> &'static [&'static str] {
        match self {
            Self::Block | Self::Do => &["body"],
            Self::Repeat => &["body", "condition"],
            Self::Set => &["targets", "values"],
            Self::CompoundSet => &["target", "value"],
            Self::While | Self::ElseIf => &["condition", "body"],
            Self::If => &["condition", "body", "elseifs", "orelse"],
            Self::Fornum => &["var", "start", "limit", "step", "body"],
            Self::Forin => &["names", "exprs", "body"],
            Self::Local => &["names", "values"],
            Self::LocalFunction | Self::FunctionDecl => &["name", "func"],
            Self::Return => &["values"],
            Self::Call => &["callee", "args"],
            Self::Invoke => &["receiver", "args"],
            Self::Function => &["params", "body"],
            Self::Table => &["fields"],
            Self::Pair => &["key", "value"],
            Self::BinOp => &["left", "right"],
            Self::UnOp => &["operand"],
            Self::Paren => &["expr"],
            Self::Index => &["object", "key"],
            Self::Goto
            | Self::Label
            | Self::Break
            | Self::Continue
            | Self::Nil
            | Self::Dots
            | Self::True
            | Self::False
            | Self::Number
            | Self::String
            | Self::Id => &[],
        }
    }

    /// Whether nodes of this tag never have children.
    #[must_use]
    pub const fn is_leaf(self) -> bool {
        self.child_fields().is_empty()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for Tag {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| UnknownTag(s.to_string()))
    }
}
