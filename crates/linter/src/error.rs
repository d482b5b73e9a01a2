use crate::diagnostics::SourceRange;
use lualint_syntax::ParseError;
use serde::Serialize;

pub type Result<T> = std::result::Result<T, LintError>;

/// The flat error taxonomy shared by the engine and its shells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    ParseError,
    ConfigError,
    RuleError,
    FileSystemError,
    ValidationError,
    InternalError,
}

impl ErrorKind {
    /// Whether processing may continue after an error of this kind.
    ///
    /// Only internal errors stop a run by default.
    #[must_use]
    pub const fn should_continue(self) -> bool {
        !matches!(self, Self::InternalError)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ParseError => "ParseError",
            Self::ConfigError => "ConfigError",
            Self::RuleError => "RuleError",
            Self::FileSystemError => "FileSystemError",
            Self::ValidationError => "ValidationError",
            Self::InternalError => "InternalError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional details attached to a [`LintError`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<SourceRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    /// Rendered underlying cause
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// Backtrace or panic payload text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    /// The failure is expected to clear up on retry
    #[serde(skip)]
    pub transient: bool,
}

/// A structured engine, rule, or shell failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct LintError {
    pub kind: ErrorKind,
    pub message: String,
    pub context: ErrorContext,
}

impl LintError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// A failure attributed to one rule
    #[must_use]
    pub fn rule(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::new(ErrorKind::RuleError, message);
        err.context.rule_id = Some(rule_id.into());
        err
    }

    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigError, message)
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    #[must_use]
    pub fn file_system(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileSystemError, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.context.file = Some(file.into());
        self
    }

    #[must_use]
    pub const fn with_range(mut self, range: SourceRange) -> Self {
        self.context.range = Some(range);
        self
    }

    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.context.cause = Some(cause.into());
        self
    }

    #[must_use]
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.context.trace = Some(trace.into());
        self
    }

    #[must_use]
    pub const fn should_continue(&self) -> bool {
        self.kind.should_continue()
    }

    /// Transient file-system failures are worth retrying
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.kind, ErrorKind::FileSystemError) && self.context.transient
    }

    #[must_use]
    pub fn rule_id(&self) -> Option<&str> {
        self.context.rule_id.as_deref()
    }
}

impl From<ParseError> for LintError {
    fn from(err: ParseError) -> Self {
        let mut lint_err = Self::new(ErrorKind::ParseError, err.message);
        if let (Some(line), Some(column)) = (err.line, err.column) {
            lint_err.context.cause = Some(format!("at line {line}, column {column}"));
        }
        lint_err
    }
}

impl From<std::io::Error> for LintError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind as Io;

        let mut lint_err = Self::file_system(err.to_string());
        lint_err.context.transient = matches!(
            err.kind(),
            Io::Interrupted | Io::WouldBlock | Io::TimedOut
        );
        lint_err
    }
}

impl From<anyhow::Error> for LintError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string()).with_cause(format!("{err:#}"))
    }
}
