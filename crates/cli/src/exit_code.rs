//! Exit codes for the lualint CLI.
//!
//! This module defines distinct exit codes for different outcomes,
//! allowing scripts and CI systems to tell a failing lint run apart from
//! a broken configuration or an unreadable file.

/// Exit codes used by the CLI.
///
/// These follow standard Unix conventions where 0 indicates success
/// and non-zero values indicate different types of failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success - no failing issues
    Success = 0,
    /// Issues at `error` severity, or more warnings than allowed
    LintErrors = 1,
    /// Configuration error (invalid config file, unknown rule)
    ConfigError = 2,
    /// Some rules failed while the rest ran to completion
    Degraded = 3,
    /// I/O error (file read/write failure)
    IoError = 4,
    /// Parse error (unreadable syntax tree)
    ParseError = 5,
}

impl ExitCode {
    /// Exit the process with this exit code.
    pub fn exit(self) -> ! {
        std::process::exit(self as i32)
    }

    /// Get the numeric value of this exit code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::LintErrors => write!(f, "lint errors"),
            Self::ConfigError => write!(f, "configuration error"),
            Self::Degraded => write!(f, "degraded run"),
            Self::IoError => write!(f, "I/O error"),
            Self::ParseError => write!(f, "parse error"),
        }
    }
}
