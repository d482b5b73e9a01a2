//! # lualint-config
//!
//! Reads lualint configuration files and applies them to a
//! [`RuleRegistry`](lualint_linter::RuleRegistry).
//!
//! ```yaml
//! include: ["src/**/*.luau"]
//! exclude: ["vendor/**"]
//! rules:
//!   no_empty_block: off
//!   max_nesting_depth: [error, { max: 3 }]
//!   prefer_generalized_iteration: { severity: warn }
//! ```

mod config;
mod loader;

pub use config::{LintConfig, LintRuleConfig, RuleSeverity, DEFAULT_TREE_SUFFIX};
pub use loader::{find_config, load_config, load_config_from_str, CONFIG_FILES};

use lualint_linter::LintError;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config in {}: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },

    #[error("Unsupported config format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Unknown lint rule '{name}'{}", did_you_mean(.suggestion.as_deref()))]
    UnknownRule {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Empty pattern in `{field}`")]
    EmptyPattern { field: &'static str },
}

fn did_you_mean(suggestion: Option<&str>) -> String {
    suggestion.map_or_else(String::new, |s| format!(" (did you mean '{s}'?)"))
}

impl From<ConfigError> for LintError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(io) => Self::from(io),
            ConfigError::Invalid { ref path, .. } | ConfigError::UnsupportedFormat(ref path) => {
                Self::config(err.to_string()).with_file(path.display().to_string())
            }
            ConfigError::UnknownRule { .. } | ConfigError::EmptyPattern { .. } => {
                Self::config(err.to_string())
            }
        }
    }
}
