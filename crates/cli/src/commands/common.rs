use crate::ExitCode;
use anyhow::{Context, Result};
use colored::Colorize;
use lualint_config::{find_config, load_config, ConfigError, LintConfig};
use lualint_linter::RuleRegistry;
use std::path::{Path, PathBuf};

/// Everything a command needs before touching source files
pub struct CommandContext {
    pub config: LintConfig,
    /// Directory globs in the config are relative to
    pub base_dir: PathBuf,
    /// Built-in rules with the config applied
    pub registry: RuleRegistry,
}

impl CommandContext {
    /// Load the config (explicit path or discovered upward from the current
    /// directory) and build the rule registry from it.
    ///
    /// Config problems surface as [`ConfigError`] inside the returned error.
    #[tracing::instrument(skip_all)]
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to read current directory")?;

        let config_path = match config_path {
            Some(path) => Some(std::path::absolute(&path)?),
            None => find_config(&current_dir)?,
        };

        let (config, base_dir) = match config_path {
            Some(path) => {
                let config = load_config(&path)?;
                let base_dir = path.parent().map_or_else(|| current_dir.clone(), Path::to_path_buf);
                (config, base_dir)
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                (LintConfig::default(), current_dir)
            }
        };

        let mut registry = RuleRegistry::with_builtin_rules()?;
        config.apply(&mut registry)?;

        Ok(Self {
            config,
            base_dir,
            registry,
        })
    }
}

/// Print a config failure and pick its exit code, or hand back any other error
pub fn config_failure(err: anyhow::Error) -> Result<ExitCode> {
    match err.downcast_ref::<ConfigError>() {
        Some(ConfigError::Io(io_err)) => {
            eprintln!("{} {io_err}", "error:".red().bold());
            Ok(ExitCode::IoError)
        }
        Some(config_err) => {
            eprintln!("{} {config_err}", "config error:".red().bold());
            Ok(ExitCode::ConfigError)
        }
        None => Err(err),
    }
}
