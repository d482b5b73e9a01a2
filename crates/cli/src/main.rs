mod commands;
mod exit_code;
mod files;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use exit_code::ExitCode;

#[derive(Parser)]
#[command(name = "lualint")]
#[command(about = "Lint Lua and Luau source files", long_about = None)]
#[command(version)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Path to lualint config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Force colored output even when not a TTY
    #[arg(long, global = true, conflicts_with = "no_color")]
    color: bool,

    /// Disable colored output
    #[arg(long, global = true, conflicts_with = "color")]
    no_color: bool,

    /// Suppress all output except issues and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// How results are presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputOptions {
    /// Whether to show informational output (fix notes, summaries)
    pub show_info: bool,
    /// Forced color choice; `None` leaves it to TTY detection
    pub color: Option<bool>,
}

impl OutputOptions {
    /// Resolve output options from flags and the environment.
    ///
    /// Color precedence: `--color`, `--no-color`, `NO_COLOR` (any value),
    /// `CLICOLOR_FORCE` (non-empty and not `0`), then `CLICOLOR=0`.
    /// See <https://no-color.org/> and <https://bixense.com/clicolors/>.
    fn resolve(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> Self {
        let color = if cli.color {
            Some(true)
        } else if cli.no_color || env("NO_COLOR").is_some() {
            Some(false)
        } else if let Some(force) = env("CLICOLOR_FORCE") {
            (!force.is_empty() && force != "0").then_some(true)
        } else {
            (env("CLICOLOR").as_deref() == Some("0")).then_some(false)
        };

        Self {
            show_info: !cli.quiet,
            color,
        }
    }
}

fn process_env(name: &str) -> Option<String> {
    std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
}

#[derive(Subcommand)]
enum Commands {
    /// Run lint rules on Lua and Luau files
    ///
    /// Each source file is read together with its sidecar syntax tree
    /// (`<file>.ast.json` unless the config sets `tree_suffix`).
    Lint {
        /// Files or directories to lint (defaults to the current directory)
        #[arg(value_name = "PATH")]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Automatically apply fixes and write the files back
        #[arg(long, conflicts_with = "fix_dry_run")]
        fix: bool,

        /// Show what would be fixed without modifying files
        #[arg(long, conflicts_with = "fix")]
        fix_dry_run: bool,

        /// Fail when more than this many warnings are reported
        #[arg(long, value_name = "N")]
        max_warnings: Option<usize>,
    },

    /// List the available rules and their configured state
    Rules {
        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    Human,
    /// JSON output for tooling
    Json,
    /// GitHub Actions workflow commands for PR annotations
    Github,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing();

    let output_opts = OutputOptions::resolve(&cli, process_env);
    if let Some(color) = output_opts.color {
        colored::control::set_override(color);
    }

    let code = match cli.command {
        Commands::Lint {
            paths,
            format,
            fix,
            fix_dry_run,
            max_warnings,
        } => commands::lint::run(
            cli.config,
            &commands::lint::LintArgs {
                paths,
                format,
                fix,
                fix_dry_run,
                max_warnings,
            },
            output_opts,
        )?,
        Commands::Rules { format } => commands::rules::run(cli.config, format)?,
    };

    if code != ExitCode::Success {
        tracing::debug!(%code, "Exiting with failure");
        code.exit();
    }
    Ok(())
}

/// Initialize tracing, filtered by `RUST_LOG` and written to stderr
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off")),
        )
        .with_writer(std::io::stderr)
        .init();
}
