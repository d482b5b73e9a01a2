use crate::commands::common::{config_failure, CommandContext};
use crate::{ExitCode, OutputFormat};
use anyhow::Result;
use colored::Colorize;
use lualint_linter::{Fixable, RegisteredRule, RuleMeta, Severity};
use lualint_syntax::Tag;
use serde::Serialize;
use std::path::PathBuf;

/// A rule as listed by `lualint rules`
#[derive(Debug, Serialize)]
struct RuleListing<'a> {
    #[serde(flatten)]
    meta: RuleMeta,
    enabled: bool,
    severity: Severity,
    node_types: &'a [Tag],
}

impl<'a> From<&'a RegisteredRule> for RuleListing<'a> {
    fn from(rule: &'a RegisteredRule) -> Self {
        Self {
            meta: RuleMeta::of(rule.rule()),
            enabled: rule.is_enabled(),
            severity: rule.severity(),
            node_types: rule.node_types(),
        }
    }
}

pub fn run(config_path: Option<PathBuf>, format: OutputFormat) -> Result<ExitCode> {
    let ctx = match CommandContext::load(config_path) {
        Ok(ctx) => ctx,
        Err(err) => return config_failure(err),
    };

    let listings: Vec<RuleListing<'_>> = ctx.registry.get_all_rules().iter().map(RuleListing::from).collect();

    match format {
        OutputFormat::Human => print_human(&listings),
        OutputFormat::Json | OutputFormat::Github => {
            println!("{}", serde_json::to_string_pretty(&listings)?);
        }
    }

    Ok(ExitCode::Success)
}

fn print_human(listings: &[RuleListing<'_>]) {
    for listing in listings {
        let meta = &listing.meta;
        let state = if listing.enabled {
            match listing.severity {
                Severity::Error => "error".red(),
                Severity::Warning => "warning".yellow(),
                Severity::Info => "info".cyan(),
            }
        } else {
            "off".dimmed()
        };
        let fixable = match meta.fixable {
            Fixable::None => String::new(),
            other => format!(" ({other} fix)"),
        };

        println!("{} [{}] {}{}", meta.id.bold(), meta.category, state, fixable.dimmed());
        println!("  {}", meta.title);
        if let Some(url) = meta.docs_url.as_deref().filter(|url| !url.is_empty()) {
            println!("  {}", url.dimmed());
        }
    }
}
