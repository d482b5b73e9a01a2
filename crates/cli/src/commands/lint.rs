use crate::commands::common::{config_failure, CommandContext};
use crate::commands::fix::{self, FileFixes};
use crate::files::{discover_files, load_source_file, SourceFile};
use crate::{ExitCode, OutputFormat, OutputOptions};
use anyhow::Result;
use colored::Colorize;
use lualint_linter::{ErrorKind, LintError, LintIssue, LintResult, Linter, Severity};
use std::path::PathBuf;
use std::time::Instant;

pub struct LintArgs {
    pub paths: Vec<PathBuf>,
    pub format: OutputFormat,
    pub fix: bool,
    pub fix_dry_run: bool,
    pub max_warnings: Option<usize>,
}

/// A linted file
struct FileReport {
    file: SourceFile,
    result: LintResult,
    fixes: Option<FileFixes>,
}

/// Counts across the whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Totals {
    files: usize,
    errors: usize,
    warnings: usize,
    infos: usize,
    rule_errors: usize,
    degraded_files: usize,
    io_failures: usize,
    parse_failures: usize,
    fixes: usize,
}

impl Totals {
    fn collect(reports: &[FileReport], failures: &[LintError]) -> Self {
        let mut totals = Self {
            files: reports.len() + failures.len(),
            ..Self::default()
        };

        for report in reports {
            totals.errors += report.result.count_severity(Severity::Error);
            totals.warnings += report.result.count_severity(Severity::Warning);
            totals.infos += report.result.count_severity(Severity::Info);
            totals.rule_errors += report.result.errors.len();
            if report.result.is_degraded() {
                totals.degraded_files += 1;
            }
            totals.fixes += report.fixes.as_ref().map_or(0, |f| f.applied.len());
        }

        for failure in failures {
            match failure.kind {
                ErrorKind::ParseError => totals.parse_failures += 1,
                _ => totals.io_failures += 1,
            }
        }

        totals
    }

    /// File failures first, then failing issues, then rule errors
    fn exit_code(&self, max_warnings: Option<usize>) -> ExitCode {
        if self.io_failures > 0 {
            ExitCode::IoError
        } else if self.parse_failures > 0 {
            ExitCode::ParseError
        } else if self.errors > 0 || max_warnings.is_some_and(|max| self.warnings > max) {
            ExitCode::LintErrors
        } else if self.rule_errors > 0 {
            ExitCode::Degraded
        } else {
            ExitCode::Success
        }
    }
}

#[tracing::instrument(skip_all, fields(paths = args.paths.len()))]
pub fn run(config_path: Option<PathBuf>, args: &LintArgs, opts: OutputOptions) -> Result<ExitCode> {
    let start_time = Instant::now();

    let ctx = match CommandContext::load(config_path) {
        Ok(ctx) => ctx,
        Err(err) => return config_failure(err),
    };

    let roots = if args.paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        args.paths.clone()
    };
    let paths = match discover_files(&roots, &ctx.config, &ctx.base_dir) {
        Ok(paths) => paths,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            return Ok(ExitCode::IoError);
        }
    };

    let linter = Linter::new(&ctx.registry);
    let mut reports = Vec::with_capacity(paths.len());
    let mut failures = Vec::new();

    for path in &paths {
        match load_source_file(path, ctx.config.tree_suffix()) {
            Ok(file) => {
                let result = linter.lint_file(&file.tree, &file.source, &file.display);
                reports.push(FileReport {
                    file,
                    result,
                    fixes: None,
                });
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Failed to load file");
                failures.push(err);
            }
        }
    }

    if args.fix || args.fix_dry_run {
        for report in &mut reports {
            let Some(plan) = fix::plan(&report.file.source, &report.result) else {
                continue;
            };
            if args.fix_dry_run {
                report.fixes = Some(plan.fixes);
                continue;
            }
            match fix::write(&report.file.path, plan, &mut report.result) {
                Ok(fixes) => report.fixes = Some(fixes),
                Err(err) => failures.push(err),
            }
        }
    }

    let totals = Totals::collect(&reports, &failures);
    let code = totals.exit_code(args.max_warnings);

    match args.format {
        OutputFormat::Human => {
            print_human(&reports, &failures);
            if opts.show_info {
                print_summary(&totals, args, start_time);
            }
        }
        OutputFormat::Json => print_json(&reports, &failures, &totals, code)?,
        OutputFormat::Github => print_github(&reports, &failures),
    }

    Ok(code)
}

fn severity_label(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Error => "error:".red().bold(),
        Severity::Warning => "warning:".yellow().bold(),
        Severity::Info => "info:".cyan().bold(),
    }
}

fn failure_file(failure: &LintError) -> &str {
    failure.context.file.as_deref().unwrap_or("<unknown>")
}

fn print_human(reports: &[FileReport], failures: &[LintError]) {
    for failure in failures {
        println!(
            "\n{}: {} {}",
            failure_file(failure),
            "error:".red().bold(),
            failure.message
        );
        if let Some(cause) = &failure.context.cause {
            println!("  {}: {}", "cause".dimmed(), cause.dimmed());
        }
    }

    for report in reports {
        let file = &report.file.display;

        if let Some(fixes) = &report.fixes {
            print_human_fixes(file, fixes);
        }

        for issue in &report.result.issues {
            println!(
                "\n{}:{}:{}: {} {}",
                file,
                issue.range.start.display_line(),
                issue.range.start.display_column(),
                severity_label(issue.severity),
                issue.message
            );
            println!("  {}: {}", "rule".dimmed(), issue.rule_id.dimmed());
        }

        for error in &report.result.errors {
            println!("\n{}: {} {}", file, "rule error:".magenta().bold(), error.message);
            if let Some(rule_id) = error.rule_id() {
                println!("  {}: {}", "rule".dimmed(), rule_id.dimmed());
            }
        }
    }
}

fn print_human_fixes(file: &str, fixes: &FileFixes) {
    if fixes.written {
        println!(
            "{} {} ({})",
            "✓".green(),
            file,
            format!("{} fix(es)", fixes.applied.len()).dimmed()
        );
    } else {
        println!("{}:", file.bold());
        for planned in &fixes.applied {
            println!("  {} {} ({})", "→".green(), planned.message, planned.rule.dimmed());
        }
    }
    for conflict in &fixes.conflicts {
        println!(
            "  {} fix for {} at {} skipped: {}",
            "✗".yellow(),
            conflict.rule_id,
            conflict.range,
            conflict.reason
        );
    }
}

fn print_summary(totals: &Totals, args: &LintArgs, start_time: Instant) {
    println!();

    if totals.fixes > 0 && args.fix {
        println!("{}", format!("✓ Fixed {} issue(s)", totals.fixes).green().bold());
    } else if totals.fixes > 0 && args.fix_dry_run {
        println!("{}", format!("ℹ Would fix {} issue(s)", totals.fixes).cyan().bold());
    }

    let failed_files = totals.io_failures + totals.parse_failures;
    if failed_files > 0 {
        println!("{}", format!("✗ {failed_files} file(s) could not be linted").red());
    }

    if totals.rule_errors > 0 {
        println!(
            "{}",
            format!(
                "⚠ Degraded: {} rule error(s) in {} file(s); results may be incomplete",
                totals.rule_errors, totals.degraded_files
            )
            .magenta()
        );
    }

    let (errors, warnings) = (totals.errors, totals.warnings);
    if errors == 0 && warnings == 0 && totals.infos == 0 {
        println!("{}", "✓ No linting issues found!".green().bold());
    } else if errors == 0 {
        println!(
            "{}",
            format!("✓ Linting passed with {warnings} warning(s)").yellow().bold()
        );
    } else if warnings == 0 {
        println!("{}", format!("✗ Found {errors} error(s)").red());
    } else {
        println!(
            "{}",
            format!("✗ Found {errors} error(s) and {warnings} warning(s)").red()
        );
    }

    if let Some(max) = args.max_warnings {
        if warnings > max {
            println!(
                "{}",
                format!("✗ Too many warnings ({warnings} > {max})").red()
            );
        }
    }

    println!(
        "  {} {} file(s) in {:.2}s",
        "⏱".dimmed(),
        totals.files,
        start_time.elapsed().as_secs_f64()
    );
}

fn issue_json(issue: &LintIssue) -> serde_json::Value {
    let (start, end) = (issue.range.start, issue.range.end);
    serde_json::json!({
        "message": issue.message,
        "severity": issue.severity,
        "rule": issue.rule_id,
        "node": issue.node_tag,
        "fix": issue.fix,
        "location": {
            "start": { "line": start.display_line(), "column": start.display_column(), "offset": start.offset },
            "end": { "line": end.display_line(), "column": end.display_column(), "offset": end.offset }
        }
    })
}

fn print_json(
    reports: &[FileReport],
    failures: &[LintError],
    totals: &Totals,
    code: ExitCode,
) -> Result<()> {
    let files: Vec<serde_json::Value> = reports
        .iter()
        .map(|report| {
            serde_json::json!({
                "file": report.file.display,
                "issues": report.result.issues.iter().map(issue_json).collect::<Vec<_>>(),
                "errors": report.result.errors,
                "fixes": report.fixes,
                "stats": report.result.stats,
            })
        })
        .collect();

    let output = serde_json::json!({
        "success": code == ExitCode::Success,
        "degraded": totals.rule_errors > 0,
        "files": files,
        "failures": failures,
        "stats": {
            "total_files": totals.files,
            "total_errors": totals.errors,
            "total_warnings": totals.warnings,
            "total_infos": totals.infos,
            "rule_errors": totals.rule_errors,
            "fixes": totals.fixes
        }
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Escape text for a GitHub workflow command message
fn escape_github(text: &str) -> String {
    text.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn print_github(reports: &[FileReport], failures: &[LintError]) {
    for failure in failures {
        println!(
            "::error file={}::{}",
            failure_file(failure),
            escape_github(&failure.message)
        );
    }

    for report in reports {
        let file = &report.file.display;
        for issue in &report.result.issues {
            let command = match issue.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Info => "notice",
            };
            let (start, end) = (issue.range.start, issue.range.end);
            println!(
                "::{command} file={file},line={},col={},endLine={},endColumn={}::{} [{}]",
                start.display_line(),
                start.display_column(),
                end.display_line(),
                end.display_column(),
                escape_github(&issue.message),
                issue.rule_id
            );
        }
        for error in &report.result.errors {
            println!(
                "::warning file={file}::Rule {} failed: {}",
                error.rule_id().unwrap_or("<engine>"),
                escape_github(&error.message)
            );
        }
    }
}
