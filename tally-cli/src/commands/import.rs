//! Import command - normalize a CSV file with a saved profile

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;

use super::{get_context, get_logger, log_event};
use crate::output;
use tally_core::domain::RuleTarget;
use tally_core::services::CategorizeResult;
use tally_core::{export, ImportReport, LogEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

pub struct ImportArgs {
    pub file: PathBuf,
    pub profile: String,
    pub account: Option<String>,
    pub preview: bool,
    pub limit: usize,
    pub save_accounts: bool,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub categorize: bool,
}

/// Refuse flag combinations that would silently change the output
fn check_args(args: &ImportArgs) -> Result<()> {
    if args.format == OutputFormat::Table && args.output.is_some() {
        anyhow::bail!("--output needs --format csv or --format json");
    }
    if args.format == OutputFormat::Csv && args.categorize {
        anyhow::bail!("--categorize is not available with --format csv; use table or json");
    }
    Ok(())
}

pub fn run(args: ImportArgs) -> Result<()> {
    check_args(&args)?;
    let ctx = get_context()?;

    let report = if args.preview {
        ctx.import_service
            .preview(&args.file, &args.profile, args.account.as_deref(), args.limit)?
    } else {
        ctx.import_service.import_file(
            &args.file,
            &args.profile,
            args.account.as_deref(),
            args.save_accounts,
        )?
    };

    log_event(
        &get_logger(),
        LogEvent::new(if args.preview { "import_previewed" } else { "import_completed" })
            .with_command("import")
            .with_profile(args.profile.as_str()),
    );

    let categories = if args.categorize {
        Some(ctx.rule_service.categorize(&report.transactions)?)
    } else {
        None
    };

    print_diagnostics(&report, categories.as_ref());

    match args.format {
        OutputFormat::Table => print_table(&report, categories.as_ref(), &args),
        OutputFormat::Csv => write_output(&args, |w| {
            export::write_csv(&report.transactions, w)?;
            Ok(())
        }),
        OutputFormat::Json => write_output(&args, |w| {
            let json = match &categories {
                Some(categories) => serde_json::to_string_pretty(&serde_json::json!({
                    "transactions": report.transactions,
                    "categories": categories,
                }))?,
                None => export::to_json(&report.transactions)?,
            };
            writeln!(w, "{}", json)?;
            Ok(())
        }),
    }
}

/// Write to `--output` or stdout
fn write_output<F>(args: &ImportArgs, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    match &args.output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write(&mut file)?;
            eprintln!("{} Wrote {}", "✓".green(), path.display());
            Ok(())
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write(&mut lock)
        }
    }
}

/// Warnings, skipped rows and account hints, always on stderr
fn print_diagnostics(report: &ImportReport, categories: Option<&CategorizeResult>) {
    for warning in &report.warnings {
        output::warning(&format!("warning: {}", warning));
    }
    for skipped in &report.skipped {
        eprintln!("{}", format!("skipped line {}: {}", skipped.line, skipped.reason).dimmed());
    }
    if let Some(categories) = categories {
        for failed in &categories.failed_rules {
            output::warning(&format!("rule '{}' ignored: {}", failed.pattern, failed.error));
        }
    }
    if !report.discovered_accounts.is_empty() {
        output::warning(&format!(
            "{} new account value(s): {}",
            report.discovered_accounts.len(),
            report.discovered_accounts.join(", ")
        ));
    }
}

fn print_table(report: &ImportReport, categories: Option<&CategorizeResult>, args: &ImportArgs) -> Result<()> {
    if args.preview {
        println!("{}", "PREVIEW MODE - No changes applied".yellow());
    }
    println!();

    if report.transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    let mut table = output::create_table();
    let mut header = vec!["Line", "Date", "Amount", "Description", "Account"];
    if categories.is_some() {
        header.push("Category");
    }
    table.set_header(header);

    for (idx, tx) in report.transactions.iter().enumerate() {
        let mut row = vec![
            tx.source_line.to_string(),
            tx.date.to_string(),
            output::format_amount(tx.amount).to_string(),
            tx.description.clone(),
            tx.account_id.clone(),
        ];
        if let Some(categories) = categories {
            row.push(category_cell(categories, idx));
        }
        table.add_row(row);
    }
    println!("{}", table);

    println!();
    println!("  Transactions: {}", report.transactions.len());
    println!("  Skipped:      {}", report.skipped.len());
    if let Some(categories) = categories {
        println!("  Categorized:  {}", categories.categorized);
    }
    if args.save_accounts && !report.discovered_accounts.is_empty() {
        output::info(&format!(
            "Saved new account values to '{}'; assign them with: tally profile assign {}",
            args.profile, args.profile
        ));
    }
    Ok(())
}

fn category_cell(categories: &CategorizeResult, idx: usize) -> String {
    let Some(result) = categories.results.get(idx) else {
        return String::new();
    };
    let mut cell = match (&result.categorization.target, &result.category_path) {
        (_, Some(path)) => path.clone(),
        (Some(RuleTarget::Transfer(account)), _) => format!("transfer → {}", account),
        (Some(target), _) => target.name().to_string(),
        (None, _) => "-".to_string(),
    };
    if !result.categorization.labels.is_empty() {
        cell.push_str(&format!(" [{}]", result.categorization.labels.join(", ")));
    }
    cell
}
