//! Detect command - inspect an unknown CSV export

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;
use tally_core::services::{import::read_text, DetectOptions};
use tally_core::{Delimiter, MapperProfile};

pub struct DetectArgs {
    pub file: PathBuf,
    pub delimiter: Option<String>,
    pub header_row: usize,
    pub account_column: Option<String>,
    pub save: Option<String>,
    pub json: bool,
}

pub fn run(args: DetectArgs) -> Result<()> {
    let ctx = get_context()?;
    let text = read_text(&args.file)?;

    let delimiter = args
        .delimiter
        .as_deref()
        .map(str::parse::<Delimiter>)
        .transpose()?;
    let options = DetectOptions {
        delimiter,
        header_row: args.header_row,
        account_column: args.account_column.clone(),
    };
    let result = ctx.import_service.detect(&text, &options);

    let saved = match &args.save {
        Some(name) => {
            let mut mapping = result.inferred.clone().into_mapping();
            if let Some(column) = &args.account_column {
                let (with_account, _) = mapping
                    .to_builder()
                    .account(column.clone())
                    .build()
                    .with_pending_accounts(&result.account_values);
                mapping = with_account;
            }
            let profile = MapperProfile::new(name.clone(), mapping)
                .with_delimiter(result.delimiter)
                .with_header_row(result.header_row);
            Some(ctx.profile_service.save(profile)?)
        }
        None => None,
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "detected": result,
                "saved_profile": saved,
            }))?
        );
        return Ok(());
    }

    println!();
    println!("{}", "Detected format".bold());
    println!("  Delimiter:  {}", result.delimiter);
    println!("  Header row: {}", result.header_row);
    println!("  Lines:      {}", result.line_count);

    if result.headers.is_empty() {
        println!();
        output::warning(&format!(
            "No header found on line {} (file has {} lines)",
            result.header_row, result.line_count
        ));
        return Ok(());
    }

    let inferred = &result.inferred;
    let mut table = output::create_table();
    table.set_header(vec!["#", "Header", "Guessed role", "First value"]);
    for (idx, header) in result.headers.iter().enumerate() {
        let role = if inferred.date.as_deref() == Some(header.as_str()) {
            "date".green().to_string()
        } else if inferred.amount.as_deref() == Some(header.as_str()) {
            "amount".green().to_string()
        } else if inferred.description.contains(header) {
            "description".green().to_string()
        } else if args.account_column.as_deref() == Some(header.as_str()) {
            "account".cyan().to_string()
        } else {
            "-".dimmed().to_string()
        };
        let first = result
            .sample_rows
            .first()
            .map(|row| row.get(idx).to_string())
            .unwrap_or_default();
        table.add_row(vec![idx.to_string(), header.clone(), role, first]);
    }
    println!();
    println!("{}", table);

    if !inferred.is_complete() {
        output::warning("Some columns could not be guessed; edit the profile before importing.");
    }

    if !result.account_values.is_empty() {
        println!();
        println!("{}", "Account values".bold());
        for value in &result.account_values {
            println!("  {}", value);
        }
    }

    if let Some(profile) = saved {
        println!();
        output::success(&format!("✓ Saved profile '{}'", profile.name));
        if !profile.column_mapping.pending_accounts().is_empty() {
            output::info(&format!(
                "Assign accounts with: tally profile assign {}",
                profile.name
            ));
        }
    }

    Ok(())
}
