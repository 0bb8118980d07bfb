//! Profile command - manage mapper profiles

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::{Confirm, Input};

use super::get_context;
use crate::output;
use tally_core::{Error, MapperProfile};

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// List saved profiles
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one profile
    Show {
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a profile JSON file without saving it
    Validate {
        file: PathBuf,
    },
    /// Delete a profile
    Remove {
        name: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
    /// Export every profile as a JSON array
    Export {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Import profiles from a JSON file (existing names are kept)
    Import {
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Assign target accounts to raw account values
    ///
    /// Without RAW and TARGET, prompts for every unassigned value.
    Assign {
        name: String,
        raw: Option<String>,
        target: Option<String>,
    },
}

pub fn run(command: ProfileCommands) -> Result<()> {
    match command {
        ProfileCommands::List { json } => list(json),
        ProfileCommands::Show { name, json } => show(&name, json),
        ProfileCommands::Validate { file } => validate(&file),
        ProfileCommands::Remove { name, force } => remove(&name, force),
        ProfileCommands::Export { output } => export(output),
        ProfileCommands::Import { file, json } => import(&file, json),
        ProfileCommands::Assign { name, raw, target } => assign(&name, raw, target),
    }
}

fn list(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let profiles = ctx.profile_service.list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profiles)?);
        return Ok(());
    }

    if profiles.is_empty() {
        println!("No profiles saved. Create one with: tally detect <file> --save <name>");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Name", "Delimiter", "Header row", "Date format", "Amount", "Pending accounts"]);
    for profile in &profiles {
        let mapping = &profile.column_mapping;
        let amount = match (&mapping.amount, &mapping.credit, &mapping.debit) {
            (Some(amount), _, _) => amount.clone(),
            (None, credit, debit) => format!(
                "+{} / -{}",
                credit.as_deref().unwrap_or("-"),
                debit.as_deref().unwrap_or("-")
            ),
        };
        table.add_row(vec![
            profile.name.clone(),
            profile.delimiter.to_string(),
            profile.header_row.to_string(),
            profile.date_format.clone(),
            amount,
            mapping.pending_accounts().len().to_string(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn show(name: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let profile = ctx.profile_service.get(name)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    let mapping = &profile.column_mapping;
    println!();
    println!("{}", profile.name.bold());
    println!("  Delimiter:    {}", profile.delimiter);
    println!("  Header row:   {}", profile.header_row);
    println!("  Date format:  {}", profile.date_format);
    println!("  Date:         {}", mapping.date);
    println!("  Description:  {}", mapping.description.join(" + "));
    if let Some(amount) = &mapping.amount {
        println!("  Amount:       {}", amount);
    } else {
        println!("  Credit:       {}", mapping.credit.as_deref().unwrap_or("-"));
        println!("  Debit:        {}", mapping.debit.as_deref().unwrap_or("-"));
    }
    if let Some(indicator) = &mapping.amount_type {
        println!(
            "  Indicator:    {} (credit: {}, debit: {})",
            indicator, mapping.credit_indicators, mapping.debit_indicators
        );
    }
    if mapping.invert_amount {
        println!("  Invert:       yes");
    }
    if let Some(account) = &mapping.account {
        println!("  Account:      {}", account);
        for (raw, target) in &mapping.account_mapping {
            let target = if target.trim().is_empty() {
                "(unassigned)".yellow().to_string()
            } else {
                target.clone()
            };
            println!("    {} → {}", raw, target);
        }
    }
    Ok(())
}

fn validate(file: &Path) -> Result<()> {
    let content =
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let profile: MapperProfile =
        serde_json::from_str(&content).context("File is not a mapper profile")?;

    match profile.validate() {
        Ok(()) => {
            output::success(&format!("✓ Profile '{}' is valid", profile.name));
            Ok(())
        }
        Err(Error::InvalidMappingConfiguration(errors)) => {
            for error in errors.iter() {
                eprintln!("  {} {}: {}", "✗".red(), error.field, error.message);
            }
            anyhow::bail!("Profile '{}' has {} problem(s)", profile.name, errors.len())
        }
        Err(e) => Err(e.into()),
    }
}

fn remove(name: &str, force: bool) -> Result<()> {
    let ctx = get_context()?;
    // fail early on unknown names
    ctx.profile_service.get(name)?;

    if !force
        && !Confirm::new()
            .with_prompt(format!("Delete profile '{}'?", name))
            .default(false)
            .interact()?
    {
        println!("{}", "Cancelled".dimmed());
        return Ok(());
    }

    ctx.profile_service.remove(name)?;
    output::success(&format!("✓ Profile '{}' removed", name));
    Ok(())
}

fn export(output_path: Option<PathBuf>) -> Result<()> {
    let ctx = get_context()?;
    let json = ctx.profile_service.export_all()?;
    match output_path {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} Exported profiles to {}", "✓".green(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn import(file: &Path, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let content =
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let summary = ctx.profile_service.import_profiles(&content)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    output::success(&format!("✓ Imported {} profile(s)", summary.imported.len()));
    for name in &summary.imported {
        println!("  {}", name.green());
    }
    if !summary.skipped.is_empty() {
        output::warning(&format!("Skipped existing: {}", summary.skipped.join(", ")));
    }
    if !summary.invalid.is_empty() {
        output::warning(&format!("Skipped invalid: {}", summary.invalid.join(", ")));
    }
    Ok(())
}

fn assign(name: &str, raw: Option<String>, target: Option<String>) -> Result<()> {
    let ctx = get_context()?;

    if let (Some(raw), Some(target)) = (&raw, &target) {
        ctx.profile_service.assign_account(name, raw, target)?;
        output::success(&format!("✓ {} → {}", raw, target));
        return Ok(());
    }
    if raw.is_some() {
        anyhow::bail!("Both RAW and TARGET are required to assign a single value");
    }

    let profile = ctx.profile_service.get(name)?;
    let pending: Vec<String> = profile
        .column_mapping
        .pending_accounts()
        .into_iter()
        .map(str::to_string)
        .collect();
    if pending.is_empty() {
        println!("No unassigned account values in '{}'.", name);
        return Ok(());
    }

    println!("{}", "Leave empty to keep a value on the default account.".dimmed());
    let mut assigned = 0;
    for raw in &pending {
        let target: String = Input::new()
            .with_prompt(format!("Account for '{}'", raw))
            .allow_empty(true)
            .interact_text()?;
        if target.trim().is_empty() {
            continue;
        }
        ctx.profile_service.assign_account(name, raw, &target)?;
        assigned += 1;
    }

    output::success(&format!("✓ Assigned {} of {} value(s)", assigned, pending.len()));
    Ok(())
}
