//! Rules command - manage categorization rules

use anyhow::Result;
use clap::{ArgGroup, Args, Subcommand};
use colored::Colorize;

use super::get_context;
use crate::output;
use tally_core::domain::{MatchKind, MatchSource};
use tally_core::{Rule, RuleTarget};

#[derive(Subcommand)]
pub enum RulesCommands {
    /// List rules in evaluation order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a rule
    Add(AddArgs),
    /// Remove every rule with this pattern
    Remove {
        pattern: String,
    },
    /// Show what the current rules assign to a description
    Test {
        description: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
#[command(group(ArgGroup::new("target").required(true).args(["category", "transfer", "label"])))]
pub struct AddArgs {
    /// Regex (case-insensitive) or, with --exact, the full description
    pattern: String,
    #[arg(long)]
    category: Option<String>,
    /// Mark matches as transfers to this account
    #[arg(long)]
    transfer: Option<String>,
    #[arg(long)]
    label: Option<String>,
    /// Lower values are evaluated first
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    priority: i32,
    /// Match the whole description instead of a regex
    #[arg(long)]
    exact: bool,
}

pub fn run(command: RulesCommands) -> Result<()> {
    match command {
        RulesCommands::List { json } => list(json),
        RulesCommands::Add(args) => add(args),
        RulesCommands::Remove { pattern } => remove(&pattern),
        RulesCommands::Test { description, json } => test(&description, json),
    }
}

fn target_kind(target: &RuleTarget) -> &'static str {
    match target {
        RuleTarget::Category(_) => "category",
        RuleTarget::Transfer(_) => "transfer",
        RuleTarget::Label(_) => "label",
    }
}

fn list(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let rules = ctx.rule_service.list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
        return Ok(());
    }

    if rules.is_empty() {
        println!("No rules defined.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Priority", "Match", "Pattern", "Assigns", "Target"]);
    for rule in &rules {
        let kind = match rule.kind {
            MatchKind::Regex => "regex",
            MatchKind::Exact => "exact",
        };
        table.add_row(vec![
            rule.priority.to_string(),
            kind.to_string(),
            rule.pattern.clone(),
            target_kind(&rule.target).to_string(),
            rule.target.name().to_string(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn add(args: AddArgs) -> Result<()> {
    let target = match (args.category, args.transfer, args.label) {
        (Some(name), _, _) => RuleTarget::Category(name),
        (_, Some(account), _) => RuleTarget::Transfer(account),
        (_, _, Some(label)) => RuleTarget::Label(label),
        (None, None, None) => anyhow::bail!("One of --category, --transfer or --label is required"),
    };

    let rule = if args.exact {
        Rule {
            priority: args.priority,
            ..Rule::exact(args.pattern, target)
        }
    } else {
        Rule::regex(args.pattern, args.priority, target)
    };

    let ctx = get_context()?;
    let summary = format!(
        "✓ Added {} rule '{}' → {}",
        target_kind(&rule.target),
        rule.pattern,
        rule.target.name()
    );
    ctx.rule_service.add(rule)?;
    output::success(&summary);
    Ok(())
}

fn remove(pattern: &str) -> Result<()> {
    let ctx = get_context()?;
    let removed = ctx.rule_service.remove(pattern)?;
    output::success(&format!("✓ Removed {} rule(s)", removed));
    Ok(())
}

fn test(description: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let (result, failed) = ctx.rule_service.test(description)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "description": description,
                "result": result,
                "failed_rules": failed,
            }))?
        );
        return Ok(());
    }

    for rule in &failed {
        output::warning(&format!("rule '{}' ignored: {}", rule.pattern, rule.error));
    }

    match &result.target {
        Some(RuleTarget::Category(name)) => {
            let path = ctx.rule_service.category_tree()?.display_path(name);
            println!("Category: {}", path.green());
        }
        Some(RuleTarget::Transfer(account)) => println!("Transfer to: {}", account.cyan()),
        // labels never land in the target
        Some(RuleTarget::Label(_)) | None => println!("{}", "Uncategorized".dimmed()),
    }
    if result.source != MatchSource::None {
        println!("  matched by {:?} rule", result.source);
    }
    if !result.labels.is_empty() {
        println!("Labels: {}", result.labels.join(", "));
    }
    Ok(())
}
