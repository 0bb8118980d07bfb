//! Tally CLI - bank CSV normalization in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{detect, import, logs, profile, rules};
use tally_core::LogEvent;

/// Tally - map any bank CSV export onto clean transactions
#[derive(Parser)]
#[command(name = "tally", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect a CSV file and guess its column mapping
    Detect {
        /// Path to CSV file
        file: PathBuf,
        /// Field delimiter (, ; tab |), sniffed when omitted
        #[arg(long)]
        delimiter: Option<String>,
        /// Zero-based line index of the header row
        #[arg(long, default_value = "0")]
        header_row: usize,
        /// List the distinct values of this column
        #[arg(long)]
        account_column: Option<String>,
        /// Save the guessed mapping as a profile with this name
        #[arg(long)]
        save: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Normalize a CSV file with a saved profile
    Import {
        /// Path to CSV file
        file: PathBuf,
        /// Profile to import with
        #[arg(long, short)]
        profile: String,
        /// Default account for rows without a resolved account
        #[arg(long)]
        account: Option<String>,
        /// Show the first transactions only, never touching settings
        #[arg(long)]
        preview: bool,
        /// Number of transactions shown in preview mode
        #[arg(long, default_value = "10")]
        limit: usize,
        /// Store newly seen account strings in the profile
        #[arg(long)]
        save_accounts: bool,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: import::OutputFormat,
        /// Write transactions to a file instead of stdout (csv or json only)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Apply categorization rules (table or json only)
        #[arg(long)]
        categorize: bool,
    },

    /// Manage mapper profiles
    Profile {
        #[command(subcommand)]
        command: profile::ProfileCommands,
    },

    /// Manage categorization rules
    Rules {
        #[command(subcommand)]
        command: rules::RulesCommands,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Detect { .. } => "detect",
            Commands::Import { .. } => "import",
            Commands::Profile { .. } => "profile",
            Commands::Rules { .. } => "rules",
            Commands::Logs { .. } => "logs",
        }
    }
}

/// Diagnostics go to stderr, filtered by TALLY_LOG (default: warn)
fn init_tracing() {
    let filter = EnvFilter::try_from_env("TALLY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let logger = commands::get_logger();
    let command = cli.command.name();
    commands::log_event(&logger, LogEvent::new("command_executed").with_command(command));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            commands::log_event(
                &logger,
                LogEvent::new("command_failed")
                    .with_command(command)
                    .with_error(e.to_string())
                    .with_error_details(format!("{:#}", e)),
            );
            eprintln!("{}", format!("{:#}", e).red());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Detect {
            file,
            delimiter,
            header_row,
            account_column,
            save,
            json,
        } => detect::run(detect::DetectArgs {
            file,
            delimiter,
            header_row,
            account_column,
            save,
            json,
        }),
        Commands::Import {
            file,
            profile,
            account,
            preview,
            limit,
            save_accounts,
            format,
            output,
            categorize,
        } => import::run(import::ImportArgs {
            file,
            profile,
            account,
            preview,
            limit,
            save_accounts,
            format,
            output,
            categorize,
        }),
        Commands::Profile { command } => profile::run(command),
        Commands::Rules { command } => rules::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
