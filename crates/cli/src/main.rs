use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use pesaflow_core::{ParsedTransaction, RecurringObligation, StoredTransaction};
use pesaflow_match::{resolve_category, DuplicateDetector, MatchConfig, RecurringMatcher};
use pesaflow_parse::{parse_message, parse_statement};

#[derive(Parser)]
#[command(name = "pesaflow", about = "Mobile-money message parsing and matching", version)]
struct Cli {
    /// Matcher thresholds, TOML. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse transaction messages, one per line. "-" reads stdin.
    Message { input: PathBuf },
    /// Parse an exported statement. "-" reads stdin.
    Statement { input: PathBuf },
    /// Check a parsed transaction (JSON) against stored history (JSON array).
    Dedup {
        #[arg(long)]
        new: PathBuf,
        #[arg(long)]
        history: PathBuf,
    },
    /// Match a parsed transaction (JSON) against recurring obligations (JSON array).
    Recurring {
        #[arg(long)]
        new: PathBuf,
        #[arg(long)]
        obligations: PathBuf,
        /// Suggested category for the transaction, if already known.
        #[arg(long)]
        category: Option<String>,
        /// Overrides the recipient name from the parsed transaction.
        #[arg(long)]
        recipient: Option<String>,
        /// Reference date for due-ness, ISO format. Defaults to today.
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Infer a category for a recipient from stored history (JSON array).
    Category {
        #[arg(long)]
        recipient: String,
        #[arg(long)]
        history: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            MatchConfig::from_toml_str(&content)?
        }
        None => MatchConfig::default(),
    };

    match cli.command {
        Command::Message { input } => {
            let text = read_input(&input)?;
            let mut parsed = Vec::new();
            for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                match parse_message(line) {
                    Ok(tx) => parsed.push(tx),
                    // A bad message never aborts the batch.
                    Err(err) => tracing::warn!(%err, line, "skipping message"),
                }
            }
            print_json(&parsed)
        }
        Command::Statement { input } => {
            let text = read_input(&input)?;
            print_json(&parse_statement(&text))
        }
        Command::Dedup { new, history } => {
            let parsed: ParsedTransaction = load_json(&new)?;
            let existing: Vec<StoredTransaction> = load_json(&history)?;
            let detector = DuplicateDetector::new(config.duplicate);
            print_json(&detector.detect(&parsed, &existing))
        }
        Command::Recurring {
            new,
            obligations,
            category,
            recipient,
            as_of,
        } => {
            let parsed: ParsedTransaction = load_json(&new)?;
            let obligations: Vec<RecurringObligation> = load_json(&obligations)?;
            let name = recipient
                .or_else(|| parsed.recipient.clone())
                .unwrap_or_default();
            let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
            let matcher = RecurringMatcher::new(config.recurring);
            print_json(&matcher.match_transaction(
                &parsed,
                &name,
                category.as_deref(),
                &obligations,
                as_of,
            ))
        }
        Command::Category { recipient, history } => {
            let existing: Vec<StoredTransaction> = load_json(&history)?;
            print_json(&resolve_category(&recipient, &existing))
        }
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading stdin")?;
        Ok(buffer)
    } else {
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = read_input(path)?;
    serde_json::from_str(&content).with_context(|| format!("parsing JSON from {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
