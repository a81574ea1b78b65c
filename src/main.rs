mod dataset;
mod enhance;
mod parser;
mod report;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use parser::{ParseOptions, Strictness};
use report::Severity;

#[derive(Parser)]
#[command(name = "quizbank", about = "Convert LLM-authored quiz markup into importable rows")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a quiz bank file and emit one JSON row per accepted item
    Parse {
        /// Input markup file
        input: PathBuf,
        /// Chapter number stamped onto every row
        #[arg(long)]
        chapter_no: Option<String>,
        /// Chapter title stamped onto every row
        #[arg(long)]
        chapter_title: Option<String>,
        /// Fail the whole run on the first unrecoverable syntax error
        #[arg(long)]
        strict: bool,
        /// JSON file with tag_mapping / difficulty_levels / time_estimates
        #[arg(long)]
        tables: Option<PathBuf>,
        /// Emit tab-separated rows with a header instead of JSONL
        #[arg(long)]
        tsv: bool,
        /// Write rows here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Parse only and print every diagnostic plus the run summary
    Check {
        /// Input markup file
        input: PathBuf,
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            input,
            chapter_no,
            chapter_title,
            strict,
            tables,
            tsv,
            out,
        } => {
            let raw = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let opts = ParseOptions {
                chapter_no,
                chapter_title,
                strictness: strictness(strict),
            };
            let outcome = parser::parse_bank(&raw, &opts);

            let dataset = match tables {
                Some(path) => {
                    let json = fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    let tables: enhance::EnhanceTables = serde_json::from_str(&json)
                        .with_context(|| format!("Invalid tables file {}", path.display()))?;
                    enhance::enhance(&outcome.dataset, &tables)
                }
                None => outcome.dataset,
            };

            let rendered = if tsv { dataset.to_tsv() } else { dataset.to_jsonl()? };
            match out {
                Some(path) => {
                    fs::write(&path, rendered)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Wrote {} rows to {}", dataset.len(), path.display());
                }
                None => print!("{}", rendered),
            }
            eprintln!("{}", outcome.report.summary());
            Ok(())
        }
        Commands::Check { input, strict } => {
            let raw = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let opts = ParseOptions {
                strictness: strictness(strict),
                ..Default::default()
            };
            let outcome = parser::parse_bank(&raw, &opts);

            for diagnostic in &outcome.report.diagnostics {
                println!("{}", diagnostic);
            }
            for (severity, label) in [(Severity::Skipped, "skipped"), (Severity::Repaired, "repaired")] {
                let counts = outcome.report.counts_by_reason(severity);
                if !counts.is_empty() {
                    println!("--- {} by reason ---", label);
                    for (reason, count) in counts {
                        println!("  {}: {}", reason, count);
                    }
                }
            }
            println!("{}", outcome.report.summary());
            Ok(())
        }
    }
}

fn strictness(strict: bool) -> Strictness {
    if strict {
        Strictness::Strict
    } else {
        Strictness::Lenient
    }
}
