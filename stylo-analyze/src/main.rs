//! stylo-analyze - Main entry point
//!
//! Feeling wheel profiles for classification results, plus stylometry
//! reports over raw book text.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stylo_analyze::error::read_text;
use stylo_analyze::report::{expand_inputs, source_name, write_rows, WheelRow};
use stylo_analyze::stylometry::{
    divergence_matrix, token_frequencies, word_length_distribution, PunctuationProfile,
};
use stylo_analyze::{FeelingWheel, TaxonomyAggregator};
use stylo_common::config::{init_logging, load_config};
use stylo_common::output::{read_json, write_json_atomic};
use stylo_common::{AccumulationPolicy, BookRecord};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "stylo-analyze")]
#[command(about = "Emotion taxonomy and stylometry reports")]
#[command(version)]
struct Cli {
    /// TOML config file (falls back to $STYLO_CONFIG, then the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregate classification result files onto the feeling wheel
    Wheel {
        /// Result files or folders of them
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Only use the first N chapters of each book
        #[arg(long)]
        chapters: Option<usize>,
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(long, default_value = "overwrite")]
        policy: AccumulationPolicy,
        /// Fail when a label is missing from the feeling wheel
        #[arg(long)]
        strict: bool,
    },
    /// Punctuation profile per text
    Punctuation {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long, default_value = "punctuation_analysis.json")]
        report: PathBuf,
        #[arg(long, default_value = "overwrite")]
        policy: AccumulationPolicy,
    },
    /// Word length distribution per text
    WordLengths {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long, default_value = "word_length_analysis.json")]
        report: PathBuf,
        #[arg(long, default_value = "overwrite")]
        policy: AccumulationPolicy,
    },
    /// Pairwise Jensen-Shannon distance between texts
    Divergence {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long, default_value = "js_divergence.json")]
        report: PathBuf,
        /// Also write the full matrix
        #[arg(long)]
        matrix: Option<PathBuf>,
        #[arg(long, default_value = "overwrite")]
        policy: AccumulationPolicy,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let toml = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&toml.logging.level);

    match cli.command {
        Command::Wheel {
            inputs,
            chapters,
            report,
            policy,
            strict,
        } => wheel(&inputs, chapters, report, policy, strict),
        Command::Punctuation {
            inputs,
            report,
            policy,
        } => {
            let mut rows = Vec::new();
            for path in expand_inputs(&inputs, "txt")? {
                rows.push(PunctuationProfile::analyze(source_name(&path), &read_text(&path)?));
            }
            let total = write_rows(&report, rows, policy)?;
            info!(report = %report.display(), rows = total, "Punctuation report written");
            Ok(())
        }
        Command::WordLengths {
            inputs,
            report,
            policy,
        } => {
            let mut rows = Vec::new();
            for path in expand_inputs(&inputs, "txt")? {
                let name = source_name(&path);
                match word_length_distribution(name.as_str(), &read_text(&path)?) {
                    Some(stats) => {
                        println!(
                            "{}: {} words, mean {:.2}, median {:.1}, mode {}",
                            name, stats.total_words, stats.mean, stats.median, stats.mode
                        );
                        rows.push(stats);
                    }
                    None => warn!(file = %name, "No words found, skipping"),
                }
            }
            let total = write_rows(&report, rows, policy)?;
            info!(report = %report.display(), rows = total, "Word length report written");
            Ok(())
        }
        Command::Divergence {
            inputs,
            report,
            matrix,
            policy,
        } => {
            let files = expand_inputs(&inputs, "txt")?;
            if files.len() < 2 {
                bail!("Need at least two texts to compare, got {}", files.len());
            }
            let mut corpus = Vec::with_capacity(files.len());
            for path in &files {
                corpus.push((source_name(path), token_frequencies(&read_text(path)?)));
            }
            let result = divergence_matrix(&corpus);
            if let Some(matrix_path) = matrix {
                write_json_atomic(&matrix_path, &result)?;
            }
            let total = write_rows(&report, result.pairs(), policy)?;
            info!(report = %report.display(), rows = total, texts = files.len(), "Divergence report written");
            Ok(())
        }
    }
}

fn wheel(
    inputs: &[PathBuf],
    chapters: Option<usize>,
    report: Option<PathBuf>,
    policy: AccumulationPolicy,
    strict: bool,
) -> Result<()> {
    let wheel = FeelingWheel::standard();
    let mut rows = Vec::new();

    for path in expand_inputs(inputs, "json")? {
        let book: BookRecord = read_json(&path)
            .with_context(|| format!("Failed to read results from {}", path.display()))?;
        let mut aggregator = TaxonomyAggregator::new(&wheel);
        aggregator.add_book(&book, chapters);
        let profile = aggregator.finish();
        if strict {
            profile
                .ensure_mapped()
                .with_context(|| format!("Unmapped labels in {}", path.display()))?;
        }

        let source = source_name(&path);
        println!(
            "{}: {} paragraphs, {} sentinels, dominant {}",
            source,
            profile.paragraphs,
            profile.sentinels,
            profile
                .dominant()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "none".to_string())
        );
        for (primary, share) in &profile.primary {
            println!("  {:<9} {:.3}", primary, share);
        }
        rows.push(WheelRow { source, profile });
    }

    match report {
        Some(path) => {
            let total = write_rows(&path, rows, policy)?;
            info!(report = %path.display(), rows = total, "Wheel report written");
        }
        None => println!("{}", serde_json::to_string_pretty(&rows)?),
    }
    Ok(())
}
