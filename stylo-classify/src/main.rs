//! stylo-classify - Main entry point
//!
//! Classifies every paragraph of every book in a folder with the selected
//! provider and writes one JSON result file per book.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use stylo_classify::config::{
    build_classifier, resolve_run_config, resolve_segmenter_config, Provider, RunOverrides,
};
use stylo_classify::segmenter::{Segmenter, SegmenterConfig};
use stylo_classify::workflow::{Pipeline, WorkflowEvent};
use stylo_common::config::{
    init_logging, load_config, write_toml_config, CheckpointSection, SegmenterSection, TomlConfig,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Command-line arguments for stylo-classify
#[derive(Parser, Debug)]
#[command(name = "stylo-classify")]
#[command(about = "Rate-limited, checkpointed paragraph classification for books")]
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
    /// Classify all books in the input folder
    Run(RunArgs),
    /// Show how a book splits into chapters and paragraphs (no service calls)
    Segment {
        file: PathBuf,
        /// Provider whose defaults apply, as for `run`
        #[arg(long, value_enum, default_value = "openai")]
        provider: Provider,
        /// Minimum chapter length in characters (defaults like `run`)
        #[arg(long)]
        min_chapter_chars: Option<usize>,
    },
    /// Write a config file with default values
    InitConfig {
        path: PathBuf,
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long, value_enum)]
    provider: Provider,

    /// Folder of .txt books
    #[arg(long, env = "STYLO_INPUT_DIR")]
    input: Option<PathBuf>,

    /// Folder for result and checkpoint files
    #[arg(long, env = "STYLO_OUTPUT_DIR")]
    output: Option<PathBuf>,

    /// Write a snapshot every N chapters (0 disables)
    #[arg(long)]
    checkpoint_interval: Option<usize>,

    #[arg(long)]
    max_concurrency: Option<usize>,

    #[arg(long)]
    min_chapter_chars: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let toml = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&toml.logging.level);

    match cli.command {
        Command::Run(args) => run(args, &toml).await,
        Command::Segment {
            file,
            provider,
            min_chapter_chars,
        } => segment(&file, provider, min_chapter_chars, &toml),
        Command::InitConfig { path, force } => init_config(&path, force),
    }
}

async fn run(args: RunArgs, toml: &TomlConfig) -> Result<()> {
    let overrides = RunOverrides {
        input_dir: args.input,
        output_dir: args.output,
        checkpoint_interval: args.checkpoint_interval,
        max_concurrency: args.max_concurrency,
        min_chapter_chars: args.min_chapter_chars,
    };
    let run = resolve_run_config(args.provider, toml, &overrides);

    info!(
        provider = ?run.provider,
        input = %run.input_dir.display(),
        output = %run.pipeline.output_dir.display(),
        "Starting stylo-classify"
    );

    // Fails on missing credentials before any book is read
    let classifier = build_classifier(&run, toml).context("Failed to configure classifier")?;

    let (event_tx, mut event_rx) = mpsc::channel::<WorkflowEvent>(256);
    let drain = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match &event {
                WorkflowEvent::CheckpointWritten { path, .. } => {
                    debug!(path = %path.display(), "Checkpoint event")
                }
                other => debug!(event = ?other, "Workflow event"),
            }
        }
    });

    let pipeline = Pipeline::with_events(run.pipeline.clone(), classifier, event_tx)
        .context("Failed to create pipeline")?;
    let summary = pipeline
        .process_dir(&run.input_dir)
        .await
        .with_context(|| format!("Failed to process {}", run.input_dir.display()))?;
    drop(pipeline);
    let _ = drain.await;

    for book in &summary.completed {
        info!(
            book = %book.book,
            chapters = book.chapters,
            paragraphs = book.paragraphs,
            sentinels = book.sentinels,
            failures = book.failures.total(),
            output = %book.output.display(),
            "Summary"
        );
    }
    for skipped in &summary.skipped {
        warn!(book = %skipped.book, reason = %skipped.reason, "Skipped");
    }

    if !summary.failed.is_empty() {
        for failed in &summary.failed {
            warn!(book = %failed.book, error = %failed.error, "Failed");
        }
        bail!("{} book(s) failed", summary.failed.len());
    }

    Ok(())
}

fn segment(
    file: &Path,
    provider: Provider,
    min_chapter_chars: Option<usize>,
    toml: &TomlConfig,
) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let config = resolve_segmenter_config(provider, toml, min_chapter_chars);
    debug!(min_chapter_chars = config.min_chapter_chars, "Segmenting");
    let segmenter = Segmenter::new(config)?;

    let mut paragraphs = 0;
    let mut chapters = 0;
    for chapter in segmenter.chapters(&text) {
        let count = chapter.paragraphs().count();
        println!(
            "chapter {:>4}: {:>6} chars, {:>4} paragraphs",
            chapter.index,
            chapter.text.chars().count(),
            count
        );
        chapters += 1;
        paragraphs += count;
    }
    println!("{} chapters, {} paragraphs", chapters, paragraphs);
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to replace it)", path.display());
    }

    let defaults = SegmenterConfig::default();
    let config = TomlConfig {
        segmenter: SegmenterSection {
            marker: Some(defaults.marker),
            min_chapter_chars: None,
            min_paragraph_chars: Some(defaults.min_paragraph_chars),
        },
        checkpoint: CheckpointSection {
            interval: Some(stylo_classify::workflow::checkpoint::DEFAULT_INTERVAL),
            keep_snapshots: Some(true),
        },
        ..Default::default()
    };

    write_toml_config(&config, path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Config written");
    Ok(())
}
