//! Pipeline orchestrator
//!
//! Drives segmentation, classification, assembly and checkpointing for one book
//! or a directory of books.
//!
//! # Error Handling
//! - Per-paragraph isolation: failed classifications become sentinels and are tallied
//! - Per-book isolation: a book without content is skipped, a book whose
//!   checkpoint cannot be written is aborted, and the batch moves on
//!
//! # Example
//! ```rust,ignore
//! let pipeline = Pipeline::new(config, classifier)?;
//! let summary = pipeline.process_dir(Path::new("books")).await?;
//! ```

use super::aggregator::{assemble_book, assemble_chapter};
use super::checkpoint::{CheckpointWriter, DEFAULT_INTERVAL};
use super::{BatchSummary, BookSummary, FailedBook, FailureTally, SkippedBook, WorkflowEvent};
use crate::error::{PipelineError, PipelineResult};
use crate::segmenter::{Chapter, Segmenter, SegmenterConfig};
use crate::services::{ClassificationOutcome, RateLimitedClassifier};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use stylo_common::ChapterRecord;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub segmenter: SegmenterConfig,
    pub output_dir: PathBuf,
    /// Canonical output is `<book stem>_<output_suffix>.json`
    pub output_suffix: String,
    pub checkpoint_interval: usize,
    pub keep_snapshots: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segmenter: SegmenterConfig::default(),
            output_dir: PathBuf::from("output"),
            output_suffix: "emotions".to_string(),
            checkpoint_interval: DEFAULT_INTERVAL,
            keep_snapshots: true,
        }
    }
}

/// Batch classification pipeline
pub struct Pipeline {
    config: PipelineConfig,
    segmenter: Segmenter,
    classifier: Arc<RateLimitedClassifier>,
    event_tx: Option<mpsc::Sender<WorkflowEvent>>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        classifier: Arc<RateLimitedClassifier>,
    ) -> stylo_common::Result<Self> {
        Ok(Self {
            segmenter: Segmenter::new(config.segmenter.clone())?,
            config,
            classifier,
            event_tx: None,
        })
    }

    /// Create pipeline with event channel for progress reporting
    pub fn with_events(
        config: PipelineConfig,
        classifier: Arc<RateLimitedClassifier>,
        event_tx: mpsc::Sender<WorkflowEvent>,
    ) -> stylo_common::Result<Self> {
        let mut pipeline = Self::new(config, classifier)?;
        pipeline.event_tx = Some(event_tx);
        Ok(pipeline)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process every `.txt` file in `dir`, in file-name order
    pub async fn process_dir(&self, dir: &Path) -> PipelineResult<BatchSummary> {
        let books = list_books(dir).await?;
        info!(dir = %dir.display(), books = books.len(), "Processing books");

        let mut summary = BatchSummary::default();
        for (i, path) in books.iter().enumerate() {
            let book = book_name(path);
            info!(book = %book, "Book {} of {}", i + 1, books.len());

            match self.process_book(path).await {
                Ok(done) => summary.completed.push(done),
                Err(PipelineError::SegmentationEmpty(_)) => {
                    warn!(book = %book, "No chapters found, skipping book");
                    summary.skipped.push(SkippedBook {
                        book,
                        reason: "no chapters found".to_string(),
                    });
                }
                Err(e) => {
                    error!(book = %book, error = %e, "Book failed");
                    self.emit_event(WorkflowEvent::BookFailed {
                        book: book.clone(),
                        message: e.to_string(),
                    })
                    .await;
                    summary.failed.push(FailedBook {
                        book,
                        error: e.to_string(),
                    });
                }
            }
        }

        let failures = summary.failures();
        info!(
            completed = summary.completed.len(),
            skipped = summary.skipped.len(),
            failed = summary.failed.len(),
            sentinels = summary.total_sentinels(),
            rate_limited = failures.rate_limited,
            timeouts = failures.timeouts,
            invalid_responses = failures.invalid_responses,
            service_errors = failures.service_errors,
            "Batch complete"
        );
        Ok(summary)
    }

    /// Read and process one book file
    pub async fn process_book(&self, path: &Path) -> PipelineResult<BookSummary> {
        let text = tokio::fs::read_to_string(path).await?;
        self.process_text(&book_name(path), &text).await
    }

    /// Process one book held in memory; `book` names it in logs and output files
    pub async fn process_text(&self, book: &str, text: &str) -> PipelineResult<BookSummary> {
        self.emit_event(WorkflowEvent::BookStarted {
            book: book.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        })
        .await;

        let chapters = match self.segmenter.segment(book, text) {
            Ok(chapters) => chapters,
            Err(e) => {
                self.emit_event(WorkflowEvent::BookSkipped {
                    book: book.to_string(),
                    reason: e.to_string(),
                })
                .await;
                return Err(e);
            }
        };

        info!(book = %book, chapters = chapters.len(), "Book segmented");

        let mut writer = CheckpointWriter::new(
            &self.config.output_dir,
            book_stem(book),
            &self.config.output_suffix,
            self.config.checkpoint_interval,
            self.config.keep_snapshots,
        );
        let mut finished: Vec<ChapterRecord> = Vec::with_capacity(chapters.len());
        let mut failures = FailureTally::default();

        for chapter in &chapters {
            let chapter_record = self.process_chapter(book, chapter, &mut failures).await;
            let sentinels = chapter_record.sentinel_count();

            self.emit_event(WorkflowEvent::ChapterCompleted {
                book: book.to_string(),
                chapter: chapter.index,
                paragraphs: chapter_record.results.len(),
                sentinels,
            })
            .await;
            info!(
                book = %book,
                chapter = chapter.index,
                paragraphs = chapter_record.results.len(),
                sentinels,
                "Chapter {}/{} classified",
                chapter.index,
                chapters.len()
            );

            finished.push(chapter_record);

            if writer.is_due(finished.len()) {
                let snapshot = assemble_book(finished.iter().cloned());
                if let Some(path) = writer.after_chapter(&snapshot)? {
                    self.emit_event(WorkflowEvent::CheckpointWritten {
                        book: book.to_string(),
                        path,
                        chapters: snapshot.len(),
                    })
                    .await;
                }
            }
        }

        let record = assemble_book(finished);
        let output = writer.finalize(&record)?;

        let summary = BookSummary {
            book: book.to_string(),
            chapters: record.len(),
            paragraphs: record.paragraph_count(),
            sentinels: record.sentinel_count(),
            failures,
            checkpoints: writer.snapshots().to_vec(),
            output: output.clone(),
        };

        if summary.sentinels > 0 {
            warn!(
                book = %book,
                sentinels = summary.sentinels,
                paragraphs = summary.paragraphs,
                rate_limited = failures.rate_limited,
                timeouts = failures.timeouts,
                invalid_responses = failures.invalid_responses,
                service_errors = failures.service_errors,
                "Book completed with sentinel results"
            );
        }
        info!(
            book = %book,
            chapters = summary.chapters,
            paragraphs = summary.paragraphs,
            output = %output.display(),
            "Book complete"
        );

        self.emit_event(WorkflowEvent::BookCompleted {
            book: book.to_string(),
            output,
            chapters: summary.chapters,
            paragraphs: summary.paragraphs,
            sentinels: summary.sentinels,
            timestamp: chrono::Utc::now().timestamp(),
        })
        .await;

        Ok(summary)
    }

    /// Classify all paragraphs of a chapter concurrently and assemble them in order
    async fn process_chapter(
        &self,
        book: &str,
        chapter: &Chapter<'_>,
        failures: &mut FailureTally,
    ) -> ChapterRecord {
        let paragraphs: Vec<&str> = chapter.paragraphs().collect();
        let total = paragraphs.len();

        self.emit_event(WorkflowEvent::ChapterStarted {
            book: book.to_string(),
            chapter: chapter.index,
            paragraphs: total,
        })
        .await;

        let classifier = &self.classifier;
        let done = AtomicUsize::new(0);
        // Roughly every tenth of the chapter
        let progress_step = total.div_ceil(10).max(1);

        let outcomes: Vec<(usize, ClassificationOutcome)> =
            stream::iter(paragraphs.iter().copied().enumerate())
                .map(|(index, paragraph)| {
                    let done = &done;
                    async move {
                        let outcome = classifier.classify(paragraph).await;
                        let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                        if n % progress_step == 0 || n == total {
                            info!(
                                book = %book,
                                chapter = chapter.index,
                                "Classified {}/{} paragraphs",
                                n,
                                total
                            );
                        }
                        (index, outcome)
                    }
                })
                .buffer_unordered(classifier.max_concurrency())
                .collect()
                .await;

        let completed = outcomes.into_iter().map(|(index, outcome)| {
            if let Some(error) = outcome.error() {
                debug!(
                    book = %book,
                    chapter = chapter.index,
                    paragraph = index + 1,
                    error = %error,
                    "Paragraph written as sentinel"
                );
                failures.record(&error);
            }
            (index, outcome.classification)
        });

        assemble_chapter(chapter.index, classifier.task(), &paragraphs, completed)
    }

    async fn emit_event(&self, event: WorkflowEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}

/// `.txt` files directly inside `dir`, sorted by name
async fn list_books(dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut books = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_txt = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);
        if is_txt && entry.file_type().await?.is_file() {
            books.push(path);
        }
    }

    books.sort();
    Ok(books)
}

fn book_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// File name without its extension (`moby_dick.txt` → `moby_dick`)
fn book_stem(book: &str) -> String {
    Path::new(book)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| book.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_stem() {
        assert_eq!(book_stem("moby_dick.txt"), "moby_dick");
        assert_eq!(book_stem("plain"), "plain");
    }
}
