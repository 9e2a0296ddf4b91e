//! Checkpoint writer
//!
//! Every `interval` chapters the book accumulated so far is written to a
//! snapshot named `<stem>_checkpoint_<stamp>_<chapters>.json`. When the book is
//! done the full record goes to `<stem>_<suffix>.json`, replacing whatever a
//! previous run left there. All writes are atomic.

use crate::error::{PipelineError, PipelineResult};
use std::path::{Path, PathBuf};
use stylo_common::output::write_json_atomic;
use stylo_common::BookRecord;

pub const DEFAULT_INTERVAL: usize = 10;

#[derive(Debug, Clone)]
pub struct CheckpointWriter {
    output_dir: PathBuf,
    stem: String,
    suffix: String,
    /// Chapters between snapshots; 0 disables snapshots
    interval: usize,
    keep_snapshots: bool,
    written: Vec<PathBuf>,
}

impl CheckpointWriter {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        stem: impl Into<String>,
        suffix: impl Into<String>,
        interval: usize,
        keep_snapshots: bool,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            stem: stem.into(),
            suffix: suffix.into(),
            interval,
            keep_snapshots,
            written: Vec::new(),
        }
    }

    /// Canonical output path for this book
    pub fn final_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.json", self.stem, self.suffix))
    }

    /// Snapshots written so far in this run
    pub fn snapshots(&self) -> &[PathBuf] {
        &self.written
    }

    /// Whether a book with `chapters` finished chapters gets a snapshot
    pub fn is_due(&self, chapters: usize) -> bool {
        self.interval != 0 && chapters != 0 && chapters % self.interval == 0
    }

    /// Write a snapshot if the chapter count has reached the next interval
    pub fn after_chapter(&mut self, book: &BookRecord) -> PipelineResult<Option<PathBuf>> {
        let chapters = book.len();
        if !self.is_due(chapters) {
            return Ok(None);
        }

        let path = self.output_dir.join(format!(
            "{}_checkpoint_{}_{:04}.json",
            self.stem,
            stylo_common::time::checkpoint_stamp(),
            chapters
        ));
        write(&path, book)?;

        tracing::info!(
            book = %self.stem,
            chapters,
            path = %path.display(),
            "Checkpoint written"
        );
        self.written.push(path.clone());
        Ok(Some(path))
    }

    /// Write the complete record to the canonical path
    pub fn finalize(&mut self, book: &BookRecord) -> PipelineResult<PathBuf> {
        let path = self.final_path();
        write(&path, book)?;

        if !self.keep_snapshots {
            for snapshot in &self.written {
                if let Err(e) = std::fs::remove_file(snapshot) {
                    tracing::warn!(path = %snapshot.display(), error = %e, "Failed to remove checkpoint");
                }
            }
        }

        tracing::debug!(path = %path.display(), chapters = book.len(), "Final output written");
        Ok(path)
    }
}

fn write(path: &Path, book: &BookRecord) -> PipelineResult<()> {
    write_json_atomic(path, book).map_err(|source| PipelineError::CheckpointWriteFailed {
        path: path.to_path_buf(),
        source,
    })
}
