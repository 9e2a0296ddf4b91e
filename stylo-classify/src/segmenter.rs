//! Text segmentation: book → chapters → paragraphs
//!
//! Chapters are the pieces between whole-word, case-sensitive occurrences of a
//! marker token (default `CHAPTER`); the marker itself is dropped. Paragraphs are
//! the blank-line separated blocks of a chapter. Both levels are trimmed, empty
//! pieces are discarded, and each level has its own minimum length in characters.
//!
//! Segmentation is lazy: [`Chapters`] walks the text on demand and can be cloned
//! to restart from any point without re-reading the book.

use crate::error::{PipelineError, PipelineResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use stylo_common::Error;

pub const DEFAULT_MARKER: &str = "CHAPTER";
pub const DEFAULT_MIN_CHAPTER_CHARS: usize = 1000;
pub const DEFAULT_MIN_PARAGRAPH_CHARS: usize = 50;

/// Segmenter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmenterConfig {
    pub marker: String,
    /// Chapters shorter than this (after trimming) are discarded; 0 keeps all
    pub min_chapter_chars: usize,
    pub min_paragraph_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            min_chapter_chars: DEFAULT_MIN_CHAPTER_CHARS,
            min_paragraph_chars: DEFAULT_MIN_PARAGRAPH_CHARS,
        }
    }
}

/// Splits books into chapters and paragraphs
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmenterConfig,
    marker: Regex,
    blank_line: Regex,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> stylo_common::Result<Self> {
        if config.marker.trim().is_empty() {
            return Err(Error::InvalidInput("Chapter marker must not be empty".to_string()));
        }

        let marker = Regex::new(&format!(r"\b{}\b", regex::escape(&config.marker)))
            .map_err(|e| Error::InvalidInput(format!("Invalid chapter marker: {}", e)))?;
        let blank_line = Regex::new(r"\r?\n[ \t]*\r?\n")
            .map_err(|e| Error::Internal(format!("Paragraph pattern: {}", e)))?;

        Ok(Self {
            config,
            marker,
            blank_line,
        })
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Lazy chapter sequence over `text`
    pub fn chapters<'a>(&'a self, text: &'a str) -> Chapters<'a> {
        Chapters {
            segmenter: self,
            text,
            pos: 0,
            next_index: 1,
            done: false,
        }
    }

    /// Collect all chapters, failing when the book yields no paragraphs at all
    pub fn segment<'a>(&'a self, book: &str, text: &'a str) -> PipelineResult<Vec<Chapter<'a>>> {
        let chapters: Vec<Chapter<'a>> = self.chapters(text).collect();

        if chapters.iter().all(|c| c.paragraphs().next().is_none()) {
            return Err(PipelineError::SegmentationEmpty(book.to_string()));
        }

        Ok(chapters)
    }
}

/// One retained chapter; `index` is its 1-based position among retained chapters
#[derive(Debug, Clone)]
pub struct Chapter<'a> {
    pub index: usize,
    pub text: &'a str,
    blank_line: &'a Regex,
    min_paragraph_chars: usize,
}

impl<'a> Chapter<'a> {
    pub fn paragraphs(&self) -> Paragraphs<'a> {
        Paragraphs {
            blocks: self.blank_line.split(self.text),
            min_chars: self.min_paragraph_chars,
        }
    }
}

/// Iterator over the chapters of a book
#[derive(Debug, Clone)]
pub struct Chapters<'a> {
    segmenter: &'a Segmenter,
    text: &'a str,
    pos: usize,
    next_index: usize,
    done: bool,
}

impl<'a> Iterator for Chapters<'a> {
    type Item = Chapter<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            // find_at keeps word-boundary context from before `pos`
            let piece = match self.segmenter.marker.find_at(self.text, self.pos) {
                Some(m) => {
                    let piece = &self.text[self.pos..m.start()];
                    self.pos = m.end();
                    piece
                }
                None => {
                    self.done = true;
                    &self.text[self.pos..]
                }
            };

            let trimmed = piece.trim();
            if trimmed.is_empty()
                || trimmed.chars().count() < self.segmenter.config.min_chapter_chars
            {
                continue;
            }

            let index = self.next_index;
            self.next_index += 1;
            return Some(Chapter {
                index,
                text: trimmed,
                blank_line: &self.segmenter.blank_line,
                min_paragraph_chars: self.segmenter.config.min_paragraph_chars,
            });
        }
    }
}

/// Iterator over the paragraphs of a chapter
#[derive(Debug)]
pub struct Paragraphs<'a> {
    blocks: regex::Split<'a, 'a>,
    min_chars: usize,
}

impl<'a> Iterator for Paragraphs<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        for block in self.blocks.by_ref() {
            let trimmed = block.trim();
            if !trimmed.is_empty() && trimmed.chars().count() >= self.min_chars {
                return Some(trimmed);
            }
        }
        None
    }
}
