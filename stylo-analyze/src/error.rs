//! Error types for stylo-analyze

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Taxonomy entry rejected: {0}")]
    Taxonomy(String),

    /// Labels that reached no primary emotion
    #[error("Labels missing from the feeling wheel: {0}")]
    UnmappedLabel(String),

    #[error(transparent)]
    Common(#[from] stylo_common::Error),
}

pub type Result<T> = std::result::Result<T, AnalyzeError>;

/// Read a text file, keeping the path in the error
pub fn read_text(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| AnalyzeError::Read {
        path: path.to_path_buf(),
        source,
    })
}
