//! JSON report files keyed by source

use crate::error::{AnalyzeError, Result};
use crate::stylometry::{DivergencePair, PunctuationProfile, WordLengthStats};
use crate::taxonomy::WheelProfile;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use stylo_common::output::accumulate_rows;
use stylo_common::AccumulationPolicy;

/// A report row identified by the file (or file pair) it describes
pub trait ReportRow: Serialize + DeserializeOwned {
    fn key(&self) -> String;
}

impl ReportRow for PunctuationProfile {
    fn key(&self) -> String {
        self.text_file.clone()
    }
}

impl ReportRow for WordLengthStats {
    fn key(&self) -> String {
        self.text_file.clone()
    }
}

impl ReportRow for DivergencePair {
    fn key(&self) -> String {
        format!("{}|{}", self.author1, self.author2)
    }
}

/// Feeling wheel profile of one result file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelRow {
    pub source: String,
    pub profile: WheelProfile,
}

impl ReportRow for WheelRow {
    fn key(&self) -> String {
        self.source.clone()
    }
}

/// Write `rows` to the report at `path`; returns the row count now on disk
pub fn write_rows<T: ReportRow>(
    path: &Path,
    rows: Vec<T>,
    policy: AccumulationPolicy,
) -> Result<usize> {
    Ok(accumulate_rows(path, rows, T::key, policy)?)
}

/// Display name for a source file
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Expand directories into their files with `extension`, sorted; plain files pass through
pub fn expand_inputs(inputs: &[PathBuf], extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }
        let entries = fs::read_dir(input).map_err(|source| AnalyzeError::Read {
            path: input.clone(),
            source,
        })?;
        let mut found: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == extension))
            .collect();
        found.sort();
        files.extend(found);
    }
    Ok(files)
}
