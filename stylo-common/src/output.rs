//! JSON output helpers
//!
//! All result files are pretty-printed UTF-8 JSON written with a temp file +
//! rename so a crash mid-write never leaves a truncated file at the target path.
//!
//! Reports that collect one row per source (punctuation profiles, word-length
//! distributions, ...) go through [`accumulate_rows`], which makes the choice
//! between replacing the file and merging into it explicit.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Write `value` as pretty JSON to `path` atomically
///
/// Creates missing parent directories.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');

    let temp = temp_path_for(path);
    {
        let mut file = fs::File::create(&temp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(Error::Io(e));
    }

    Ok(())
}

/// Read a JSON file into `T`
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Sibling temp file, unique per write so concurrent writers never share one
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()))
}

// ============================================================================
// Accumulation policy
// ============================================================================

/// How a report file treats rows already on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccumulationPolicy {
    /// Replace the file with this run's rows
    #[default]
    Overwrite,
    /// Keep rows from other sources; rows whose key matches this run's rows are replaced
    Merge,
}

impl FromStr for AccumulationPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "overwrite" => Ok(AccumulationPolicy::Overwrite),
            "merge" => Ok(AccumulationPolicy::Merge),
            other => Err(Error::InvalidInput(format!(
                "unknown accumulation policy '{}' (expected overwrite or merge)",
                other
            ))),
        }
    }
}

/// Persist `rows` to `path` according to `policy`
///
/// Returns the number of rows in the file after the write.
pub fn accumulate_rows<T, K>(
    path: &Path,
    rows: Vec<T>,
    key: K,
    policy: AccumulationPolicy,
) -> Result<usize>
where
    T: Serialize + DeserializeOwned,
    K: Fn(&T) -> String,
{
    let merged = match policy {
        AccumulationPolicy::Overwrite => rows,
        AccumulationPolicy::Merge => {
            let existing: Vec<T> = if path.exists() {
                read_json(path)?
            } else {
                Vec::new()
            };
            let incoming: HashSet<String> = rows.iter().map(&key).collect();
            let mut merged: Vec<T> = existing
                .into_iter()
                .filter(|row| !incoming.contains(&key(row)))
                .collect();
            merged.extend(rows);
            merged
        }
    };

    write_json_atomic(path, &merged)?;
    tracing::debug!(
        path = %path.display(),
        rows = merged.len(),
        policy = ?policy,
        "Report written"
    );
    Ok(merged.len())
}
