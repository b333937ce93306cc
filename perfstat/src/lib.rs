pub mod assemble;
pub mod counters;
pub mod diag;
pub mod event;
pub mod memreport;
pub mod merge;
pub mod metrics;
pub mod naming;
pub mod walltime;

use std::{collections::BTreeMap, fmt, path::{Path, PathBuf}};

pub use naming::{AlgorithmId, ConfigKey, RunKey};

/// Raw event name (as spelled in the perf output) to count.
pub type CounterMap = std::collections::HashMap<String, u64>;

/// Two-level table keyed by configuration, then algorithm.
pub type RunTable<T> = BTreeMap<ConfigKey, BTreeMap<AlgorithmId, T>>;

pub fn fmt_open_err(e: impl ToString, path: &Path) -> String {
    format!("Unable to open {}: {}", path_str(path), e.to_string())
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().unwrap_or("<unknown path>")
}

/// Failures that abort a whole invocation, as opposed to the per-file
/// problems reported through [`diag::Diagnostics`].
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    MissingDirectory(PathBuf),
    NoCounterFiles(PathBuf),
    NoResultFiles(PathBuf),
    NoMemoryReports(PathBuf),
    Io(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::MissingDirectory(p) =>
                write!(f, "directory not found: {}", path_str(p)),
            AnalysisError::NoCounterFiles(p) =>
                write!(f, "no *_perf_stat.txt files found in {}", path_str(p)),
            AnalysisError::NoResultFiles(p) =>
                write!(f, "no *_stdout.txt files found in {}", path_str(p)),
            AnalysisError::NoMemoryReports(p) =>
                write!(f, "no *_mem_report.txt files found in {}", path_str(p)),
            AnalysisError::Io(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for AnalysisError {}

/// Sorted file names of a directory, or a configuration error if the
/// directory cannot be listed.
pub(crate) fn list_dir(dir: &Path) -> Result<Vec<(String, PathBuf)>, AnalysisError> {
    if !dir.is_dir() {
        return Err(AnalysisError::MissingDirectory(dir.to_path_buf()));
    }
    let entries = std::fs::read_dir(dir)
        .map_err(|e| AnalysisError::Io(fmt_open_err(e, dir)))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AnalysisError::Io(format!(
            "unable to open directory entry in {}: {}",
            path_str(dir), e
        )))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            files.push((name.to_string(), path.clone()));
        }
    }
    files.sort();
    Ok(files)
}
