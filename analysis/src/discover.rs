//! Locating the run directory to analyse.

use std::{fs, path::{Path, PathBuf}};
use perfstat::assemble::PERF_STATS_DIR;
use crate::{fmt_open_err, path_str};

pub const RUN_DIR_PREFIX: &str = "perf_benchmark_run_";
pub const ANALYSIS_RESULT_DIR: &str = "analysis_result";
pub const MEMORY_PLOTS_DIR: &str = "memory_analysis_plots";

/// The lexicographically last `perf_benchmark_run_*` directory in `base`.
/// Run directories carry their start timestamp, so this is the newest run.
pub fn find_latest_run(base: &Path) -> Result<PathBuf, String> {
    if !base.is_dir() {
        return Err(format!("base run directory {} does not exist", path_str(base)));
    }

    let mut latest: Option<(String, PathBuf)> = None;
    for entry in fs::read_dir(base).map_err(|e| fmt_open_err(e, base))? {
        let entry = entry.map_err(|e| fmt_open_err(e, base))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(RUN_DIR_PREFIX) || !path.is_dir() {
            continue;
        }
        if latest.as_ref().map_or(true, |(best, _)| name > best.as_str()) {
            latest = Some((name.to_string(), path.clone()));
        }
    }

    latest
        .map(|(_, path)| path)
        .ok_or_else(|| format!(
            "no '{}*' directories found in {}",
            RUN_DIR_PREFIX, path_str(base)
        ))
}

/// Run directory named by `arg`, which may also point at the run's
/// `perf_stats` sub-directory. Without an argument the newest run under
/// `base` is used.
pub fn resolve_run_dir(arg: Option<&Path>, base: &Path) -> Result<PathBuf, String> {
    let Some(arg) = arg else {
        return find_latest_run(base);
    };

    let run_dir = if arg.file_name().map_or(false, |n| n == PERF_STATS_DIR) {
        arg.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        arg.to_path_buf()
    };

    if !run_dir.is_dir() {
        return Err(format!("run directory {} does not exist", path_str(&run_dir)));
    }
    Ok(run_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_latest_run_chosen() {
        let tmp = TempDir::new().unwrap();
        for name in [
            "perf_benchmark_run_2024-01-02_10_00_00",
            "perf_benchmark_run_2024-03-01_09_00_00",
            "perf_benchmark_run_2023-12-31_23_59_59",
            "zzz_other",
        ] {
            fs::create_dir(tmp.path().join(name)).unwrap();
        }
        fs::write(tmp.path().join("perf_benchmark_run_9999_file"), "").unwrap();

        let latest = find_latest_run(tmp.path()).unwrap();
        assert_eq!(latest, tmp.path().join("perf_benchmark_run_2024-03-01_09_00_00"));
    }

    #[test]
    fn test_no_runs() {
        let tmp = TempDir::new().unwrap();
        assert!(find_latest_run(tmp.path()).is_err());
        assert!(find_latest_run(&tmp.path().join("missing")).is_err());
    }

    #[test]
    fn test_perf_stats_argument() {
        let tmp = TempDir::new().unwrap();
        let run = tmp.path().join("perf_benchmark_run_1");
        fs::create_dir_all(run.join(PERF_STATS_DIR)).unwrap();

        let resolved = resolve_run_dir(Some(&run.join(PERF_STATS_DIR)), tmp.path()).unwrap();
        assert_eq!(resolved, run);
        assert_eq!(resolve_run_dir(Some(&run), tmp.path()).unwrap(), run);
        assert_eq!(resolve_run_dir(None, tmp.path()).unwrap(), run);
    }
}
