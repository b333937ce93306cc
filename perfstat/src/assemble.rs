//! Joins counter metrics and wall times of a benchmark run.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};
use crate::{
    counters::read_counter_file,
    diag::Diagnostics,
    list_dir,
    merge::{merge_groups, GroupCounters, MergePolicy},
    metrics::{derive, Metric, MetricRecord, MetricValue},
    naming::{self, RunKey},
    walltime::{self, DEFAULT_ITERATIONS},
    AnalysisError, RunTable,
};

pub const PERF_STATS_DIR: &str = "perf_stats";
pub const RESULTS_STDOUT_DIR: &str = "results_stdout";
pub const MEM_REPORTS_DIR: &str = "mem_reports";

/// Input directories of one benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunDirs {
    pub perf_stats: PathBuf,
    pub results_stdout: PathBuf,
}

impl RunDirs {
    pub fn in_run(run_dir: &Path) -> Self {
        Self {
            perf_stats: run_dir.join(PERF_STATS_DIR),
            results_stdout: run_dir.join(RESULTS_STDOUT_DIR),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AssembleOptions {
    /// In-process runs per stdout log, warm-up included.
    pub iterations: usize,
    pub merge: MergePolicy,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self { iterations: DEFAULT_ITERATIONS, merge: MergePolicy::default() }
    }
}

impl AssembleOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.iterations == 0 {
            return Err("Invalid parameter (iterations): value must be greater than 0.".to_string());
        }
        self.merge.validate()
    }
}

#[derive(Debug, Default)]
pub struct Assembly {
    /// Derived metrics of every run with counter data.
    pub metrics: RunTable<MetricRecord>,
    pub wall_times: RunTable<f64>,
    /// Runs that have both; each record carries its wall time.
    pub table: RunTable<MetricRecord>,
}

/// One line of the flattened joined table.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TableRow<'a> {
    pub generator: &'a str,
    pub datatype: &'a str,
    pub algorithm: &'a str,
    pub metrics: &'a MetricRecord,
}

impl Assembly {
    pub fn rows(&self) -> Vec<TableRow<'_>> {
        self.table.iter()
            .flat_map(|(config, algos)| algos.iter().map(move |(algo, record)| TableRow {
                generator: &config.generator,
                datatype: &config.datatype,
                algorithm: algo,
                metrics: record,
            }))
            .collect()
    }
}

/// Parses every `*_GROUPn_perf_stat.txt` in `dir`, grouped by run.
pub fn load_counter_groups(
    dir: &Path,
    diag: &mut Diagnostics) -> Result<BTreeMap<RunKey, GroupCounters>, AnalysisError>
{
    let files: Vec<_> = list_dir(dir)?
        .into_iter()
        .filter(|(name, _)| name.ends_with(naming::PERF_STAT_SUFFIX))
        .collect();

    if files.is_empty() {
        return Err(AnalysisError::NoCounterFiles(dir.to_path_buf()));
    }

    let mut runs: BTreeMap<RunKey, GroupCounters> = BTreeMap::new();
    for (name, path) in files {
        let Some((key, group)) = naming::parse_perf_stat_name(&name) else {
            diag.warn(format!("could not parse algo/gen/type/group from filename {}, skipping", name));
            continue;
        };
        match read_counter_file(&path, diag) {
            Ok(counters) => {
                runs.entry(key).or_default().insert(group, counters);
            },
            Err(e) => diag.warn(format!("could not parse {}", e)),
        }
    }
    Ok(runs)
}

/// Merges and derives each run. Runs whose groups merge to nothing are
/// dropped.
pub fn derive_runs(
    runs: &BTreeMap<RunKey, GroupCounters>,
    policy: &MergePolicy,
    diag: &mut Diagnostics) -> RunTable<MetricRecord>
{
    let mut metrics: RunTable<MetricRecord> = BTreeMap::new();
    for (key, groups) in runs {
        let merged = merge_groups(groups, policy);
        if merged.is_empty() {
            diag.warn(format!("no perf data merged for run {}", key));
            continue;
        }
        metrics.entry(key.config.clone())
            .or_default()
            .insert(key.algorithm.clone(), derive(&merged));
    }
    metrics
}

/// Keeps only the runs with a wall time, adding it to their record.
pub fn join(metrics: &RunTable<MetricRecord>, wall_times: &RunTable<f64>) -> RunTable<MetricRecord> {
    let mut table: RunTable<MetricRecord> = BTreeMap::new();
    for (config, algos) in metrics {
        let Some(times) = wall_times.get(config) else {
            continue;
        };
        for (algo, record) in algos {
            if let Some(&millis) = times.get(algo) {
                let mut joined = record.clone();
                joined.insert(Metric::AverageWallTime, MetricValue::Numeric(millis));
                table.entry(config.clone()).or_default().insert(algo.clone(), joined);
            }
        }
    }
    table
}

pub fn assemble(
    dirs: &RunDirs,
    options: &AssembleOptions,
    diag: &mut Diagnostics) -> Result<Assembly, AnalysisError>
{
    let wall_times = walltime::reconcile(&dirs.results_stdout, options.iterations, diag)?;
    let runs = load_counter_groups(&dirs.perf_stats, diag)?;
    let metrics = derive_runs(&runs, &options.merge, diag);

    for (config, algos) in &metrics {
        for algo in algos.keys() {
            let missing = wall_times.get(config).map_or(true, |t| !t.contains_key(algo));
            if missing {
                diag.warn(format!(
                    "no average wall time for {} {}, excluded from the metrics table",
                    algo, config
                ));
            }
        }
    }

    let table = join(&metrics, &wall_times);
    Ok(Assembly { metrics, wall_times, table })
}
