//! Ranking counters by how well they predict wall time.
//!
//! A random forest of CART regression trees is fitted to the joined table
//! (wall time as target, counter metrics as features). A feature's score
//! is the variance reduction of the splits made on it, normalised per tree
//! and averaged over the forest.

use std::{fmt::Write, fs, path::{Path, PathBuf}};
use indicatif::{ParallelProgressIterator, ProgressBar};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use perfstat::{
    diag::Diagnostics,
    metrics::{Metric, MetricRecord},
    RunTable,
};
use crate::{
    config::AnalysisConfig,
    fmt_open_err,
    plot::{render_grid, BarPanel},
    stage,
};

pub const SCORES_FILE: &str = "feature_importance_scores.txt";
pub const CHART_FILE: &str = "feature_importance_wall_time.svg";
const CHART_TOP: usize = 20;

pub const DEFAULT_FEATURES: [Metric; 22] = [
    Metric::Cycles,
    Metric::Instructions,
    Metric::MemLoadsRetired,
    Metric::MemStoresRetired,
    Metric::L1LoadHits,
    Metric::L1LoadMisses,
    Metric::L1FillBufferHits,
    Metric::L1dStores,
    Metric::L2LoadHits,
    Metric::L2LoadMisses,
    Metric::L3LoadHits,
    Metric::L3LoadMisses,
    Metric::LlcStores,
    Metric::LlcStoreMisses,
    Metric::BranchMisses,
    Metric::L1IcacheLoadMisses,
    Metric::DtlbLoadMisses,
    Metric::DtlbStoreMisses,
    Metric::ItlbLoadMisses,
    Metric::ContextSwitches,
    Metric::PageFaults,
    Metric::StallsL3Miss,
];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ForestParams {
    pub trees: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self { trees: 200, min_samples_leaf: 2, seed: 42 }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.trees == 0 {
            return Err("Invalid parameter (trees): value must be greater than 0.".to_string());
        }
        if self.min_samples_leaf == 0 {
            return Err("Invalid parameter (min_samples_leaf): value must be greater than 0.".to_string());
        }
        Ok(())
    }
}

/// Feature matrix with every gap filled, one row per run.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub features: Vec<Metric>,
    pub rows: Vec<Vec<f64>>,
    pub target: Vec<f64>,
}

/// Builds the training set from the runs not in `exclude`. Missing and
/// not applicable values are replaced by the column mean; columns with no
/// value at all are dropped. `None` if fewer than two runs or no feature
/// remain.
pub fn build_dataset(
    table: &RunTable<MetricRecord>,
    features: &[Metric],
    exclude: &[String],
    diag: &mut Diagnostics) -> Option<Dataset>
{
    let mut raw: Vec<Vec<Option<f64>>> = Vec::new();
    let mut target = Vec::new();

    for algos in table.values() {
        for (algo, record) in algos {
            if exclude.contains(algo) {
                continue;
            }
            let Some(wall_time) = record.value(Metric::AverageWallTime).filter(|t| t.is_finite()) else {
                continue;
            };
            raw.push(features.iter()
                .map(|f| record.value(*f).filter(|v| v.is_finite()))
                .collect());
            target.push(wall_time);
        }
    }

    if raw.len() < 2 {
        diag.warn(format!(
            "insufficient valid data rows ({}) for feature importance analysis",
            raw.len()
        ));
        return None;
    }

    let mut kept = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();
    for (col, feature) in features.iter().enumerate() {
        let present: Vec<f64> = raw.iter().filter_map(|row| row[col]).collect();
        if present.is_empty() {
            diag.warn(format!("feature '{}' has no values, dropped", feature));
            continue;
        }
        let fill = mean(present.iter().copied());
        columns.push(raw.iter().map(|row| row[col].unwrap_or(fill)).collect());
        kept.push(*feature);
    }

    if kept.is_empty() {
        diag.warn("no feature has any value, skipping feature importance analysis");
        return None;
    }

    let rows = (0..target.len())
        .map(|r| columns.iter().map(|c| c[r]).collect())
        .collect();
    Some(Dataset { features: kept, rows, target })
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut at = 0;
        loop {
            match self.nodes[at] {
                Node::Leaf(value) => return value,
                Node::Split { feature, threshold, left, right } => {
                    at = if row[feature] <= threshold { left } else { right };
                },
            }
        }
    }
}

struct Split {
    feature: usize,
    threshold: f64,
    /// Drop in summed squared error.
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

fn squared_error(sum: f64, sum_sq: f64, n: usize) -> f64 {
    (sum_sq - sum * sum / n as f64).max(0.0)
}

struct TreeBuilder<'a> {
    data: &'a Dataset,
    min_samples_leaf: usize,
    nodes: Vec<Node>,
    importance: Vec<f64>,
}

impl<'a> TreeBuilder<'a> {
    fn best_split(&self, samples: &[usize]) -> Option<Split> {
        let n = samples.len();
        let y = &self.data.target;
        let total: f64 = samples.iter().map(|&s| y[s]).sum();
        let total_sq: f64 = samples.iter().map(|&s| y[s] * y[s]).sum();
        let parent_error = squared_error(total, total_sq, n);

        let mut best: Option<(usize, f64, f64, Vec<usize>, usize)> = None;
        for feature in 0..self.data.features.len() {
            let x = |s: usize| self.data.rows[s][feature];
            let mut order = samples.to_vec();
            order.sort_by(|&a, &b| x(a).total_cmp(&x(b)));

            let (mut left_sum, mut left_sq) = (0.0, 0.0);
            for i in 0..n - 1 {
                let v = y[order[i]];
                left_sum += v;
                left_sq += v * v;

                let left_n = i + 1;
                let right_n = n - left_n;
                if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                    continue;
                }
                if x(order[i]) == x(order[i + 1]) {
                    continue;
                }

                let error = squared_error(left_sum, left_sq, left_n)
                    + squared_error(total - left_sum, total_sq - left_sq, right_n);
                let gain = parent_error - error;
                if best.as_ref().map_or(true, |b| gain > b.1) {
                    let threshold = (x(order[i]) + x(order[i + 1])) / 2.0;
                    best = Some((feature, gain, threshold, order.clone(), left_n));
                }
            }
        }

        let (feature, gain, threshold, order, left_n) = best?;
        if gain <= 1e-12 * parent_error.max(1.0) {
            return None;
        }
        let right = order[left_n..].to_vec();
        let mut left = order;
        left.truncate(left_n);
        Some(Split { feature, threshold, gain, left, right })
    }

    fn grow(&mut self, samples: &[usize]) -> usize {
        let at = self.nodes.len();
        let leaf = Node::Leaf(mean(samples.iter().map(|&s| self.data.target[s])));
        self.nodes.push(leaf);

        if samples.len() < 2 * self.min_samples_leaf {
            return at;
        }
        let Some(split) = self.best_split(samples) else {
            return at;
        };

        self.importance[split.feature] += split.gain;
        let left = self.grow(&split.left);
        let right = self.grow(&split.right);
        self.nodes[at] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        at
    }
}

/// Fits one tree on a bootstrap sample. Returns the tree and its
/// normalised per-feature importances.
fn fit_tree(data: &Dataset, min_samples_leaf: usize, seed: u64) -> (Tree, Vec<f64>) {
    let mut rng = ChaChaRng::seed_from_u64(seed);
    let n = data.target.len();
    let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

    let mut builder = TreeBuilder {
        data,
        min_samples_leaf,
        nodes: Vec::new(),
        importance: vec![0.0; data.features.len()],
    };
    builder.grow(&sample);

    let mut importance = builder.importance;
    normalise(&mut importance);
    (Tree { nodes: builder.nodes }, importance)
}

fn normalise(values: &mut [f64]) {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter_mut().for_each(|v| *v /= total);
    }
}

#[derive(Debug, Clone)]
pub struct Forest {
    pub trees: Vec<Tree>,
    pub importances: Vec<f64>,
}

impl Forest {
    pub fn predict(&self, row: &[f64]) -> f64 {
        mean(self.trees.iter().map(|t| t.predict(row)))
    }
}

/// Fits the forest in parallel. Tree seeds are drawn up front from
/// `params.seed`, so the result does not depend on scheduling.
pub fn fit_forest(data: &Dataset, params: &ForestParams, progress: ProgressBar) -> Forest {
    let mut rng = ChaChaRng::seed_from_u64(params.seed);
    let seeds: Vec<u64> = (0..params.trees).map(|_| rng.gen()).collect();

    let fitted: Vec<(Tree, Vec<f64>)> = seeds
        .par_iter()
        .progress_with(progress)
        .map(|&seed| fit_tree(data, params.min_samples_leaf, seed))
        .collect();

    let mut importances = vec![0.0; data.features.len()];
    for (_, tree_importance) in &fitted {
        for (total, v) in importances.iter_mut().zip(tree_importance) {
            *total += v;
        }
    }
    normalise(&mut importances);

    Forest {
        trees: fitted.into_iter().map(|(t, _)| t).collect(),
        importances,
    }
}

/// Features by descending importance; ties keep the feature order.
pub fn rank(features: &[Metric], importances: &[f64]) -> Vec<(Metric, f64)> {
    let mut ranked: Vec<(Metric, f64)> =
        features.iter().copied().zip(importances.iter().copied()).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

pub fn render_scores(ranked: &[(Metric, f64)]) -> String {
    let mut out = String::from("Feature Importance Scores for Predicting Wall Time\n");
    out.push_str("----------------------------------------------------\n");
    for (i, (feature, score)) in ranked.iter().enumerate() {
        let _ = writeln!(out, "{:2}) {:<45} {:.6}", i + 1, feature.name(), score);
    }
    out
}

/// Fits the model on `table` and writes the score list and chart into
/// `out_dir`. `Ok(None)` when there is not enough data.
pub fn run_feature_importance(
    table: &RunTable<MetricRecord>,
    config: &AnalysisConfig,
    out_dir: &Path,
    diag: &mut Diagnostics) -> Result<Option<(PathBuf, PathBuf)>, String>
{
    let Some(data) = build_dataset(table, &config.features, &config.exclude, diag) else {
        return Ok(None);
    };

    println!("Fitting {} trees on {} runs", config.forest.trees, data.target.len());
    let forest = fit_forest(&data, &config.forest, ProgressBar::new(config.forest.trees as u64));
    let ranked = rank(&data.features, &forest.importances);

    let scores_path = out_dir.join(SCORES_FILE);
    stage("WRITING", "feature importance scores", &scores_path);
    fs::write(&scores_path, render_scores(&ranked)).map_err(|e| fmt_open_err(e, &scores_path))?;

    let shown = ranked.len().min(CHART_TOP);
    let panel = BarPanel {
        title: format!("Top {} Feature Importances for Predicting Wall Time", shown),
        unit: "Importance Score",
        lower_is_better: false,
        bars: ranked[..shown].iter().map(|(m, s)| (m.name().to_string(), *s)).collect(),
    };
    let chart_path = out_dir.join(CHART_FILE);
    stage("PLOTTING", "feature importances", &chart_path);
    render_grid(&chart_path, "Feature Importance", &[panel], 1)?;

    Ok(Some((scores_path, chart_path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfstat::{metrics::MetricValue, ConfigKey};

    fn run(wall: f64, cycles: u64, noise: u64) -> MetricRecord {
        let mut record = MetricRecord::new();
        record.insert(Metric::AverageWallTime, MetricValue::Numeric(wall));
        record.insert(Metric::Cycles, MetricValue::Count(cycles));
        record.insert(Metric::BranchMisses, MetricValue::Count(noise));
        record.insert(Metric::Ipc, MetricValue::NotApplicable);
        record
    }

    fn table(runs: Vec<(&str, MetricRecord)>) -> RunTable<MetricRecord> {
        let algos = runs.into_iter().map(|(a, r)| (a.to_string(), r)).collect();
        [(ConfigKey::new("g", "t"), algos)].into_iter().collect()
    }

    fn linear_table() -> RunTable<MetricRecord> {
        let noise = [7, 3, 9, 1, 5, 8, 2, 6, 4, 0, 7, 3, 9, 1, 5, 8];
        let runs: Vec<(String, MetricRecord)> = (0..16u64)
            .map(|i| (format!("algo{:02}", i), run(i as f64 * 10.0, i * 1000, noise[i as usize])))
            .collect();
        let algos = runs.into_iter().collect();
        [(ConfigKey::new("g", "t"), algos)].into_iter().collect()
    }

    #[test]
    fn test_imputation_and_dropped_columns() {
        let mut partial = run(2.0, 0, 0);
        partial.insert(Metric::Cycles, MetricValue::NotApplicable);
        let t = table(vec![("a", run(1.0, 10, 1)), ("b", partial), ("c", run(3.0, 30, 3))]);

        let mut diag = Diagnostics::quiet();
        let data = build_dataset(&t, &[Metric::Cycles, Metric::Ipc], &[], &mut diag).unwrap();
        assert_eq!(data.features, vec![Metric::Cycles]);
        assert_eq!(data.rows, vec![vec![10.0], vec![20.0], vec![30.0]]);
        assert_eq!(data.target, vec![1.0, 2.0, 3.0]);
        assert!(diag.contains("IPC"));
    }

    #[test]
    fn test_too_few_rows() {
        let t = table(vec![("a", run(1.0, 10, 1)), ("benchmark_donothing", run(0.1, 1, 1))]);
        let mut diag = Diagnostics::quiet();
        let data = build_dataset(&t, &[Metric::Cycles], &["benchmark_donothing".to_string()], &mut diag);
        assert!(data.is_none());
        assert!(diag.contains("insufficient valid data rows (1)"));
    }

    #[test]
    fn test_informative_feature_ranked_first() {
        let mut diag = Diagnostics::quiet();
        let data = build_dataset(
            &linear_table(), &[Metric::BranchMisses, Metric::Cycles], &[], &mut diag).unwrap();

        let params = ForestParams { trees: 30, ..ForestParams::default() };
        let forest = fit_forest(&data, &params, ProgressBar::hidden());
        let ranked = rank(&data.features, &forest.importances);

        assert_eq!(ranked[0].0, Metric::Cycles);
        let total: f64 = forest.importances.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!((forest.predict(&[0.0, 15_000.0]) - 150.0).abs() < 30.0);
    }

    #[test]
    fn test_deterministic() {
        let mut diag = Diagnostics::quiet();
        let data = build_dataset(
            &linear_table(), &[Metric::BranchMisses, Metric::Cycles], &[], &mut diag).unwrap();
        let params = ForestParams { trees: 8, ..ForestParams::default() };

        let a = fit_forest(&data, &params, ProgressBar::hidden());
        let b = fit_forest(&data, &params, ProgressBar::hidden());
        assert_eq!(a.importances, b.importances);
    }

    #[test]
    fn test_score_file_format() {
        let text = render_scores(&[(Metric::Cycles, 0.75), (Metric::BranchMisses, 0.25)]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Feature Importance Scores for Predicting Wall Time");
        assert!(lines[2].starts_with(" 1) Cycles "));
        assert!(lines[2].ends_with(" 0.750000"));
        assert!(lines[3].starts_with(" 2) Branch Misses"));
    }
}
