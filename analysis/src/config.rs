//! Optional TOML configuration of an analysis.
//!
//! ```toml
//! iterations = 5
//! exclude = ["benchmark_donothing"]
//! features = ["Cycles", "Total Instructions (IC)"]
//!
//! [merge]
//! group_order = ["GROUP1", "GROUP2", "GROUP3", "GROUP4"]
//!
//! [forest]
//! trees = 200
//! ```

use std::{fs, path::Path};
use serde::Deserialize;
use perfstat::{
    assemble::AssembleOptions,
    merge::MergePolicy,
    metrics::Metric,
    walltime::DEFAULT_ITERATIONS,
};
use crate::{fmt_open_err, importance::{ForestParams, DEFAULT_FEATURES}, path_str};

/// Algorithm left out of plots and the feature model by default. It only
/// measures the harness itself.
pub const BASELINE_ALGORITHM: &str = "benchmark_donothing";

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub iterations: usize,
    /// Algorithms left out of plots and the feature model.
    pub exclude: Vec<String>,
    pub features: Vec<Metric>,
    pub merge: MergePolicy,
    pub forest: ForestParams,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            exclude: vec![BASELINE_ALGORITHM.to_string()],
            features: DEFAULT_FEATURES.to_vec(),
            merge: MergePolicy::default(),
            forest: ForestParams::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path).map_err(|e| fmt_open_err(e, path))?;
        let config = Self::from_toml(&text)
            .map_err(|e| format!("Invalid toml file {}: {}", path_str(path), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    pub fn validate(&self) -> Result<(), String> {
        self.assemble_options().validate()?;
        self.forest.validate()?;

        if self.features.is_empty() {
            return Err("Invalid parameter (features): list is empty.".to_string());
        }
        if self.features.contains(&Metric::AverageWallTime) {
            return Err(format!(
                "Invalid parameter (features): \"{}\" is the prediction target.",
                Metric::AverageWallTime
            ));
        }
        Ok(())
    }

    pub fn assemble_options(&self) -> AssembleOptions {
        AssembleOptions {
            iterations: self.iterations,
            merge: self.merge.clone(),
        }
    }

    pub fn is_excluded(&self, algorithm: &str) -> bool {
        self.exclude.iter().any(|a| a == algorithm)
    }
}
