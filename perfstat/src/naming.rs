//! File naming conventions of the benchmark harness.
//!
//! - `<algorithm>_<generator>_<datatype>_GROUP<n>_perf_stat.txt`
//! - `<algorithm>_<generator>_<datatype>_stdout.txt`
//! - `<algorithm>_<generator>_<datatype>_no_perf_round_mem_report.txt`
//!
//! Algorithm names may contain underscores; generator and datatype may not.

use std::fmt;
use serde::{Deserialize, Serialize};
use crate::merge::GroupId;

pub type AlgorithmId = String;

pub const PERF_STAT_SUFFIX: &str = "_perf_stat.txt";
pub const STDOUT_SUFFIX: &str = "_stdout.txt";
pub const MEM_REPORT_SUFFIX: &str = "_no_perf_round_mem_report.txt";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigKey {
    pub generator: String,
    pub datatype: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunKey {
    pub config: ConfigKey,
    pub algorithm: AlgorithmId,
}

impl ConfigKey {
    pub fn new(generator: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self { generator: generator.into(), datatype: datatype.into() }
    }
}

impl RunKey {
    pub fn new(
        algorithm: impl Into<String>,
        generator: impl Into<String>,
        datatype: impl Into<String>) -> Self
    {
        Self {
            config: ConfigKey::new(generator, datatype),
            algorithm: algorithm.into(),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.generator, self.datatype)
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.algorithm, self.config)
    }
}

/// Name of an algorithm as shown in reports and plots.
pub fn display_name(algorithm: &str) -> &str {
    algorithm.strip_prefix("benchmark_").unwrap_or(algorithm)
}

pub fn parse_perf_stat_name(name: &str) -> Option<(RunKey, GroupId)> {
    let stem = name.strip_suffix(PERF_STAT_SUFFIX)?;
    let (rest, group) = stem.rsplit_once('_')?;
    let group = group.parse::<GroupId>().ok()?;
    Some((split_run_key(rest)?, group))
}

pub fn parse_stdout_name(name: &str) -> Option<RunKey> {
    split_run_key(name.strip_suffix(STDOUT_SUFFIX)?)
}

pub fn parse_mem_report_name(name: &str) -> Option<RunKey> {
    split_run_key(name.strip_suffix(MEM_REPORT_SUFFIX)?)
}

fn split_run_key(stem: &str) -> Option<RunKey> {
    let mut parts = stem.rsplitn(3, '_');
    let datatype = parts.next()?;
    let generator = parts.next()?;
    let algorithm = parts.next()?;

    if [algorithm, generator, datatype].iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(RunKey::new(algorithm, generator, datatype))
}
