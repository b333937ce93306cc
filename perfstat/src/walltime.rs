//! Average wall time from the benchmark's `RESULT` lines.
//!
//! A stdout log opens with one block of `iterations` in-process runs
//! (`run=0..iterations`), each printing a `RESULT` line with its elapsed
//! `milli=` time. Anything after that block belongs to later phases of the
//! harness and is ignored. Run 0 is a cold-cache warm-up and is dropped.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    sync::OnceLock,
};
use regex::Regex;
use smallvec::SmallVec;
use crate::{
    diag::Diagnostics, fmt_open_err, list_dir, naming, path_str, AnalysisError, RunTable,
};

pub const RESULT_MARKER: &str = "RESULT";
pub const DEFAULT_ITERATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallTimeSample {
    pub run: u32,
    pub millis: f64,
}

pub type SampleBlock = SmallVec<[WallTimeSample; 8]>;

fn run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\brun=(\d+)\b").expect("run field regex"))
}

fn milli_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bmilli=(\d+(?:\.\d*)?(?:[eE][-+]?\d+)?)").expect("milli field regex")
    })
}

/// Extracts the `run=` and `milli=` fields of a `RESULT` line. Each field
/// is matched on its own wherever it occurs, so separators and text glued
/// after the `milli=` number do not matter.
pub fn parse_result_line(line: &str) -> (Option<u32>, Option<f64>) {
    let run = run_regex()
        .captures(line)
        .and_then(|c| c[1].parse().ok());
    let millis = milli_regex()
        .captures(line)
        .and_then(|c| c[1].parse::<f64>().ok())
        .filter(|m| m.is_finite());
    (run, millis)
}

/// Reads the samples of the first `iterations` `RESULT` lines. Lines whose
/// fields do not parse use up their slot in the block.
pub fn read_first_block(
    reader: impl BufRead,
    iterations: usize,
    origin: &str,
    diag: &mut Diagnostics) -> Result<SampleBlock, String>
{
    let mut block = SampleBlock::new();
    let mut consumed = 0;

    for line in reader.lines() {
        if consumed >= iterations {
            break;
        }
        let line = line
            .map_err(|e| format!("unable to read line from {}: {}", origin, e))?;
        if !line.starts_with(RESULT_MARKER) {
            continue;
        }
        consumed += 1;

        match parse_result_line(&line) {
            (Some(run), Some(millis)) => block.push(WallTimeSample { run, millis }),
            _ => diag.warn(format!(
                "RESULT line without run/milli fields in {}: {}",
                origin, line.trim()
            )),
        }
    }
    Ok(block)
}

/// Mean of the samples without the warm-up run. A lone sample is used as
/// is. `None` if nothing is left to average.
pub fn average_excluding_warmup(samples: &[WallTimeSample]) -> Option<f64> {
    if let [only] = samples {
        return Some(only.millis);
    }
    let (sum, count) = samples.iter()
        .filter(|s| s.run != 0)
        .fold((0.0, 0usize), |(sum, count), s| (sum + s.millis, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Average wall time of one stdout log, `None` (with a diagnostic) when the
/// log yields nothing usable.
pub fn read_wall_time(
    reader: impl BufRead,
    iterations: usize,
    origin: &str,
    diag: &mut Diagnostics) -> Result<Option<f64>, String>
{
    let block = read_first_block(reader, iterations, origin, diag)?;

    if block.is_empty() {
        diag.warn(format!("no RESULT lines with milli time in the first block of {}", origin));
        return Ok(None);
    }
    if block.len() < iterations {
        diag.warn(format!(
            "found only {} milli values in the first block of {}, expected {}; using available data",
            block.len(), origin, iterations
        ));
    }

    let average = average_excluding_warmup(&block);
    if average.is_none() {
        diag.warn(format!("no samples besides the warm-up run in {}", origin));
    }
    Ok(average)
}

pub fn read_wall_time_file(
    path: &Path,
    iterations: usize,
    diag: &mut Diagnostics) -> Result<Option<f64>, String>
{
    let file = File::open(path).map_err(|e| fmt_open_err(e, path))?;
    read_wall_time(BufReader::new(file), iterations, path_str(path), diag)
}

/// Average wall time of every `*_stdout.txt` log in `dir`, keyed by
/// configuration then algorithm. Logs without usable samples are left out.
pub fn reconcile(
    dir: &Path,
    iterations: usize,
    diag: &mut Diagnostics) -> Result<RunTable<f64>, AnalysisError>
{
    let files: Vec<_> = list_dir(dir)?
        .into_iter()
        .filter(|(name, _)| name.ends_with(naming::STDOUT_SUFFIX))
        .collect();

    if files.is_empty() {
        return Err(AnalysisError::NoResultFiles(dir.to_path_buf()));
    }

    let mut averages: RunTable<f64> = BTreeMap::new();
    for (name, path) in files {
        let Some(key) = naming::parse_stdout_name(&name) else {
            diag.warn(format!("could not parse algo/gen/type from filename {}, skipping", name));
            continue;
        };

        match read_wall_time_file(&path, iterations, diag) {
            Ok(Some(average)) => {
                averages.entry(key.config).or_default().insert(key.algorithm, average);
            },
            Ok(None) => (),
            Err(e) => diag.warn(e),
        }
    }
    Ok(averages)
}
