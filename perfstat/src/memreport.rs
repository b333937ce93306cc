//! Parser for the `/usr/bin/time -v` reports of the runs made without perf.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};
use phf::phf_map;
use serde::Serialize;
use crate::{
    diag::Diagnostics, fmt_open_err, list_dir, metrics::MetricValue, naming, path_str,
    AnalysisError, RunTable,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemoryField {
    MaxRss,
    MinorPageFaults,
    MajorPageFaults,
    VoluntaryContextSwitches,
    InvoluntaryContextSwitches,
}

static FIELD_LABELS: phf::Map<&'static str, MemoryField> = phf_map! {
    "Maximum resident set size (kbytes)" => MemoryField::MaxRss,
    "Minor (reclaiming a frame) page faults" => MemoryField::MinorPageFaults,
    "Major (requiring I/O) page faults" => MemoryField::MajorPageFaults,
    "Voluntary context switches" => MemoryField::VoluntaryContextSwitches,
    "Involuntary context switches" => MemoryField::InvoluntaryContextSwitches,
};

impl MemoryField {
    pub const ALL: [MemoryField; 5] = [
        MemoryField::MaxRss,
        MemoryField::MinorPageFaults,
        MemoryField::MajorPageFaults,
        MemoryField::VoluntaryContextSwitches,
        MemoryField::InvoluntaryContextSwitches,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MemoryField::MaxRss => "Max RSS (kB)",
            MemoryField::MinorPageFaults => "Minor Page Faults",
            MemoryField::MajorPageFaults => "Major Page Faults",
            MemoryField::VoluntaryContextSwitches => "Voluntary Context Switches",
            MemoryField::InvoluntaryContextSwitches => "Involuntary Context Switches",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            MemoryField::MaxRss => "kB",
            _ => "Count",
        }
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct MemoryReport {
    #[serde(serialize_with = "serialize_fields")]
    fields: BTreeMap<MemoryField, u64>,
}

fn serialize_fields<S: serde::Serializer>(
    fields: &BTreeMap<MemoryField, u64>,
    serializer: S) -> Result<S::Ok, S::Error>
{
    serializer.collect_map(fields.iter().map(|(f, v)| (f.name(), v)))
}

impl MemoryReport {
    pub fn get(&self, field: MemoryField) -> Option<u64> {
        self.fields.get(&field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Resident kilobytes per page fault, major and minor combined.
    pub fn kb_per_fault(&self) -> MetricValue {
        let (Some(rss), Some(major), Some(minor)) = (
            self.get(MemoryField::MaxRss),
            self.get(MemoryField::MajorPageFaults),
            self.get(MemoryField::MinorPageFaults),
        ) else {
            return MetricValue::NotApplicable;
        };

        match major.saturating_add(minor) {
            0 => MetricValue::NotApplicable,
            faults => MetricValue::Numeric(rss as f64 / faults as f64),
        }
    }
}

pub fn parse_memory_report(
    reader: impl BufRead,
    origin: &str,
    diag: &mut Diagnostics) -> Result<MemoryReport, String>
{
    let mut report = MemoryReport::default();

    for line in reader.lines() {
        let line = line
            .map_err(|e| format!("unable to read line from {}: {}", origin, e))?;
        let Some((label, value)) = line.trim().split_once(": ") else {
            continue;
        };
        let Some(field) = FIELD_LABELS.get(label.trim()) else {
            continue;
        };

        match value.trim().parse::<u64>() {
            Ok(v) => {
                report.fields.insert(*field, v);
            },
            Err(_) => diag.warn(format!(
                "could not parse value for '{}' from line '{}' in {}",
                field.name(), line.trim(), origin
            )),
        }
    }

    if report.is_empty() {
        diag.warn(format!(
            "no expected memory/context metrics found in {}, content might be malformed or empty",
            origin
        ));
    }
    Ok(report)
}

pub fn read_memory_report(path: &Path, diag: &mut Diagnostics) -> Result<MemoryReport, String> {
    let file = File::open(path).map_err(|e| fmt_open_err(e, path))?;
    parse_memory_report(BufReader::new(file), path_str(path), diag)
}

/// Parses every memory report in `dir`. Unreadable reports and reports
/// without any recognised field are left out.
pub fn scan_memory_reports(
    dir: &Path,
    diag: &mut Diagnostics) -> Result<RunTable<MemoryReport>, AnalysisError>
{
    let files: Vec<_> = list_dir(dir)?
        .into_iter()
        .filter_map(|(name, path)| naming::parse_mem_report_name(&name).map(|k| (k, path)))
        .collect();

    if files.is_empty() {
        return Err(AnalysisError::NoMemoryReports(dir.to_path_buf()));
    }

    let mut reports: RunTable<MemoryReport> = BTreeMap::new();
    for (key, path) in files {
        match read_memory_report(&path, diag) {
            Ok(report) if !report.is_empty() => {
                reports.entry(key.config).or_default().insert(key.algorithm, report);
            },
            Ok(_) => (),
            Err(e) => diag.warn(e),
        }
    }
    Ok(reports)
}
