//! Summaries and plots of the memory reports taken in the runs without
//! perf attached.

use std::{collections::BTreeMap, fmt::Write, fs, path::{Path, PathBuf}};
use perfstat::{
    assemble::MEM_REPORTS_DIR,
    diag::Diagnostics,
    memreport::{scan_memory_reports, MemoryField, MemoryReport},
    naming::display_name,
    AlgorithmId, ConfigKey,
};
use crate::{
    create_dir, fmt_open_err,
    plot::{render_grid, BarPanel},
    report::format_count,
    stage,
};

const MEMORY_COLUMNS: usize = 3;

/// Benchmark parameters shown in the plot titles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunParams {
    pub threads: u32,
    pub num_runs: u32,
    pub min_log: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemoryMetric {
    Field(MemoryField),
    KbPerFault,
}

pub const MEMORY_METRICS: [MemoryMetric; 6] = [
    MemoryMetric::Field(MemoryField::MaxRss),
    MemoryMetric::Field(MemoryField::MinorPageFaults),
    MemoryMetric::Field(MemoryField::MajorPageFaults),
    MemoryMetric::Field(MemoryField::VoluntaryContextSwitches),
    MemoryMetric::Field(MemoryField::InvoluntaryContextSwitches),
    MemoryMetric::KbPerFault,
];

impl MemoryMetric {
    pub fn name(&self) -> &'static str {
        match self {
            MemoryMetric::Field(f) => f.name(),
            MemoryMetric::KbPerFault => "kB per Total Page Fault",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            MemoryMetric::Field(f) => f.unit(),
            MemoryMetric::KbPerFault => "kB/fault",
        }
    }

    pub fn lower_is_better(&self) -> bool {
        !matches!(self, MemoryMetric::KbPerFault)
    }

    pub fn value(&self, report: &MemoryReport) -> Option<f64> {
        match self {
            MemoryMetric::Field(f) => report.get(*f).map(|v| v as f64),
            MemoryMetric::KbPerFault => report.kb_per_fault().as_f64(),
        }
    }

    fn format(&self, report: &MemoryReport) -> String {
        match self {
            MemoryMetric::Field(f) => report.get(*f)
                .map(format_count)
                .unwrap_or_else(|| "N/A".to_string()),
            MemoryMetric::KbPerFault => report.kb_per_fault().as_f64()
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "N/A".to_string()),
        }
    }
}

pub fn render_memory_summary(
    config: &ConfigKey,
    reports: &BTreeMap<AlgorithmId, MemoryReport>) -> String
{
    let mut out = String::new();
    let _ = writeln!(
        out, "Memory Summary: Generator='{}', DataType='{}'",
        config.generator, config.datatype
    );
    let _ = writeln!(out, "====================================================");
    for (algo, report) in reports {
        let _ = writeln!(out, "\n  Algorithm: {}", display_name(algo));
        for metric in MEMORY_METRICS {
            let _ = writeln!(out, "    {:<50}: {:>20}", metric.name(), metric.format(report));
        }
    }
    out
}

pub fn memory_panels(reports: &BTreeMap<AlgorithmId, MemoryReport>) -> Vec<BarPanel> {
    MEMORY_METRICS.iter()
        .map(|metric| BarPanel {
            title: metric.name().to_string(),
            unit: metric.unit(),
            lower_is_better: metric.lower_is_better(),
            bars: reports.iter()
                .filter_map(|(algo, report)| metric.value(report)
                    .filter(|v| v.is_finite())
                    .map(|v| (display_name(algo).to_string(), v)))
                .collect(),
        })
        .collect()
}

/// Parses `<run_dir>/mem_reports` and writes a summary and a plot per
/// configuration into `out_dir`.
pub fn analyze_memory(
    run_dir: &Path,
    out_dir: &Path,
    params: RunParams,
    diag: &mut Diagnostics) -> Result<Vec<PathBuf>, String>
{
    let reports_dir = run_dir.join(MEM_REPORTS_DIR);
    stage("READING", "memory reports", &reports_dir);
    let reports = scan_memory_reports(&reports_dir, diag).map_err(|e| e.to_string())?;
    if reports.is_empty() {
        return Err("no memory data loaded".to_string());
    }

    create_dir(out_dir)?;
    let mut written = Vec::new();
    for (config, algos) in &reports {
        let summary_path = out_dir.join(format!(
            "memory_summary_{}_{}.txt", config.generator, config.datatype
        ));
        stage("WRITING", "memory summary", &summary_path);
        fs::write(&summary_path, render_memory_summary(config, algos))
            .map_err(|e| fmt_open_err(e, &summary_path))?;
        written.push(summary_path);

        let plot_path = out_dir.join(format!(
            "memory_analysis_{}_{}.svg", config.generator, config.datatype
        ));
        let title = format!(
            "Memory & Context Switch Metrics: Generator={}, DataType={} (Threads: {}, IntRuns: {}, SizeLog: {})",
            config.generator, config.datatype, params.threads, params.num_runs, params.min_log
        );
        stage("PLOTTING", "memory metrics", &plot_path);
        render_grid(&plot_path, &title, &memory_panels(algos), MEMORY_COLUMNS)?;
        written.push(plot_path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(text: &str) -> MemoryReport {
        let mut diag = Diagnostics::quiet();
        perfstat::memreport::parse_memory_report(text.as_bytes(), "test", &mut diag).unwrap()
    }

    #[test]
    fn test_summary_lists_every_metric() {
        let config = ConfigKey::new("g", "t");
        let reports: BTreeMap<_, _> = [(
            "benchmark_x".to_string(),
            report("Maximum resident set size (kbytes): 4096\nMinor (reclaiming a frame) page faults: 1024\nMajor (requiring I/O) page faults: 0\n"),
        )].into_iter().collect();

        let text = render_memory_summary(&config, &reports);
        assert!(text.contains("Algorithm: x\n"));
        assert!(text.contains("4,096"));
        assert!(text.contains("4.00"));
        assert!(text.contains("Voluntary Context Switches"));
        assert!(text.contains("N/A"));
    }

    #[test]
    fn test_panels() {
        let reports: BTreeMap<_, _> = [
            ("benchmark_a".to_string(), report("Maximum resident set size (kbytes): 10\n")),
            ("benchmark_b".to_string(), report("Maximum resident set size (kbytes): 20\nVoluntary context switches: 3\n")),
        ].into_iter().collect();

        let panels = memory_panels(&reports);
        assert_eq!(panels.len(), MEMORY_METRICS.len());
        assert_eq!(panels[0].bars, vec![("a".to_string(), 10.0), ("b".to_string(), 20.0)]);
        assert_eq!(panels[3].bars, vec![("b".to_string(), 3.0)]);
        assert!(panels[5].bars.is_empty());
        assert!(!panels[5].lower_is_better);
    }
}
