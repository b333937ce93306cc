//! Text reports and the flat metrics table.

use std::{collections::BTreeMap, fmt::Write, fs::File, io::BufWriter, path::Path};
use perfstat::{
    assemble::Assembly,
    metrics::{Metric, MetricKind, MetricRecord, MetricValue},
    naming::display_name,
    AlgorithmId, ConfigKey,
};
use crate::{fmt_open_err, path_str};

pub const METRICS_TABLE_FILE: &str = "metrics_table.json";

const RULE: &str = "====================================================";
const NOT_APPLICABLE: &str = "N/A";

/// `1234567` as `1,234,567`.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// One `name: value` line of a report, value right-aligned.
pub fn format_metric_line(metric: Metric, value: MetricValue) -> String {
    let (value, suffix) = match (value, metric.kind()) {
        (MetricValue::NotApplicable, _) => (NOT_APPLICABLE.to_string(), ""),
        (MetricValue::Count(c), _) => (format_count(c), ""),
        (MetricValue::Numeric(v), MetricKind::Percent) => (format!("{:.2}", v), " %"),
        (MetricValue::Numeric(v), _) => (format!("{:.3}", v), ""),
    };
    format!("    {:<50}: {:>20}{}\n", metric.name(), value, suffix)
}

/// Report of one configuration. Every algorithm with counter data is
/// listed, including those without a wall time.
pub fn render_config_report(
    config: &ConfigKey,
    algos: &BTreeMap<AlgorithmId, MetricRecord>,
    wall_times: Option<&BTreeMap<AlgorithmId, f64>>) -> String
{
    let mut out = String::new();
    let _ = writeln!(
        out, "Configuration: Generator='{}', DataType='{}'",
        config.generator, config.datatype
    );
    let _ = writeln!(out, "{}", RULE);

    for (algo, record) in algos {
        let _ = writeln!(out, "\n  Algorithm: {}", display_name(algo));
        let _ = writeln!(out, "  --------------------------------------");

        match wall_times.and_then(|t| t.get(algo)) {
            Some(&millis) => out.push_str(
                &format_metric_line(Metric::AverageWallTime, MetricValue::Numeric(millis))
            ),
            None => {
                let _ = writeln!(
                    out, "    {:<50}: {:>20} (Not Found)",
                    Metric::AverageWallTime.name(), ""
                );
            },
        }
        let _ = writeln!(out, "    {:<50}: {:>20}", "---- Perf Metrics ----", "----");

        for metric in Metric::derived() {
            if let Some(value) = record.get(*metric) {
                out.push_str(&format_metric_line(*metric, value));
            }
        }
    }
    let _ = writeln!(out, "{}", RULE);
    out
}

pub fn write_metrics_table(assembly: &Assembly, path: &Path) -> Result<(), String> {
    let file = File::create(path).map_err(|e| fmt_open_err(e, path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &assembly.rows())
        .map_err(|e| format!("unable to write {}: {}", path_str(path), e))
}
