//! Bar-chart grids rendered to SVG.

use std::{collections::BTreeMap, path::Path};
use plotters::{coord::Shift, prelude::*};
use perfstat::{
    metrics::{Metric, MetricKind, MetricRecord},
    naming::display_name,
    AlgorithmId, ConfigKey,
};
use crate::path_str;

const PANEL_SIZE: (u32, u32) = (450, 320);
const SUMMARY_COLUMNS: usize = 4;

/// A single bar chart of a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct BarPanel {
    pub title: String,
    pub unit: &'static str,
    pub lower_is_better: bool,
    pub bars: Vec<(String, f64)>,
}

impl BarPanel {
    fn caption(&self) -> String {
        let note = if self.lower_is_better { "lower is better" } else { "higher is better" };
        format!("{} ({})", self.title, note)
    }

    fn y_top(&self) -> f64 {
        let max = self.bars.iter().map(|(_, v)| *v).fold(0.0, f64::max);
        let top = match self.unit {
            "%" if max <= 100.0 => 105.0,
            "%" => max * 1.15,
            _ => max * 1.2,
        };
        if top > 0.0 { top } else { 1.0 }
    }
}

fn format_axis(value: f64) -> String {
    if value.abs() >= 1e6 {
        format!("{:.1e}", value)
    } else if value.fract() == 0.0 {
        format!("{}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &BarPanel) -> Result<(), String>
{
    if panel.bars.is_empty() {
        let (_, height) = area.dim_in_pixel();
        area.draw(&Text::new(
            format!("{} (No Valid Data)", panel.title),
            (10, height as i32 / 2),
            ("sans-serif", 14).into_font(),
        )).map_err(|e| format!("unable to draw panel {}: {}", panel.title, e))?;
        return Ok(());
    }

    let count = panel.bars.len();
    let mut chart = ChartBuilder::on(area)
        .caption(panel.caption(), ("sans-serif", 14).into_font())
        .margin(8)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d((0..count).into_segmented(), 0.0..panel.y_top())
        .map_err(|e| format!("unable to create chart {}: {}", panel.title, e))?;

    let labels: Vec<&str> = panel.bars.iter().map(|(l, _)| l.as_str()).collect();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(count)
        .x_label_formatter(&|x| match x {
            SegmentValue::CenterOf(i) => labels.get(*i).map(|l| l.to_string()).unwrap_or_default(),
            _ => String::new(),
        })
        .y_label_formatter(&|y| format_axis(*y))
        .y_desc(if panel.unit == "Count" { "" } else { panel.unit })
        .max_light_lines(4)
        .draw()
        .map_err(|e| format!("unable to draw mesh of {}: {}", panel.title, e))?;

    chart
        .draw_series(panel.bars.iter().enumerate().map(|(i, (_, value))| {
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *value)],
                Palette99::pick(i).filled(),
            );
            bar.set_margin(0, 0, 6, 6);
            bar
        }))
        .map_err(|e| format!("unable to draw bars of {}: {}", panel.title, e))?;

    Ok(())
}

/// Lays `panels` out `columns` wide under a common title and writes the
/// grid to an SVG file.
pub fn render_grid(
    path: &Path,
    title: &str,
    panels: &[BarPanel],
    columns: usize) -> Result<(), String>
{
    let columns = columns.clamp(1, panels.len().max(1));
    let rows = (panels.len() + columns - 1) / columns;
    let size = (
        PANEL_SIZE.0 * columns as u32,
        PANEL_SIZE.1 * rows.max(1) as u32 + 40,
    );

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| format!(
            "unable to fill bg with white for {}: {}",
            path_str(path), e
        ))?;
    let root = root.titled(title, ("sans-serif", 20).into_font())
        .map_err(|e| format!("unable to draw title of {}: {}", path_str(path), e))?;

    for (area, panel) in root.split_evenly((rows.max(1), columns)).iter().zip(panels) {
        draw_panel(area, panel)?;
    }

    root.present()
        .map_err(|e| format!("unable to present {}: {}", path_str(path), e))
}

/// Entries of the summary grid. Besides plain metrics it holds two
/// composites computed from a run's record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlotMetric {
    Direct(Metric),
    StallsPerCycle,
    TotalDtlbMisses,
}

pub const SUMMARY_METRICS: [PlotMetric; 21] = [
    PlotMetric::Direct(Metric::AverageWallTime),
    PlotMetric::Direct(Metric::Ipc),
    PlotMetric::Direct(Metric::Instructions),
    PlotMetric::Direct(Metric::Cycles),
    PlotMetric::Direct(Metric::StallsL3Miss),
    PlotMetric::StallsPerCycle,
    PlotMetric::Direct(Metric::MemLoadsRetired),
    PlotMetric::Direct(Metric::MemStoresRetired),
    PlotMetric::Direct(Metric::L1LoadHitRate),
    PlotMetric::Direct(Metric::L1LoadMisses),
    PlotMetric::Direct(Metric::L2LoadHitRate),
    PlotMetric::Direct(Metric::L2LoadMisses),
    PlotMetric::Direct(Metric::L3LoadHitRate),
    PlotMetric::Direct(Metric::L3LoadMisses),
    PlotMetric::Direct(Metric::LlcStores),
    PlotMetric::Direct(Metric::LlcStoreMisses),
    PlotMetric::Direct(Metric::DtlbLoadMisses),
    PlotMetric::Direct(Metric::DtlbStoreMisses),
    PlotMetric::TotalDtlbMisses,
    PlotMetric::Direct(Metric::ItlbLoadMisses),
    PlotMetric::Direct(Metric::L1IcacheLoadMisses),
];

impl PlotMetric {
    pub fn title(&self) -> String {
        match self {
            PlotMetric::Direct(m) => m.name()
                .replace(" (for loads reaching L2)", "")
                .replace(" (for loads reaching L3)", "")
                .replace(" (Loads hitting DRAM)", ""),
            PlotMetric::StallsPerCycle => "Stalls L3 Miss / Total Cycles (%)".to_string(),
            PlotMetric::TotalDtlbMisses => "Total dTLB Misses".to_string(),
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            PlotMetric::Direct(m) => match m.kind() {
                MetricKind::Count => "Count",
                MetricKind::Ratio => "IPC",
                MetricKind::Percent => "%",
                MetricKind::Millis => "ms",
            },
            PlotMetric::StallsPerCycle => "%",
            PlotMetric::TotalDtlbMisses => "Count",
        }
    }

    pub fn lower_is_better(&self) -> bool {
        !matches!(
            self,
            PlotMetric::Direct(Metric::Ipc)
                | PlotMetric::Direct(Metric::L1LoadHitRate)
                | PlotMetric::Direct(Metric::L2LoadHitRate)
                | PlotMetric::Direct(Metric::L3LoadHitRate)
        )
    }

    /// Value for one run, `None` when absent or not applicable.
    pub fn value(&self, record: &MetricRecord) -> Option<f64> {
        match self {
            PlotMetric::Direct(m) => record.value(*m),
            PlotMetric::StallsPerCycle => {
                let stalls = record.value(Metric::StallsL3Miss)?;
                let cycles = record.value(Metric::Cycles)?;
                (cycles > 0.0).then(|| stalls / cycles * 100.0)
            },
            PlotMetric::TotalDtlbMisses => Some(
                record.value(Metric::DtlbLoadMisses)? + record.value(Metric::DtlbStoreMisses)?
            ),
        }
    }
}

/// Panels of the summary grid for the algorithms of one configuration.
pub fn summary_panels(
    algos: &BTreeMap<AlgorithmId, MetricRecord>,
    exclude: &[String]) -> Vec<BarPanel>
{
    SUMMARY_METRICS.iter()
        .map(|metric| BarPanel {
            title: metric.title(),
            unit: metric.unit(),
            lower_is_better: metric.lower_is_better(),
            bars: algos.iter()
                .filter(|(algo, _)| !exclude.contains(*algo))
                .filter_map(|(algo, record)| metric.value(record)
                    .filter(|v| v.is_finite())
                    .map(|v| (display_name(algo).to_string(), v)))
                .collect(),
        })
        .collect()
}

/// Writes the summary grid of one configuration. Returns `false` without
/// writing anything when no algorithm is left to plot.
pub fn plot_config_summary(
    path: &Path,
    config: &ConfigKey,
    algos: &BTreeMap<AlgorithmId, MetricRecord>,
    exclude: &[String]) -> Result<bool, String>
{
    if algos.keys().all(|algo| exclude.contains(algo)) {
        return Ok(false);
    }

    let title = format!(
        "Algorithm Comparison: Generator={}, DataType={}",
        config.generator, config.datatype
    );
    render_grid(path, &title, &summary_panels(algos, exclude), SUMMARY_COLUMNS)?;
    Ok(true)
}
