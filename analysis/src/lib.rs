pub mod config;
pub mod discover;
pub mod importance;
pub mod memory;
pub mod plot;
pub mod report;

use std::{fs, path::{Path, PathBuf}};
use colored::Colorize;
use perfstat::{
    assemble::{assemble, RunDirs},
    diag::Diagnostics,
};
use crate::config::AnalysisConfig;

pub use perfstat::{fmt_open_err, path_str};

pub fn create_dir(dir: &Path) -> Result<(), String> {
    fs::create_dir_all(dir)
        .map_err(|e| format!(
            "unable to create directory {}: {}",
            path_str(dir), e.to_string()
        ))
}

pub fn stage(label: &str, what: &str, path: &Path) {
    println!("{}: {} (\"{}\")", label.green().bold(), what, path_str(path));
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outputs {
    pub plots: bool,
    pub feature_analysis: bool,
}

/// Files written by [`analyze_run`].
#[derive(Debug, Default)]
pub struct Written {
    pub reports: Vec<PathBuf>,
    pub table: Option<PathBuf>,
    pub plots: Vec<PathBuf>,
    pub importance: Option<(PathBuf, PathBuf)>,
}

/// Assembles the run in `run_dir` and writes the reports, the metrics
/// table, the per-configuration plots and the feature ranking to `out_dir`.
pub fn analyze_run(
    run_dir: &Path,
    out_dir: &Path,
    config: &AnalysisConfig,
    outputs: Outputs,
    diag: &mut Diagnostics) -> Result<Written, String>
{
    let dirs = RunDirs::in_run(run_dir);
    stage("READING", "perf stats", &dirs.perf_stats);
    let assembly = assemble(&dirs, &config.assemble_options(), diag)
        .map_err(|e| e.to_string())?;

    create_dir(out_dir)?;
    let mut written = Written::default();

    for (cfg, algos) in &assembly.metrics {
        let path = out_dir.join(format!("analysis_{}_{}.txt", cfg.generator, cfg.datatype));
        stage("WRITING", "text report", &path);
        let text = report::render_config_report(cfg, algos, assembly.wall_times.get(cfg));
        fs::write(&path, text).map_err(|e| fmt_open_err(e, &path))?;
        written.reports.push(path);
    }

    let table_path = out_dir.join(report::METRICS_TABLE_FILE);
    stage("WRITING", "metrics table", &table_path);
    report::write_metrics_table(&assembly, &table_path)?;
    written.table = Some(table_path);

    if outputs.plots {
        for (cfg, algos) in &assembly.table {
            let path = out_dir.join(format!("plot_summary_{}_{}.svg", cfg.generator, cfg.datatype));
            if plot::plot_config_summary(&path, cfg, algos, &config.exclude)? {
                stage("PLOTTING", "summary", &path);
                written.plots.push(path);
            } else {
                diag.warn(format!(
                    "no non-excluded algorithms with data for {}, skipping plot",
                    cfg
                ));
            }
        }
    }

    if outputs.feature_analysis {
        written.importance = importance::run_feature_importance(
            &assembly.table, config, out_dir, diag)?;
    }

    Ok(written)
}
