use analysis::{
    analyze_run,
    config::AnalysisConfig,
    discover::{resolve_run_dir, ANALYSIS_RESULT_DIR},
    path_str, stage, Outputs,
};
use clap::Parser;
use colored::Colorize;
use perfstat::diag::Diagnostics;
use std::path::PathBuf;

/// Reports, plots and ranks the counters of a perf benchmark run.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Run directory or its perf_stats sub-directory. Defaults to the
    /// newest run under --runs.
    run_dir: Option<PathBuf>,
    #[arg(long, default_value = "run/")]
    runs: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    /// RESULT lines per stdout log that belong to the measured block.
    #[arg(long)]
    iterations: Option<usize>,
    #[arg(long)]
    out: Option<PathBuf>,
    /// Algorithm to leave out of plots and the feature model. Replaces the
    /// configured list.
    #[arg(long)]
    exclude: Vec<String>,
    #[arg(long)]
    no_plots: bool,
    #[arg(long)]
    no_feature_analysis: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run_analysis(&cli) {
        let msg = format!("error: {}", e);
        println!("{}", msg.red().bold());
        std::process::exit(1);
    } else {
        println!("{}", "DONE".green().bold());
    }
}

fn load_config(cli: &Cli) -> Result<AnalysisConfig, String> {
    let mut config = match &cli.config {
        Some(path) => {
            stage("READING", "config file", path);
            AnalysisConfig::load(path)?
        },
        None => AnalysisConfig::default(),
    };

    if let Some(iterations) = cli.iterations {
        config.iterations = iterations;
    }
    if !cli.exclude.is_empty() {
        config.exclude = cli.exclude.clone();
    }
    config.validate()?;
    Ok(config)
}

fn run_analysis(cli: &Cli) -> Result<(), String> {
    let config = load_config(cli)?;

    let run_dir = resolve_run_dir(cli.run_dir.as_deref(), &cli.runs)?;
    println!("Run directory: {}", path_str(&run_dir));

    let out_dir = cli.out.clone()
        .unwrap_or_else(|| run_dir.join(ANALYSIS_RESULT_DIR));

    let mut diag = Diagnostics::echo();
    let outputs = Outputs {
        plots: !cli.no_plots,
        feature_analysis: !cli.no_feature_analysis,
    };
    let written = analyze_run(&run_dir, &out_dir, &config, outputs, &mut diag)?;

    println!(
        "{} reports, {} plots written to {}",
        written.reports.len(), written.plots.len(), path_str(&out_dir)
    );
    if !diag.is_empty() {
        println!("{}", format!("{} warnings", diag.len()).yellow());
    }
    Ok(())
}
