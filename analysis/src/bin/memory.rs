use analysis::{
    discover::{resolve_run_dir, MEMORY_PLOTS_DIR},
    memory::{analyze_memory, RunParams},
    path_str,
};
use clap::Parser;
use colored::Colorize;
use perfstat::diag::Diagnostics;
use std::path::PathBuf;

/// Summarises and plots the memory reports of a benchmark run.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    run_dir: Option<PathBuf>,
    #[arg(long, default_value = "run/")]
    runs: PathBuf,
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long, default_value_t = 64)]
    threads: u32,
    #[arg(long, default_value_t = 5)]
    num_runs: u32,
    #[arg(long, default_value_t = 32)]
    min_log: u32,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run_memory(&cli) {
        let msg = format!("error: {}", e);
        println!("{}", msg.red().bold());
        std::process::exit(1);
    } else {
        println!("{}", "DONE".green().bold());
    }
}

fn run_memory(cli: &Cli) -> Result<(), String> {
    let run_dir = resolve_run_dir(cli.run_dir.as_deref(), &cli.runs)?;
    println!("Run directory: {}", path_str(&run_dir));

    let out_dir = cli.out.clone()
        .unwrap_or_else(|| run_dir.join(MEMORY_PLOTS_DIR));
    let params = RunParams {
        threads: cli.threads,
        num_runs: cli.num_runs,
        min_log: cli.min_log,
    };

    let mut diag = Diagnostics::echo();
    let written = analyze_memory(&run_dir, &out_dir, params, &mut diag)?;
    println!("{} files written to {}", written.len(), path_str(&out_dir));
    Ok(())
}
