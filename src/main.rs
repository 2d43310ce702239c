use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use benchsweep::chart;
use benchsweep::config::SweepConfig;
use benchsweep::display;
use benchsweep::notify;
use benchsweep::process::ShellRunner;
use benchsweep::stats;
use benchsweep::sweep;

#[derive(Parser)]
#[command(
    name = "benchsweep",
    version,
    about = "Run the driver benchmark sweep, chart the results and post them to a webhook"
)]
struct Cli {
    /// Config file (default: benchsweep.toml discovered upwards from the cwd)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only run these benchmarks (repeatable)
    #[arg(short, long = "bench", value_name = "NAME")]
    bench: Vec<String>,

    /// Trials per implementation and size
    #[arg(short, long)]
    repeat: Option<usize>,

    /// Chart output path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write raw tables and summaries as JSON
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Skip posting the chart to the webhook
    #[arg(long)]
    no_notify: bool,

    /// Print the commands that would run, without running them
    #[arg(long)]
    dry_run: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "benchsweep=debug"
    } else {
        "benchsweep=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = SweepConfig::resolve(cli.config.as_deref())?;
    if let Some(repeat) = cli.repeat {
        if repeat == 0 {
            anyhow::bail!("--repeat must be at least 1");
        }
        config.sweep.repeat = repeat;
    }
    if let Some(output) = cli.output {
        config.output.chart = output;
    }

    let benchmarks = config.select_benchmarks(&cli.bench)?;

    if cli.dry_run {
        print!(
            "{}",
            display::format_plan(&sweep::plan_commands(&config, &benchmarks))
        );
        return Ok(());
    }

    let mut runner = ShellRunner::new(config.commands.shell.clone());

    let results = sweep::run_sweep(&config, &benchmarks, &mut runner)?;
    let summaries = stats::summarize_results(&results);

    let chart_path = &config.output.chart;
    chart::write_chart(chart_path, &chart::render_chart_grid(&summaries))?;
    info!(path = %chart_path.display(), "chart written");

    print!("{}", display::format_summary(&summaries));

    if let Some(json_path) = &cli.json {
        std::fs::write(json_path, display::format_json(&results, &summaries, Utc::now()))
            .with_context(|| format!("Failed to write results to {}", json_path.display()))?;
        info!(path = %json_path.display(), "results written");
    }

    if !cli.no_notify {
        notify::notify(&mut runner, &config.notify, chart_path)?;
    }

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", err);
        process::exit(1);
    }
}
