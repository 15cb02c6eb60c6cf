//! jobqueue - throttled async job scheduler
//!
//! CLI entry point for exercising the scheduler with simulated workloads.

use std::fs;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::info;

use jobqueue::cli::{Cli, Command, OutputFormat, RunArgs, get_log_path};
use jobqueue::config::Config;
use jobqueue::scheduler::Scheduler;
use jobqueue::workload::{JobStatus, WorkloadReport, run_workload};

fn setup_logging(verbose: bool) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Setup tracing subscriber - write to log file, not stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Command::Run(args)) => {
            args.apply(&mut config);
            config.validate()?;
            cmd_run(&config, &args).await
        }
        Some(Command::Config) => cmd_config(&config),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Run the configured workload to completion
async fn cmd_run(config: &Config, args: &RunArgs) -> Result<()> {
    info!(
        jobs = config.workload.jobs,
        concurrency = config.scheduler.concurrency_limit,
        rate = ?config.scheduler.rate_limit,
        timeout_secs = config.scheduler.timeout_limit_secs,
        "Running workload"
    );

    let scheduler = Scheduler::try_new(config.scheduler.clone())?;
    let report = run_workload(&scheduler, &config.workload).await;
    scheduler.dispose();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &WorkloadReport) {
    for job in &report.jobs {
        let status = match job.status {
            JobStatus::Succeeded => job.status.to_string().green(),
            JobStatus::Failed => job.status.to_string().red(),
            JobStatus::TimedOut => job.status.to_string().yellow(),
            JobStatus::Disposed | JobStatus::Abandoned => job.status.to_string().magenta(),
        };
        match (job.queue_ms, job.execution_ms) {
            (Some(queue_ms), Some(execution_ms)) => {
                println!("job {:>4}  {:<10} queued {:>6}ms  ran {:>6}ms", job.index, status, queue_ms, execution_ms)
            }
            _ => println!(
                "job {:>4}  {:<10} {}",
                job.index,
                status,
                job.error.as_deref().unwrap_or_default()
            ),
        }
    }

    let stats = &report.stats;
    println!();
    println!("{}", "Summary".bold());
    println!("-------");
    println!("Elapsed:        {}ms", report.elapsed_ms);
    println!("Succeeded:      {}", stats.total_succeeded);
    println!("Failed:         {}", stats.total_failed);
    println!("Timed out:      {}", stats.total_timed_out);
    println!("Rate deferrals: {}", stats.total_rate_limited);
    println!("Peak running:   {}", stats.peak_concurrent);
    println!("Peak queued:    {}", stats.peak_queue_depth);
}

/// Print the effective configuration
fn cmd_config(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{}", yaml);
    Ok(())
}
