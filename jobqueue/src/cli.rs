//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// jobqueue - throttled async job scheduler
#[derive(Parser)]
#[command(
    name = "jobqueue",
    about = "Run simulated workloads through a rate- and concurrency-limited job scheduler",
    version,
    after_help = "Logs are written to: ~/.local/share/jobqueue/logs/jobqueue.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Push a simulated workload through the scheduler and report every job
    Run(RunArgs),

    /// Print the effective configuration as YAML
    Config,
}

/// Overrides for `run`; anything unset comes from the config file
#[derive(clap::Args, Debug, Default)]
pub struct RunArgs {
    /// Number of jobs to submit
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// How long each job sleeps, in milliseconds
    #[arg(short, long)]
    pub duration_ms: Option<u64>,

    /// Every Nth job fails
    #[arg(long)]
    pub fail_every: Option<usize>,

    /// Every Nth job hangs until it times out
    #[arg(long)]
    pub hang_every: Option<usize>,

    /// Max concurrent jobs
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Max job starts per rate window
    #[arg(long)]
    pub rate: Option<u32>,

    /// Per-job timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

impl RunArgs {
    /// Layer the command-line overrides on top of a loaded config
    pub fn apply(&self, config: &mut Config) {
        if let Some(jobs) = self.jobs {
            config.workload.jobs = jobs;
        }
        if let Some(duration_ms) = self.duration_ms {
            config.workload.duration_ms = duration_ms;
        }
        if self.fail_every.is_some() {
            config.workload.fail_every = self.fail_every;
        }
        if self.hang_every.is_some() {
            config.workload.hang_every = self.hang_every;
        }
        if let Some(concurrency) = self.concurrency {
            config.scheduler.concurrency_limit = concurrency;
        }
        if self.rate.is_some() {
            config.scheduler.rate_limit = self.rate;
        }
        if let Some(timeout) = self.timeout {
            config.scheduler.timeout_limit_secs = timeout;
        }
    }
}

/// Output format for run reports
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Location of the log file written by the binary
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jobqueue")
        .join("logs")
        .join("jobqueue.log")
}
