//! CLI command definitions

use crate::execution::SchedulingStrategy;
use clap::Args;
use std::path::PathBuf;

/// Run the release pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to the release YAML file
    #[arg(short, long, default_value = "release.yaml")]
    pub file: PathBuf,

    /// Property overrides (key=value)
    #[arg(short = 'P', long, value_parser = parse_key_value)]
    pub property: Vec<(String, String)>,

    /// Scheduling strategy
    #[arg(long, value_enum, default_value_t = SchedulingStrategyArg::Sequential)]
    pub strategy: SchedulingStrategyArg,

    /// Build everything but skip every publish target
    #[arg(long)]
    pub skip_publish: bool,

    /// Print the run report as JSON instead of progress output
    #[arg(long)]
    pub json: bool,
}

/// Validate a release configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to the release YAML file
    #[arg(short, long, default_value = "release.yaml")]
    pub file: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Classify a version
#[derive(Debug, Args, Clone)]
pub struct ClassifyCommand {
    /// Version, optionally with its suffix (`1.2.3-beta-3`)
    pub version: String,

    /// Suffix given separately
    #[arg(long)]
    pub suffix: Option<String>,

    /// Take level rules from this release file
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

/// Show the task graph
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    /// Path to the release YAML file
    #[arg(short, long, default_value = "release.yaml")]
    pub file: PathBuf,

    /// Property overrides (key=value)
    #[arg(short = 'P', long, value_parser = parse_key_value)]
    pub property: Vec<(String, String)>,
}

/// Compose and print release notes
#[derive(Debug, Args, Clone)]
pub struct NotesCommand {
    /// Path to the release YAML file
    #[arg(short, long, default_value = "release.yaml")]
    pub file: PathBuf,

    /// Property overrides (key=value)
    #[arg(short = 'P', long, value_parser = parse_key_value)]
    pub property: Vec<(String, String)>,
}

/// Scheduling strategy argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SchedulingStrategyArg {
    Sequential,
    Parallel,
    #[clap(name = "parallel-limited")]
    ParallelLimited,
}

impl From<SchedulingStrategyArg> for SchedulingStrategy {
    fn from(arg: SchedulingStrategyArg) -> Self {
        match arg {
            SchedulingStrategyArg::Sequential => SchedulingStrategy::Sequential,
            SchedulingStrategyArg::Parallel => SchedulingStrategy::Parallel,
            SchedulingStrategyArg::ParallelLimited => SchedulingStrategy::LimitedParallel(4),
        }
    }
}

/// Parse key=value pairs; a bare key sets an empty value
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s.split_once('=').unwrap_or((s, ""));
    if key.trim().is_empty() {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}
