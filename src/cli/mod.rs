//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{ClassifyCommand, NotesCommand, PlanCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;

/// Release build orchestrator
#[derive(Debug, Parser, Clone)]
#[command(name = "release-pipeline")]
#[command(version)]
#[command(about = "Classify, package and publish a release build", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the full release pipeline
    Run(RunCommand),

    /// Validate a release configuration
    Validate(ValidateCommand),

    /// Print the release level of a version
    Classify(ClassifyCommand),

    /// Print the task graph in execution order
    Plan(PlanCommand),

    /// Gather commit metadata and print the release notes
    Notes(NotesCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::SchedulingStrategy;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "release-pipeline",
            "run",
            "-f",
            "release.yaml",
            "-P",
            "version_suffix=beta-3",
            "--strategy",
            "parallel",
            "--skip-publish",
        ])
        .unwrap();

        match cli.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.property, vec![("version_suffix".to_string(), "beta-3".to_string())]);
                assert_eq!(SchedulingStrategy::from(cmd.strategy), SchedulingStrategy::Parallel);
                assert!(cmd.skip_publish);
                assert!(!cmd.json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_classify_with_suffix() {
        let cli = Cli::try_parse_from(["release-pipeline", "classify", "2.0.0", "--suffix", "beta-3", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Classify(cmd) => {
                assert_eq!(cmd.version, "2.0.0");
                assert_eq!(cmd.suffix.as_deref(), Some("beta-3"));
                assert!(cmd.file.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rejects_malformed_property() {
        assert!(Cli::try_parse_from(["release-pipeline", "run", "-P", "=novalue"]).is_err());
    }
}
