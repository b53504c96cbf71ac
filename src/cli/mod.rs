//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{InvalidateCommand, SynthCommand, ValidateCommand};
use std::ffi::OsString;

/// Static website stacks and delivery pipelines for AWS
#[derive(Debug, Parser, Clone)]
#[command(name = "sitestack")]
#[command(version = "0.1.0")]
#[command(about = "Synthesize static website hosting and delivery pipelines as CloudFormation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// AWS profile used for lookups and invalidations
    #[arg(long, global = true)]
    pub profile: Option<String>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Synthesize templates into an assembly directory
    Synth(SynthCommand),

    /// Validate an application configuration
    Validate(ValidateCommand),

    /// Invalidate a distribution's cache (best-effort)
    Invalidate(InvalidateCommand),
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

    #[test]
    fn test_parse_synth() {
        let cli = Cli::try_parse_from(["sitestack", "synth", "-f", "app.yaml", "--verbose"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Synth(cmd) => {
                assert_eq!(cmd.file, "app.yaml");
                assert_eq!(cmd.output, "cdk.out");
                assert!(!cmd.json);
            }
            other => panic!("Expected synth, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_invalidate() {
        let cli = Cli::try_parse_from([
            "sitestack",
            "--profile",
            "deploy",
            "invalidate",
            "--distribution-id",
            "E1ABCDEF",
        ])
        .unwrap();
        assert_eq!(cli.profile.as_deref(), Some("deploy"));
        match cli.command {
            Command::Invalidate(cmd) => {
                assert_eq!(cmd.distribution_id.as_deref(), Some("E1ABCDEF"));
                assert_eq!(cmd.job_id, None);
            }
            other => panic!("Expected invalidate, got {:?}", other),
        }
    }

    #[test]
    fn test_synth_requires_file() {
        assert!(Cli::try_parse_from(["sitestack", "synth"]).is_err());
    }
}
