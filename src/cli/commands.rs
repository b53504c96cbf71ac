//! CLI command definitions

use clap::Args;

/// Synthesize an application
#[derive(Debug, Args, Clone)]
pub struct SynthCommand {
    /// Path to application YAML file
    #[arg(short, long)]
    pub file: String,

    /// Directory the assembly is written to
    #[arg(short, long, default_value = "cdk.out")]
    pub output: String,

    /// Print the manifest as JSON
    #[arg(long)]
    pub json: bool,
}

/// Validate an application configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to application YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Invalidate a distribution's cache
#[derive(Debug, Args, Clone)]
pub struct InvalidateCommand {
    /// Distribution to invalidate; read from `DISTRIBUTION_ID` when omitted
    #[arg(long)]
    pub distribution_id: Option<String>,

    /// Pipeline job to report success for afterwards
    #[arg(long)]
    pub job_id: Option<String>,
}
