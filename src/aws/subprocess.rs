//! `aws` CLI subprocess runner

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Error types for CLI invocations
#[derive(Debug, Error)]
pub enum AwsCliError {
    #[error("Failed to execute aws: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("aws exited with code {code}: {stderr}")]
    Exit { code: i32, stderr: String },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Failed to decode aws output: {0}")]
    Decode(String),
}

/// Configuration for the CLI runner
#[derive(Debug, Clone)]
pub struct AwsCliConfig {
    /// Path to the `aws` executable
    pub aws_path: String,

    /// Named profile passed as `--profile`
    pub profile: Option<String>,

    /// Region passed as `--region`
    pub region: Option<String>,

    /// Timeout for each command in seconds
    pub timeout_secs: u64,
}

impl Default for AwsCliConfig {
    fn default() -> Self {
        Self {
            aws_path: "aws".to_string(),
            profile: None,
            region: None,
            timeout_secs: 60,
        }
    }
}

impl AwsCliConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_aws_path(mut self, aws_path: impl Into<String>) -> Self {
        self.aws_path = aws_path.into();
        self
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Runs `aws` commands and decodes their JSON output
#[derive(Debug, Clone)]
pub struct AwsCli {
    config: AwsCliConfig,
}

impl AwsCli {
    pub fn new(config: AwsCliConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AwsCliConfig {
        &self.config
    }

    /// Full argument list for a command, including global options
    fn command_args(&self, args: &[&str]) -> Vec<String> {
        let mut all: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        all.extend(["--output".to_string(), "json".to_string()]);
        if let Some(profile) = &self.config.profile {
            all.extend(["--profile".to_string(), profile.clone()]);
        }
        if let Some(region) = &self.config.region {
            all.extend(["--region".to_string(), region.clone()]);
        }
        all
    }

    /// Run `aws <args> --output json`
    ///
    /// Commands printing nothing decode to `Value::Null`.
    ///
    /// # Errors
    /// Returns `AwsCliError` if:
    /// - The executable cannot be spawned
    /// - The command exits with a non-zero status
    /// - The output is not valid JSON
    /// - The command times out
    pub async fn run_json(&self, args: &[&str]) -> Result<Value, AwsCliError> {
        let args = self.command_args(args);
        debug!("Running {} {}", self.config.aws_path, args.join(" "));

        let output = timeout(
            Duration::from_secs(self.config.timeout_secs),
            Command::new(&self.config.aws_path)
                .args(&args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| AwsCliError::Timeout(self.config.timeout_secs))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            warn!("aws exited with code {}: {}", code, stderr);
            return Err(AwsCliError::Exit { code, stderr });
        }

        let stdout =
            String::from_utf8(output.stdout).map_err(|e| AwsCliError::Decode(e.to_string()))?;
        if stdout.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&stdout).map_err(|e| AwsCliError::Decode(e.to_string()))
    }
}
