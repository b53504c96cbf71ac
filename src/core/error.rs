//! Errors raised while composing stacks

use thiserror::Error;

/// Error types for synthesis
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("Duplicate logical ID '{logical_id}' in stack '{stack}'")]
    DuplicateLogicalId { stack: String, logical_id: String },

    #[error("Duplicate export '{0}'")]
    DuplicateExport(String),

    #[error("Domain '{domain}' is not within hosted zone '{zone}'")]
    DomainOutsideZone { domain: String, zone: String },

    #[error("Invalid S3 bucket ARN: {0}")]
    InvalidBucketArn(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to write assembly: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize template: {0}")]
    Serialize(#[from] serde_json::Error),
}
