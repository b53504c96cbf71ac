//! Shared fixtures for unit tests

use crate::core::{bucket::BucketRef, naming::Naming, template::Environment, token::Token};
use crate::pipeline::config::{PipelineConfig, SecretValue};
use crate::pipeline::invalidation::InvalidationConfig;

pub fn naming() -> Naming {
    Naming::new("test", "dev")
}

pub fn environment() -> Environment {
    Environment::new("1234567890", "ap-southeast-2")
}

/// A pipeline config with no approval and no build variables
pub fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        source_owner: "test-owner".to_string(),
        source_repo: "test-repo".to_string(),
        source_branch: "main".to_string(),
        source_auth_token: SecretValue::Plaintext("test-secret-value".to_string()),
        poll_for_source_changes: true,
        build_env_vars: Default::default(),
        approval_emails: None,
        deploy_target: BucketRef::from_arn("arn:aws:s3:::test-deploy-bucket").unwrap(),
        distribution_id: Token::literal("test-distribution-id"),
        account_id: "1234567890".to_string(),
        invalidation: InvalidationConfig::default(),
    }
}

pub fn with_approvals(emails: &[&str]) -> PipelineConfig {
    PipelineConfig {
        approval_emails: Some(emails.iter().map(|e| e.to_string()).collect()),
        ..pipeline_config()
    }
}
