//! Client seam for the invalidation call

use async_trait::async_trait;
use thiserror::Error;

/// Error types for invalidation requests
#[derive(Debug, Error)]
pub enum InvalidationError {
    #[error("Invalidation request failed: {0}")]
    Request(String),

    #[error("Unexpected response: {0}")]
    Response(String),
}

/// One `CreateInvalidation` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationRequest {
    pub distribution_id: String,
    pub paths: Vec<String>,

    /// Deduplication token; repeated references within a distribution are ignored
    pub caller_reference: String,
}

/// Talks to CloudFront and CodePipeline on behalf of the trigger
#[async_trait]
pub trait InvalidationClient: Send + Sync {
    /// Submit the invalidation and return its ID
    async fn create_invalidation(
        &self,
        request: &InvalidationRequest,
    ) -> Result<String, InvalidationError>;

    /// Mark a pipeline job as succeeded
    async fn report_job_success(&self, job_id: &str) -> Result<(), InvalidationError>;
}
