//! SDK-backed invalidation client for the Lambda runtime, which has no `aws` CLI

use crate::trigger::{InvalidationClient, InvalidationError, InvalidationRequest};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_cloudfront::error::DisplayErrorContext;
use aws_sdk_cloudfront::types::{InvalidationBatch, Paths};
use tracing::debug;

/// CloudFront and CodePipeline clients sharing one credential chain
#[derive(Debug, Clone)]
pub struct SdkClient {
    cloudfront: aws_sdk_cloudfront::Client,
    codepipeline: aws_sdk_codepipeline::Client,
}

impl SdkClient {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            cloudfront: aws_sdk_cloudfront::Client::new(config),
            codepipeline: aws_sdk_codepipeline::Client::new(config),
        }
    }

    /// Load region and credentials from the function's environment
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(&config)
    }
}

fn request_error(e: impl std::error::Error) -> InvalidationError {
    InvalidationError::Request(DisplayErrorContext(e).to_string())
}

#[async_trait]
impl InvalidationClient for SdkClient {
    async fn create_invalidation(
        &self,
        request: &InvalidationRequest,
    ) -> Result<String, InvalidationError> {
        let paths = Paths::builder()
            .quantity(request.paths.len() as i32)
            .set_items(Some(request.paths.clone()))
            .build()
            .map_err(request_error)?;
        let batch = InvalidationBatch::builder()
            .paths(paths)
            .caller_reference(request.caller_reference.as_str())
            .build()
            .map_err(request_error)?;

        let output = self
            .cloudfront
            .create_invalidation()
            .distribution_id(request.distribution_id.as_str())
            .invalidation_batch(batch)
            .send()
            .await
            .map_err(request_error)?;
        debug!("CreateInvalidation returned {:?}", output.location());

        output
            .invalidation()
            .map(|invalidation| invalidation.id().to_string())
            .ok_or_else(|| InvalidationError::Response("No invalidation in response".to_string()))
    }

    async fn report_job_success(&self, job_id: &str) -> Result<(), InvalidationError> {
        self.codepipeline
            .put_job_success_result()
            .job_id(job_id)
            .send()
            .await
            .map_err(request_error)?;
        Ok(())
    }
}
