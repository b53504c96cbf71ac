//! Cache-invalidation trigger
//!
//! A single best-effort invocation: read the distribution ID from the
//! environment, request invalidation of every path, and log instead of
//! failing. A stale cache never aborts the pipeline run.

pub mod client;
pub mod event;

pub use client::{InvalidationClient, InvalidationError, InvalidationRequest};
pub use event::{InvokeEvent, PipelineJob};

use crate::pipeline::invalidation::INVALIDATION_PATHS;
use chrono::{Timelike, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Environment variable naming the target distribution
pub const DISTRIBUTION_ID_ENV: &str = "DISTRIBUTION_ID";

/// What a trigger run did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TriggerOutcome {
    /// No distribution ID was configured; nothing was requested
    Skipped,
    /// The invalidation was accepted
    Submitted { invalidation_id: String },
    /// The request failed; the error was logged
    Failed { error: String },
}

impl TriggerOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, TriggerOutcome::Submitted { .. })
    }
}

/// Seconds elapsed since UTC midnight
///
/// CloudFront deduplicates on the caller reference, so a run landing on the
/// same second of a later day gets the earlier invalidation back instead of a
/// new one.
pub fn caller_reference_now() -> String {
    Utc::now().num_seconds_from_midnight().to_string()
}

/// Issues one invalidation for a distribution
pub struct InvalidationTrigger<C> {
    client: C,
    distribution_id: Option<String>,
    caller_reference: Option<String>,
}

impl<C: InvalidationClient> InvalidationTrigger<C> {
    pub fn new(client: C, distribution_id: Option<String>) -> Self {
        Self {
            client,
            distribution_id,
            caller_reference: None,
        }
    }

    /// Read the distribution ID from `DISTRIBUTION_ID`
    pub fn from_env(client: C) -> Self {
        Self::new(client, std::env::var(DISTRIBUTION_ID_ENV).ok())
    }

    /// Use a fixed caller reference instead of the time of day
    pub fn with_caller_reference(mut self, caller_reference: impl Into<String>) -> Self {
        self.caller_reference = Some(caller_reference.into());
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Request the invalidation; never returns an error
    pub async fn run(&self) -> TriggerOutcome {
        let distribution_id = match self.distribution_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ => {
                error!("'{}' environment variable not defined", DISTRIBUTION_ID_ENV);
                return TriggerOutcome::Skipped;
            }
        };

        let request = InvalidationRequest {
            distribution_id: distribution_id.to_string(),
            paths: INVALIDATION_PATHS.iter().map(|p| p.to_string()).collect(),
            caller_reference: self
                .caller_reference
                .clone()
                .unwrap_or_else(caller_reference_now),
        };
        debug!(
            "Invalidating {:?} on {} (reference {})",
            request.paths, request.distribution_id, request.caller_reference
        );

        match self.client.create_invalidation(&request).await {
            Ok(invalidation_id) => {
                info!(
                    "Created invalidation {} for distribution {}",
                    invalidation_id, distribution_id
                );
                TriggerOutcome::Submitted { invalidation_id }
            }
            Err(e) => {
                error!(
                    "Failed to invalidate cache for distribution {}: {}",
                    distribution_id, e
                );
                TriggerOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Run, then mark the pipeline job that invoked us as succeeded
    pub async fn run_for_job(&self, job_id: &str) -> TriggerOutcome {
        let outcome = self.run().await;

        if let Err(e) = self.client.report_job_success(job_id).await {
            warn!("Failed to report success for job {}: {}", job_id, e);
        }

        outcome
    }

    /// Handle one function invocation, reporting to the pipeline job when there is one
    pub async fn handle(&self, event: &InvokeEvent) -> TriggerOutcome {
        match event.job_id() {
            Some(job_id) => self.run_for_job(job_id).await,
            None => {
                debug!("Invoked without a pipeline job");
                self.run().await
            }
        }
    }
}
