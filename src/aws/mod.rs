//! AWS access
//!
//! From a workstation, hosted zone lookups and cache invalidation run the
//! `aws` CLI as a subprocess, using whatever credentials and profile the
//! caller's shell already has. Inside Lambda the SDK clients take over.

pub mod sdk;
pub mod subprocess;

pub use sdk::SdkClient;
pub use subprocess::{AwsCli, AwsCliConfig, AwsCliError};

use crate::trigger::{InvalidationClient, InvalidationError, InvalidationRequest};
use crate::website::{HostedZone, ZoneResolver};
use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HostedZoneList {
    hosted_zones: Vec<HostedZoneEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HostedZoneEntry {
    id: String,
    name: String,
    #[serde(default)]
    config: Option<HostedZoneEntryConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HostedZoneEntryConfig {
    #[serde(default)]
    private_zone: bool,
}

impl HostedZoneEntry {
    fn is_private(&self) -> bool {
        self.config.as_ref().is_some_and(|c| c.private_zone)
    }
}

/// Public zone whose name is exactly `domain_name`
fn select_zone(list: HostedZoneList, domain_name: &str) -> Option<HostedZone> {
    let wanted = domain_name.trim_end_matches('.').to_ascii_lowercase();
    list.hosted_zones
        .into_iter()
        .filter(|zone| !zone.is_private())
        .map(|zone| HostedZone::new(zone.id, zone.name))
        .find(|zone| zone.name.eq_ignore_ascii_case(&wanted))
}

#[async_trait]
impl ZoneResolver for AwsCli {
    async fn find_zone(&self, domain_name: &str) -> anyhow::Result<HostedZone> {
        let output = self
            .run_json(&[
                "route53",
                "list-hosted-zones-by-name",
                "--dns-name",
                domain_name,
            ])
            .await
            .with_context(|| format!("Failed to list hosted zones for {}", domain_name))?;

        let list: HostedZoneList =
            serde_json::from_value(output).context("Unexpected hosted zone listing")?;
        match select_zone(list, domain_name) {
            Some(zone) => {
                debug!("Resolved hosted zone {} ({})", zone.name, zone.id);
                Ok(zone)
            }
            None => bail!("No public hosted zone named '{}'", domain_name),
        }
    }
}

impl From<AwsCliError> for InvalidationError {
    fn from(e: AwsCliError) -> Self {
        InvalidationError::Request(e.to_string())
    }
}

#[async_trait]
impl InvalidationClient for AwsCli {
    async fn create_invalidation(
        &self,
        request: &InvalidationRequest,
    ) -> Result<String, InvalidationError> {
        let batch = json!({
            "Paths": {
                "Quantity": request.paths.len(),
                "Items": request.paths,
            },
            "CallerReference": request.caller_reference,
        })
        .to_string();

        let output = self
            .run_json(&[
                "cloudfront",
                "create-invalidation",
                "--distribution-id",
                request.distribution_id.as_str(),
                "--invalidation-batch",
                batch.as_str(),
            ])
            .await?;

        output["Invalidation"]["Id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| InvalidationError::Response(output.to_string()))
    }

    async fn report_job_success(&self, job_id: &str) -> Result<(), InvalidationError> {
        self.run_json(&["codepipeline", "put-job-success-result", "--job-id", job_id])
            .await?;
        Ok(())
    }
}
