//! Application stack - composes the units named in an [`AppConfig`]

pub mod config;

pub use config::{AppConfig, PipelineSection, SourceSection, WebsiteSection};

use crate::core::{
    assembly::Assembly,
    bucket::BucketRef,
    error::SynthError,
    naming::Naming,
    template::Stack,
    token::Token,
};
use crate::pipeline::{PipelineBuilder, PipelineConfig};
use crate::website::{
    AssetStore, DistributionHandle, WebsiteConfig, WebsiteDeployment, ZoneResolver,
};
use anyhow::Context;
use tracing::{debug, info};

/// Everything produced by one synthesis
#[derive(Debug)]
pub struct Synthesis {
    pub assembly: Assembly,

    /// Pipeline stage names in execution order, when a pipeline is configured
    pub stages: Vec<String>,

    /// Invalidation strategy used by the pipeline
    pub invalidation: Option<&'static str>,

    /// The website's distribution, when a website is configured
    pub distribution: Option<DistributionHandle>,
}

/// Fill in a missing hosted zone by looking up the base domain
pub async fn resolve_hosted_zone(
    config: &mut AppConfig,
    resolver: &dyn ZoneResolver,
) -> anyhow::Result<()> {
    let Some(website) = config.website.as_mut() else {
        return Ok(());
    };
    if website.hosted_zone.is_some() {
        return Ok(());
    }

    debug!("Looking up hosted zone for {}", website.base_domain_name);
    let zone = resolver
        .find_zone(&website.base_domain_name)
        .await
        .with_context(|| format!("Failed to find hosted zone for {}", website.base_domain_name))?;
    info!("Using hosted zone {} ({})", zone.name, zone.id);
    website.hosted_zone = Some(zone);
    Ok(())
}

/// Build every configured stack into an assembly
///
/// A pipeline without a `distribution_id` or `deploy_bucket_arn` imports
/// them from the website stack's exports and deploys after it.
pub fn synthesize(config: &AppConfig) -> Result<Synthesis, SynthError> {
    let naming = Naming::new(&config.namespace, &config.stage);
    let mut assembly = Assembly::new();

    let website = match &config.website {
        Some(section) => {
            let website_config = website_config(section)?;
            let deployment =
                WebsiteDeployment::build(&naming, &config.environment, &website_config)?;
            Some(deployment)
        }
        None => None,
    };

    if let Some(deployment) = website.as_ref() {
        for stack in &deployment.stacks {
            assembly.push(stack.clone())?;
        }
    }

    let mut stages = Vec::new();
    let mut invalidation = None;
    if let Some(section) = &config.pipeline {
        let mut stack = Stack::new(naming.stack_name("pipeline"), config.environment.clone())
            .with_description(format!(
                "Delivery pipeline for {}/{}",
                section.source.owner, section.source.repo
            ));

        let pipeline_config = pipeline_config(config, section, website.as_ref(), &mut stack)?;
        let handle = PipelineBuilder::new(&naming, &pipeline_config).build(&mut stack)?;
        stages = handle.stages;
        invalidation = Some(handle.invalidation);
        assembly.push(stack)?;
    }

    info!("Synthesized {} stack(s)", assembly.stacks().len());

    Ok(Synthesis {
        assembly,
        stages,
        invalidation,
        distribution: website.map(|w| w.distribution),
    })
}

fn website_config(section: &WebsiteSection) -> Result<WebsiteConfig, SynthError> {
    let zone = section.hosted_zone.clone().ok_or_else(|| {
        SynthError::InvalidConfig(format!(
            "No hosted zone resolved for {}",
            section.base_domain_name
        ))
    })?;

    let asset_store = match &section.origin_bucket_arn {
        Some(arn) => AssetStore::Bucket(BucketRef::from_arn(arn)?),
        None => AssetStore::Create,
    };

    Ok(WebsiteConfig {
        zone,
        domain_name: section.domain_name().to_string(),
        asset_store,
    })
}

fn pipeline_config(
    config: &AppConfig,
    section: &PipelineSection,
    website: Option<&WebsiteDeployment>,
    stack: &mut Stack,
) -> Result<PipelineConfig, SynthError> {
    let missing = |field: &str| {
        SynthError::InvalidConfig(format!(
            "Pipeline has no '{}' and no website to import it from",
            field
        ))
    };

    let distribution_id = match (&section.distribution_id, website) {
        (Some(id), _) => Token::literal(id),
        (None, Some(deployment)) => {
            stack.add_dependency(&deployment.distribution.stack_name);
            deployment.distribution.imported_distribution_id()
        }
        (None, None) => return Err(missing("distribution_id")),
    };

    let deploy_target = match (&section.deploy_bucket_arn, website) {
        (Some(arn), _) => BucketRef::from_arn(arn)?,
        (None, Some(deployment)) => {
            stack.add_dependency(&deployment.distribution.stack_name);
            deployment.asset_store.clone()
        }
        (None, None) => return Err(missing("deploy_bucket_arn")),
    };

    Ok(PipelineConfig {
        source_owner: section.source.owner.clone(),
        source_repo: section.source.repo.clone(),
        source_branch: section.source.branch.clone(),
        source_auth_token: section.source.oauth_token.clone(),
        poll_for_source_changes: section.source.poll_for_source_changes,
        build_env_vars: section.build_environment_variables.clone(),
        approval_emails: section.approval_notify_emails.clone(),
        deploy_target,
        distribution_id,
        account_id: config.environment.account.clone(),
        invalidation: section.invalidation.clone(),
    })
}
