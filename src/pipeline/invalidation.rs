//! Cache invalidation strategies for the deploy stage
//!
//! Both strategies run after the upload, read the distribution ID from their
//! execution environment, and receive exactly `cloudfront:CreateInvalidation`
//! on the one distribution. Failures are best-effort in both: a failed
//! invalidation is reported but never fails the deploy stage.

use crate::core::{
    bucket::BucketRef,
    error::SynthError,
    naming::Naming,
    policy::{self, PolicyStatement, LAMBDA_BASIC_EXECUTION},
    template::{Environment, Resource, Stack},
    token::Token,
};
use crate::pipeline::{
    config::PipelineConfig,
    project::{self, ProjectSpec},
    stage::{Action, ActionType, Artifact},
};
use crate::trigger::DISTRIBUTION_ID_ENV;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Action name shared by both strategies
pub const INVALIDATE_ACTION: &str = "invalidate-cache";

/// Paths purged after every deploy
pub const INVALIDATION_PATHS: &[&str] = &["/*"];

/// Selects how the invalidation runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum InvalidationConfig {
    /// A CodeBuild project shelling out to the AWS CLI
    Build,
    /// A Lambda function running the invalidation trigger
    Function(FunctionSettings),
}

impl Default for InvalidationConfig {
    fn default() -> Self {
        InvalidationConfig::Build
    }
}

impl InvalidationConfig {
    pub fn strategy(&self) -> Box<dyn InvalidationStrategy + '_> {
        match self {
            InvalidationConfig::Build => Box::new(InlineBuildInvalidation),
            InvalidationConfig::Function(settings) => Box::new(FunctionInvalidation { settings }),
        }
    }
}

/// Deployment package and runtime of the invalidation function
///
/// The package is the `sitestack-invalidate` binary built as a Lambda `bootstrap`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSettings {
    /// Bucket holding the function package
    pub s3_bucket: String,

    /// Key of the function package
    pub s3_key: String,

    #[serde(default = "default_runtime")]
    pub runtime: String,

    #[serde(default = "default_handler")]
    pub handler: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_runtime() -> String {
    "provided.al2023".to_string()
}

fn default_handler() -> String {
    "bootstrap".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// What a strategy needs from the pipeline being built
pub struct InvalidationContext<'a> {
    pub naming: &'a Naming,
    pub environment: &'a Environment,
    pub config: &'a PipelineConfig,
    pub artifact_bucket: &'a BucketRef,
    pub source_output: &'a Artifact,
}

/// The deploy-stage action plus what the pipeline role needs to run it
#[derive(Debug, Clone)]
pub struct DeclaredInvalidation {
    pub action: Action,
    pub pipeline_statements: Vec<PolicyStatement>,
}

/// Triggers cache invalidation for a distribution
pub trait InvalidationStrategy {
    fn name(&self) -> &'static str;

    /// Declare the resources behind the action and return it
    fn declare(
        &self,
        stack: &mut Stack,
        ctx: &InvalidationContext<'_>,
    ) -> Result<DeclaredInvalidation, SynthError>;
}

/// CodeBuild project running `aws cloudfront create-invalidation`
pub struct InlineBuildInvalidation;

impl InlineBuildInvalidation {
    pub fn build_spec() -> Result<String, SynthError> {
        let command = format!(
            "aws cloudfront create-invalidation --distribution-id \"${env}\" --paths \"{paths}\" \
             || echo \"Cache invalidation failed for distribution ${env}\"",
            env = DISTRIBUTION_ID_ENV,
            paths = INVALIDATION_PATHS.join("\" \""),
        );

        Ok(serde_json::to_string_pretty(&json!({
            "version": 0.2,
            "phases": {
                "post_build": {
                    "commands": [command],
                },
            },
        }))?)
    }
}

impl InvalidationStrategy for InlineBuildInvalidation {
    fn name(&self) -> &'static str {
        "build"
    }

    fn declare(
        &self,
        stack: &mut Stack,
        ctx: &InvalidationContext<'_>,
    ) -> Result<DeclaredInvalidation, SynthError> {
        let project = project::declare(
            stack,
            &ctx.naming.logical_id("invalidate-cache-project"),
            ctx.environment,
            ctx.artifact_bucket,
            ProjectSpec {
                build_spec: Some(Self::build_spec()?),
                environment_variables: vec![(
                    DISTRIBUTION_ID_ENV.to_string(),
                    ctx.config.distribution_id.clone(),
                )],
                statements: vec![policy::invalidation_statement(
                    &ctx.config.account_id,
                    &ctx.config.distribution_id,
                )],
            },
        )?;

        // CodeBuild actions require an input artifact even when they ignore it
        let action = Action::new(INVALIDATE_ACTION, ActionType::CODEBUILD)
            .with_config("ProjectName", project.name)
            .with_input(ctx.source_output);

        Ok(DeclaredInvalidation {
            action,
            pipeline_statements: vec![project.start_build],
        })
    }
}

/// Lambda function invoked by the pipeline
pub struct FunctionInvalidation<'a> {
    pub settings: &'a FunctionSettings,
}

impl InvalidationStrategy for FunctionInvalidation<'_> {
    fn name(&self) -> &'static str {
        "function"
    }

    fn declare(
        &self,
        stack: &mut Stack,
        ctx: &InvalidationContext<'_>,
    ) -> Result<DeclaredInvalidation, SynthError> {
        let function_id = ctx.naming.logical_id("invalidate-cache-function");
        let role_id = format!("{}Role", function_id);
        let policy_id = format!("{}RoleDefaultPolicy", function_id);

        let role = policy::service_role(
            stack,
            &role_id,
            "lambda.amazonaws.com",
            &[LAMBDA_BASIC_EXECUTION],
        )?;
        policy::attach_policy(
            stack,
            &policy_id,
            &role,
            vec![
                policy::invalidation_statement(
                    &ctx.config.account_id,
                    &ctx.config.distribution_id,
                ),
                // Job result calls do not support resource-level permissions
                PolicyStatement::allow(
                    [
                        "codepipeline:PutJobSuccessResult",
                        "codepipeline:PutJobFailureResult",
                    ],
                    [Token::literal("*")],
                ),
            ],
        )?;

        let function = stack.add_resource(
            &function_id,
            Resource::new(
                "AWS::Lambda::Function",
                json!({
                    "Code": {
                        "S3Bucket": self.settings.s3_bucket,
                        "S3Key": self.settings.s3_key,
                    },
                    "Handler": self.settings.handler,
                    "Runtime": self.settings.runtime,
                    "Timeout": self.settings.timeout_secs,
                    "Role": Token::get_att(&role_id, "Arn"),
                    "Environment": {
                        "Variables": { DISTRIBUTION_ID_ENV: ctx.config.distribution_id },
                    },
                }),
            )
            .depends_on(&policy_id)
            .depends_on(&role_id),
        )?;

        let action = Action::new(INVALIDATE_ACTION, ActionType::LAMBDA_INVOKE)
            .with_config("FunctionName", function);

        Ok(DeclaredInvalidation {
            action,
            pipeline_statements: vec![PolicyStatement::allow(
                ["lambda:InvokeFunction"],
                [Token::get_att(&function_id, "Arn")],
            )],
        })
    }
}
