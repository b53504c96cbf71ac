//! Pipeline unit - assembles the delivery pipeline from its stage plan

use crate::core::{
    bucket::BucketRef,
    error::SynthError,
    naming::Naming,
    policy::{self, PolicyStatement},
    template::{RemovalPolicy, Resource, Stack},
    token::Token,
};
use crate::pipeline::{
    cleanup,
    condition::{StageKind, StagePlan},
    config::PipelineConfig,
    invalidation::InvalidationContext,
    project::{self, ProjectSpec},
    stage::{Action, ActionType, Artifact, Stage},
};
use serde_json::json;
use tracing::{debug, info, warn};

/// Tag marking a bucket emptied by the auto-delete custom resource
pub const AUTO_DELETE_TAG: &str = "auto-delete-objects";

/// What the pipeline unit registered
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    /// Logical ID of the `AWS::CodePipeline::Pipeline`
    pub logical_id: String,

    /// Stage names in execution order
    pub stages: Vec<String>,

    /// Name of the invalidation strategy in the deploy stage
    pub invalidation: &'static str,
}

/// Builds the pipeline sub-graph into a stack
pub struct PipelineBuilder<'a> {
    naming: &'a Naming,
    config: &'a PipelineConfig,
    plan: StagePlan,
    source_output: Artifact,
    build_output: Artifact,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(naming: &'a Naming, config: &'a PipelineConfig) -> Self {
        Self {
            naming,
            config,
            plan: StagePlan::standard(),
            source_output: Artifact::new("source", "source"),
            build_output: Artifact::new("build", "build"),
        }
    }

    /// Register the artifact bucket, roles, projects, and pipeline in `stack`
    pub fn build(&self, stack: &mut Stack) -> Result<PipelineHandle, SynthError> {
        if self.config.source_auth_token.is_plaintext() {
            warn!("Source OAuth token is plaintext and will be stored in the template");
        }

        let artifact_bucket = self.declare_artifact_bucket(stack)?;

        let role_id = self.naming.logical_id("pipeline-role");
        let role = policy::service_role(stack, &role_id, "codepipeline.amazonaws.com", &[])?;
        let mut statements = vec![artifact_bucket.read_write_statement()];

        let kinds = self.plan.resolve(self.config);
        debug!(
            "Resolved stages: {:?}",
            kinds.iter().map(StageKind::name).collect::<Vec<_>>()
        );

        let mut stages = Vec::with_capacity(kinds.len());
        let mut invalidation = "";
        for kind in kinds {
            let stage = match kind {
                StageKind::Source => self.source_stage(),
                StageKind::Build => self.build_stage(stack, &artifact_bucket, &mut statements)?,
                StageKind::Approve => self.approval_stage(stack, &mut statements)?,
                StageKind::Deploy => {
                    let (stage, strategy) =
                        self.deploy_stage(stack, &artifact_bucket, &mut statements)?;
                    invalidation = strategy;
                    stage
                }
            };
            stages.push(stage);
        }

        let policy_id = self.naming.logical_id("pipeline-role-policy");
        policy::attach_policy(stack, &policy_id, &role, statements)?;

        let logical_id = self.naming.logical_id("pipeline");
        stack.add_resource(
            &logical_id,
            Resource::new(
                "AWS::CodePipeline::Pipeline",
                json!({
                    "RoleArn": Token::get_att(&role_id, "Arn"),
                    "ArtifactStore": {
                        "Type": "S3",
                        "Location": artifact_bucket.name,
                    },
                    "Stages": stages.iter().map(Stage::to_value).collect::<Vec<_>>(),
                    "RestartExecutionOnUpdate": false,
                }),
            )
            .depends_on(&policy_id)
            .depends_on(&role_id),
        )?;

        let stage_names: Vec<String> = stages.into_iter().map(|s| s.name).collect();
        info!(
            "Pipeline {} for {}/{}@{}: {}",
            logical_id,
            self.config.source_owner,
            self.config.source_repo,
            self.config.source_branch,
            stage_names.join(" → ")
        );

        Ok(PipelineHandle {
            logical_id,
            stages: stage_names,
            invalidation,
        })
    }

    /// Artifact storage owned by the pipeline, emptied and destroyed with it
    fn declare_artifact_bucket(&self, stack: &mut Stack) -> Result<BucketRef, SynthError> {
        let logical_id = self.naming.logical_id("pipeline-bucket");
        stack.add_resource(
            &logical_id,
            Resource::new(
                "AWS::S3::Bucket",
                json!({
                    "Tags": [{ "Key": AUTO_DELETE_TAG, "Value": "true" }],
                }),
            )
            .with_removal_policy(RemovalPolicy::Delete),
        )?;

        let bucket = BucketRef::owned(&logical_id);
        cleanup::declare_auto_delete(stack, self.naming, &bucket)?;
        Ok(bucket)
    }

    fn source_stage(&self) -> Stage {
        let name = StageKind::Source.name();
        let action = Action::new(name, ActionType::GITHUB_SOURCE)
            .with_config("Owner", self.config.source_owner.as_str())
            .with_config("Repo", self.config.source_repo.as_str())
            .with_config("Branch", self.config.source_branch.as_str())
            .with_config("OAuthToken", self.config.source_auth_token.to_token())
            .with_config("PollForSourceChanges", self.config.poll_for_source_changes)
            .with_output(&self.source_output);

        Stage::new(name, vec![action])
    }

    fn build_stage(
        &self,
        stack: &mut Stack,
        artifact_bucket: &BucketRef,
        statements: &mut Vec<PolicyStatement>,
    ) -> Result<Stage, SynthError> {
        let name = StageKind::Build.name();
        let environment = stack.environment.clone();
        let project = project::declare(
            stack,
            &self.naming.logical_id("build-project"),
            &environment,
            artifact_bucket,
            ProjectSpec {
                statements: self.config.build_variable_statements(&environment),
                ..ProjectSpec::default()
            },
        )?;
        statements.push(project.start_build);

        let mut action = Action::new(name, ActionType::CODEBUILD)
            .with_config("ProjectName", project.name)
            .with_input(&self.source_output)
            .with_output(&self.build_output);
        if let Some(variables) = self.config.build_environment_json()? {
            action = action.with_config("EnvironmentVariables", variables);
        }

        Ok(Stage::new(name, vec![action]))
    }

    fn approval_stage(
        &self,
        stack: &mut Stack,
        statements: &mut Vec<PolicyStatement>,
    ) -> Result<Stage, SynthError> {
        let name = StageKind::Approve.name();
        let topic_id = self.naming.logical_id("approval-topic");
        let topic = stack.add_resource(
            &topic_id,
            Resource::new("AWS::SNS::Topic", serde_json::Value::Null),
        )?;

        for (index, email) in self.config.approval_emails().iter().enumerate() {
            stack.add_resource(
                self.naming
                    .logical_id(&format!("approval-subscription-{}", index + 1)),
                Resource::new(
                    "AWS::SNS::Subscription",
                    json!({
                        "Protocol": "email",
                        "Endpoint": email,
                        "TopicArn": topic,
                    }),
                ),
            )?;
        }
        statements.push(PolicyStatement::allow(["sns:Publish"], [topic.clone()]));

        let action = Action::new(name, ActionType::MANUAL_APPROVAL)
            .with_config("NotificationArn", topic);

        Ok(Stage::new(name, vec![action]))
    }

    /// Upload first, then invalidate
    fn deploy_stage(
        &self,
        stack: &mut Stack,
        artifact_bucket: &BucketRef,
        statements: &mut Vec<PolicyStatement>,
    ) -> Result<(Stage, &'static str), SynthError> {
        let name = StageKind::Deploy.name();
        let target = &self.config.deploy_target;

        let upload = Action::new("deploy-website", ActionType::S3_DEPLOY)
            .with_config("BucketName", target.name.clone())
            .with_config("Extract", "true")
            .with_input(&self.build_output)
            .with_run_order(1);
        statements.push(target.read_write_statement());

        let strategy = self.config.invalidation.strategy();
        let environment = stack.environment.clone();
        let declared = strategy.declare(
            stack,
            &InvalidationContext {
                naming: self.naming,
                environment: &environment,
                config: self.config,
                artifact_bucket,
                source_output: &self.source_output,
            },
        )?;
        statements.extend(declared.pipeline_statements);

        let invalidate = declared.action.with_run_order(2);

        Ok((Stage::new(name, vec![upload, invalidate]), strategy.name()))
    }
}
