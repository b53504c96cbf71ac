//! Pipeline unit: stage assembly, permissions, and invalidation strategies

mod helpers;

use helpers::*;
use serde_json::json;
use sitestack::core::{BucketRef, Environment, Naming, Stack, Token};
use sitestack::pipeline::{
    EnvVarSpec, EnvVarType, FunctionSettings, InvalidationConfig, PipelineBuilder, PipelineConfig,
    SecretValue,
};

fn config() -> PipelineConfig {
    PipelineConfig {
        source_owner: "test-owner".to_string(),
        source_repo: "test-repo".to_string(),
        source_branch: "test-branch".to_string(),
        source_auth_token: SecretValue::Plaintext("test-secret-value".to_string()),
        poll_for_source_changes: true,
        build_env_vars: Default::default(),
        approval_emails: None,
        deploy_target: BucketRef::from_arn("arn:aws:s3:::test-deploy-bucket").unwrap(),
        distribution_id: Token::literal("test-distribution-id"),
        account_id: "1234567890".to_string(),
        invalidation: InvalidationConfig::Build,
    }
}

fn build(config: &PipelineConfig) -> Stack {
    let naming = Naming::new("test", "dev");
    let mut stack = Stack::new(
        "test-pipeline-dev",
        Environment::new("1234567890", "ap-southeast-2"),
    );
    PipelineBuilder::new(&naming, config)
        .build(&mut stack)
        .unwrap();
    stack
}

#[test]
fn test_stages_without_approval() {
    for emails in [None, Some(vec![])] {
        let stack = build(&PipelineConfig {
            approval_emails: emails,
            ..config()
        });
        assert_eq!(stage_names(&stack), ["source", "build", "deploy"]);
        assert_resource_count_is(&stack, "AWS::SNS::Topic", 0);
        assert_resource_count_is(&stack, "AWS::SNS::Subscription", 0);
    }
}

#[test]
fn test_approval_stage_with_subscriptions() {
    let stack = build(&PipelineConfig {
        approval_emails: Some(vec!["a@x.com".to_string(), "b@x.com".to_string()]),
        ..config()
    });

    assert_eq!(stage_names(&stack), ["source", "build", "approve", "deploy"]);
    assert_resource_count_is(&stack, "AWS::SNS::Topic", 1);
    assert_resource_count_is(&stack, "AWS::SNS::Subscription", 2);
    for email in ["a@x.com", "b@x.com"] {
        assert_has_resource_properties(
            &stack,
            "AWS::SNS::Subscription",
            json!({ "Protocol": "email", "Endpoint": email }),
        );
    }
    assert_has_resource_properties(
        &stack,
        "AWS::CodePipeline::Pipeline",
        json!({
            "Stages": [
                {},
                {},
                {
                    "Name": "approve",
                    "Actions": [{
                        "ActionTypeId": { "Category": "Approval", "Provider": "Manual" },
                    }],
                },
                {},
            ],
        }),
    );
}

#[test]
fn test_source_stage() {
    let stack = build(&config());
    assert_has_resource_properties(
        &stack,
        "AWS::CodePipeline::Pipeline",
        json!({
            "Stages": [
                {
                    "Name": "source",
                    "Actions": [{
                        "ActionTypeId": { "Owner": "ThirdParty", "Provider": "GitHub" },
                        "Configuration": {
                            "Owner": "test-owner",
                            "Repo": "test-repo",
                            "Branch": "test-branch",
                            "OAuthToken": "test-secret-value",
                        },
                        "OutputArtifacts": [{ "Name": "Artifact_Source_source" }],
                    }],
                },
                {},
                {},
            ],
        }),
    );
}

#[test]
fn test_build_environment_variables() {
    let mut config = config();
    config
        .build_env_vars
        .insert("test-key".to_string(), EnvVarSpec::plaintext("test-value"));
    let stack = build(&config);

    assert_has_resource_properties(
        &stack,
        "AWS::CodePipeline::Pipeline",
        json!({
            "Stages": [
                {},
                {
                    "Name": "build",
                    "Actions": [{
                        "Configuration": {
                            "EnvironmentVariables":
                                r#"[{"name":"test-key","type":"PLAINTEXT","value":"test-value"}]"#,
                        },
                        "InputArtifacts": [{ "Name": "Artifact_Source_source" }],
                        "OutputArtifacts": [{ "Name": "Artifact_Build_build" }],
                    }],
                },
                {},
            ],
        }),
    );
}

#[test]
fn test_build_variable_types_are_passed_through() {
    let mut config = config();
    config.build_env_vars.insert(
        "API_KEY".to_string(),
        EnvVarSpec {
            var_type: EnvVarType::SecretsManager,
            value: "site/api-key".to_string(),
        },
    );
    let stack = build(&config);
    let pipeline = only_resource(&stack, "AWS::CodePipeline::Pipeline");
    let variables = pipeline.properties["Stages"][1]["Actions"][0]["Configuration"]
        ["EnvironmentVariables"]
        .as_str()
        .unwrap();
    assert!(variables.contains(r#""type":"SECRETS_MANAGER""#));
}

#[test]
fn test_build_projects_use_standard_image() {
    let stack = build(&config());
    assert_resource_count_is(&stack, "AWS::CodeBuild::Project", 2);
    for (_, project) in stack.resources_of_type("AWS::CodeBuild::Project") {
        assert_eq!(
            project.properties["Environment"]["Image"],
            "aws/codebuild/standard:5.0"
        );
    }
}

#[test]
fn test_deploy_stage_uploads_then_invalidates() {
    let stack = build(&config());
    assert_has_resource_properties(
        &stack,
        "AWS::CodePipeline::Pipeline",
        json!({
            "Stages": [
                {},
                {},
                {
                    "Name": "deploy",
                    "Actions": [
                        {
                            "ActionTypeId": { "Category": "Deploy", "Provider": "S3" },
                            "Configuration": {
                                "BucketName": "test-deploy-bucket",
                                "Extract": "true",
                            },
                            "InputArtifacts": [{ "Name": "Artifact_Build_build" }],
                            "RunOrder": 1,
                        },
                        {
                            "Name": "invalidate-cache",
                            "ActionTypeId": { "Category": "Build", "Provider": "CodeBuild" },
                            "RunOrder": 2,
                        },
                    ],
                },
            ],
        }),
    );
}

#[test]
fn test_invalidation_permission_is_scoped_to_distribution() {
    let stack = build(&config());
    assert_has_resource_properties(
        &stack,
        "AWS::IAM::Policy",
        json!({
            "PolicyDocument": {
                "Statement": [
                    {},
                    {},
                    {
                        "Action": "cloudfront:CreateInvalidation",
                        "Effect": "Allow",
                        "Resource": "arn:aws:cloudfront::1234567890:distribution/test-distribution-id",
                    },
                ],
            },
        }),
    );
}

#[test]
fn test_inline_invalidation_project_environment() {
    let stack = build(&config());
    assert_has_resource_properties(
        &stack,
        "AWS::CodeBuild::Project",
        json!({
            "Environment": {
                "EnvironmentVariables": [{
                    "Name": "DISTRIBUTION_ID",
                    "Type": "PLAINTEXT",
                    "Value": "test-distribution-id",
                }],
            },
        }),
    );
}

#[test]
fn test_function_invalidation_strategy() {
    let stack = build(&PipelineConfig {
        invalidation: InvalidationConfig::Function(FunctionSettings {
            s3_bucket: "artifacts".to_string(),
            s3_key: "invalidate.zip".to_string(),
            runtime: "provided.al2023".to_string(),
            handler: "bootstrap".to_string(),
            timeout_secs: 30,
        }),
        ..config()
    });

    assert_resource_count_is(&stack, "AWS::CodeBuild::Project", 1);
    assert_has_resource_properties(
        &stack,
        "AWS::Lambda::Function",
        json!({
            "Code": { "S3Bucket": "artifacts", "S3Key": "invalidate.zip" },
            "Environment": { "Variables": { "DISTRIBUTION_ID": "test-distribution-id" } },
        }),
    );
    assert_has_resource_properties(
        &stack,
        "AWS::IAM::Policy",
        json!({
            "PolicyDocument": {
                "Statement": [
                    {
                        "Action": "cloudfront:CreateInvalidation",
                        "Resource": "arn:aws:cloudfront::1234567890:distribution/test-distribution-id",
                    },
                    {},
                ],
            },
        }),
    );

    let pipeline = only_resource(&stack, "AWS::CodePipeline::Pipeline");
    let invalidate = &pipeline.properties["Stages"][2]["Actions"][1];
    assert_eq!(invalidate["ActionTypeId"]["Category"], "Invoke");
    assert_eq!(invalidate["ActionTypeId"]["Provider"], "Lambda");
    assert_eq!(invalidate["RunOrder"], 2);
}

#[test]
fn test_secrets_manager_token_is_dynamic_reference() {
    let stack = build(&PipelineConfig {
        source_auth_token: SecretValue::SecretsManager {
            secret_id: "github-token".to_string(),
            json_field: None,
        },
        ..config()
    });
    let pipeline = only_resource(&stack, "AWS::CodePipeline::Pipeline");
    assert_eq!(
        pipeline.properties["Stages"][0]["Actions"][0]["Configuration"]["OAuthToken"],
        "{{resolve:secretsmanager:github-token:SecretString:::}}"
    );
}

#[test]
fn test_artifact_bucket_is_emptied_on_teardown() {
    let stack = build(&config());
    assert_resource_count_is(&stack, "Custom::S3AutoDeleteObjects", 1);
    assert_has_resource_properties(
        &stack,
        "Custom::S3AutoDeleteObjects",
        json!({
            "ServiceToken": { "Fn::GetAtt": ["TestAutoDeleteObjectsFunctionDev", "Arn"] },
            "BucketName": { "Ref": "TestPipelineBucketDev" },
        }),
    );
    assert_has_resource_properties(
        &stack,
        "AWS::Lambda::Function",
        json!({ "Handler": "index.handler", "Runtime": "python3.12" }),
    );

    let (_, auto_delete) = stack
        .resources_of_type("Custom::S3AutoDeleteObjects")
        .next()
        .unwrap();
    assert!(auto_delete
        .depends_on
        .contains(&"TestPipelineBucketDev".to_string()));
}

#[test]
fn test_parameter_store_variable_is_readable_by_build_role() {
    let mut config = config();
    config.build_env_vars.insert(
        "API_KEY".to_string(),
        EnvVarSpec {
            var_type: EnvVarType::ParameterStore,
            value: "/site/api-key".to_string(),
        },
    );
    let stack = build(&config);
    assert_has_resource_properties(
        &stack,
        "AWS::IAM::Policy",
        json!({
            "PolicyName": "TestBuildProjectDevRoleDefaultPolicy",
            "PolicyDocument": {
                "Statement": [
                    {},
                    {},
                    {
                        "Action": "ssm:GetParameters",
                        "Effect": "Allow",
                        "Resource": "arn:aws:ssm:ap-southeast-2:1234567890:parameter/site/api-key",
                    },
                ],
            },
        }),
    );
}

#[test]
fn test_secrets_manager_variable_is_readable_by_build_role() {
    let mut config = config();
    config.build_env_vars.insert(
        "API_KEY".to_string(),
        EnvVarSpec {
            var_type: EnvVarType::SecretsManager,
            value: "site/api-key".to_string(),
        },
    );
    let stack = build(&config);
    assert_has_resource_properties(
        &stack,
        "AWS::IAM::Policy",
        json!({
            "PolicyName": "TestBuildProjectDevRoleDefaultPolicy",
            "PolicyDocument": {
                "Statement": [
                    {},
                    {},
                    {
                        "Action": "secretsmanager:GetSecretValue",
                        "Resource": "arn:aws:secretsmanager:ap-southeast-2:1234567890:secret:site/api-key-??????",
                    },
                ],
            },
        }),
    );
}

#[test]
fn test_plaintext_variables_add_no_permissions() {
    let mut config = config();
    config
        .build_env_vars
        .insert("API_URL".to_string(), EnvVarSpec::plaintext("https://api.example.com"));
    let stack = build(&config);
    assert_has_resource_properties(
        &stack,
        "AWS::IAM::Policy",
        json!({
            "PolicyName": "TestBuildProjectDevRoleDefaultPolicy",
            "PolicyDocument": { "Statement": [{}, {}] },
        }),
    );
}
