//! CodeBuild projects run by pipeline actions

use crate::core::{
    bucket::BucketRef,
    error::SynthError,
    policy::{self, PolicyStatement},
    template::{Environment, Resource, Stack},
    token::Token,
};
use serde_json::{json, Value};

/// Standard Linux build image used by every project
pub const BUILD_IMAGE: &str = "aws/codebuild/standard:5.0";

/// What a project needs beyond the defaults
#[derive(Debug, Clone, Default)]
pub struct ProjectSpec {
    /// Inline buildspec; `None` uses `buildspec.yml` from the source artifact
    pub build_spec: Option<String>,

    /// Plaintext variables set on the project's environment
    pub environment_variables: Vec<(String, Token)>,

    /// Extra permissions for the project's role
    pub statements: Vec<PolicyStatement>,
}

/// A declared project and the permission the pipeline needs to start it
#[derive(Debug, Clone)]
pub struct Project {
    pub name: Token,
    pub start_build: PolicyStatement,
}

/// Declare a project, its service role, and the role's policy
///
/// The role can write its own logs and read/write the pipeline's artifact bucket.
pub fn declare(
    stack: &mut Stack,
    logical_id: &str,
    environment: &Environment,
    artifact_bucket: &BucketRef,
    spec: ProjectSpec,
) -> Result<Project, SynthError> {
    let role_id = format!("{}Role", logical_id);
    let role = policy::service_role(stack, &role_id, "codebuild.amazonaws.com", &[])?;

    let mut statements = vec![
        PolicyStatement::allow(
            ["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"],
            [Token::literal(format!(
                "arn:aws:logs:{}:{}:log-group:/aws/codebuild/*",
                environment.region, environment.account
            ))],
        ),
        artifact_bucket.read_write_statement(),
    ];
    statements.extend(spec.statements);

    let policy_id = format!("{}RoleDefaultPolicy", logical_id);
    policy::attach_policy(stack, &policy_id, &role, statements)?;

    let mut source = json!({ "Type": "CODEPIPELINE" });
    if let Some(build_spec) = spec.build_spec {
        source["BuildSpec"] = json!(build_spec);
    }

    let mut build_environment = json!({
        "Type": "LINUX_CONTAINER",
        "ComputeType": "BUILD_GENERAL1_SMALL",
        "Image": BUILD_IMAGE,
        "PrivilegedMode": false,
    });
    if !spec.environment_variables.is_empty() {
        build_environment["EnvironmentVariables"] = spec
            .environment_variables
            .iter()
            .map(|(name, value)| json!({ "Name": name, "Type": "PLAINTEXT", "Value": value }))
            .collect::<Vec<Value>>()
            .into();
    }

    let name = stack.add_resource(
        logical_id,
        Resource::new(
            "AWS::CodeBuild::Project",
            json!({
                "Source": source,
                "Artifacts": { "Type": "CODEPIPELINE" },
                "Environment": build_environment,
                "ServiceRole": Token::get_att(&role_id, "Arn"),
            }),
        )
        .depends_on(&policy_id),
    )?;

    Ok(Project {
        start_build: PolicyStatement::allow(
            ["codebuild:BatchGetBuilds", "codebuild:StartBuild"],
            [Token::get_att(logical_id, "Arn")],
        ),
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::environment;

    #[test]
    fn test_project_uses_standard_image() {
        let mut stack = Stack::new("test", environment());
        let bucket = BucketRef::owned("ArtifactBucket");

        let project = declare(
            &mut stack,
            "BuildProject",
            &environment(),
            &bucket,
            ProjectSpec::default(),
        )
        .unwrap();

        assert_eq!(project.name, Token::reference("BuildProject"));
        let resource = stack.resource("BuildProject").unwrap();
        assert_eq!(resource.properties["Environment"]["Image"], BUILD_IMAGE);
        assert_eq!(resource.properties["Environment"]["PrivilegedMode"], false);
        assert!(resource.properties["Source"].get("BuildSpec").is_none());
        assert!(resource.properties["Environment"]
            .get("EnvironmentVariables")
            .is_none());
        assert!(stack.resource("BuildProjectRole").is_some());
        assert_eq!(resource.depends_on, ["BuildProjectRoleDefaultPolicy"]);
    }

    #[test]
    fn test_project_environment_variables() {
        let mut stack = Stack::new("test", environment());
        let spec = ProjectSpec {
            environment_variables: vec![(
                "DISTRIBUTION_ID".to_string(),
                Token::import("test-distribution-id-dev"),
            )],
            ..ProjectSpec::default()
        };

        declare(
            &mut stack,
            "InvalidateProject",
            &environment(),
            &BucketRef::owned("ArtifactBucket"),
            spec,
        )
        .unwrap();

        let resource = stack.resource("InvalidateProject").unwrap();
        assert_eq!(
            resource.properties["Environment"]["EnvironmentVariables"],
            json!([{
                "Name": "DISTRIBUTION_ID",
                "Type": "PLAINTEXT",
                "Value": { "Fn::ImportValue": "test-distribution-id-dev" },
            }])
        );
    }
}
