//! Emptying the artifact bucket on teardown
//!
//! CloudFormation refuses to delete a bucket that still holds objects. A
//! custom resource backed by a small inline function deletes every object
//! when it is itself deleted, which happens before the bucket goes.

use crate::core::{
    bucket::BucketRef,
    error::SynthError,
    naming::Naming,
    policy::{self, PolicyStatement, LAMBDA_BASIC_EXECUTION},
    template::{Resource, Stack},
    token::Token,
};
use serde_json::json;

/// Custom resource type emptying a bucket on delete
pub const AUTO_DELETE_RESOURCE_TYPE: &str = "Custom::S3AutoDeleteObjects";

/// Runtime of the inline handler; `cfnresponse` is only bundled for inline Python and Node.js
pub const HANDLER_RUNTIME: &str = "python3.12";

const HANDLER_SOURCE: &str = r#"import boto3
import cfnresponse


def handler(event, context):
    try:
        if event["RequestType"] == "Delete":
            name = event["ResourceProperties"]["BucketName"]
            boto3.resource("s3").Bucket(name).objects.all().delete()
        cfnresponse.send(event, context, cfnresponse.SUCCESS, {})
    except Exception as error:
        print(error)
        cfnresponse.send(event, context, cfnresponse.FAILED, {})
"#;

/// Declare the emptying function and the custom resource for `bucket`
///
/// Returns the custom resource's logical ID. The resource depends on the
/// bucket and on the function's policy, so on teardown it runs while both
/// still exist.
pub fn declare_auto_delete(
    stack: &mut Stack,
    naming: &Naming,
    bucket: &BucketRef,
) -> Result<String, SynthError> {
    let bucket_id = bucket.logical_id.as_deref().ok_or_else(|| {
        SynthError::InvalidConfig("Only buckets declared in the stack can be emptied".to_string())
    })?;

    let function_id = naming.logical_id("auto-delete-objects-function");
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
            PolicyStatement::allow(["s3:ListBucket"], [bucket.arn.clone()]),
            PolicyStatement::allow(["s3:DeleteObject*"], [bucket.objects_arn()]),
        ],
    )?;

    stack.add_resource(
        &function_id,
        Resource::new(
            "AWS::Lambda::Function",
            json!({
                "Code": { "ZipFile": HANDLER_SOURCE },
                "Handler": "index.handler",
                "Runtime": HANDLER_RUNTIME,
                "Timeout": 900,
                "Role": Token::get_att(&role_id, "Arn"),
                "Description": format!("Empties {} before it is deleted", bucket_id),
            }),
        )
        .depends_on(&role_id),
    )?;

    let resource_id = naming.logical_id("pipeline-bucket-auto-delete-objects");
    stack.add_resource(
        &resource_id,
        Resource::new(
            AUTO_DELETE_RESOURCE_TYPE,
            json!({
                "ServiceToken": Token::get_att(&function_id, "Arn"),
                "BucketName": bucket.name,
            }),
        )
        .depends_on(bucket_id)
        .depends_on(&policy_id),
    )?;

    Ok(resource_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{environment, naming};

    #[test]
    fn test_auto_delete_runs_before_bucket_removal() {
        let mut stack = Stack::new("test", environment());
        let bucket = BucketRef::owned("ArtifactBucket");

        let id = declare_auto_delete(&mut stack, &naming(), &bucket).unwrap();
        let resource = stack.resource(&id).unwrap();

        assert_eq!(resource.resource_type, AUTO_DELETE_RESOURCE_TYPE);
        assert_eq!(resource.properties["BucketName"], json!({ "Ref": "ArtifactBucket" }));
        assert_eq!(
            resource.depends_on,
            ["ArtifactBucket", "TestAutoDeleteObjectsFunctionDevRoleDefaultPolicy"]
        );

        let function = stack.resource("TestAutoDeleteObjectsFunctionDev").unwrap();
        assert_eq!(function.properties["Runtime"], HANDLER_RUNTIME);
        assert!(function.properties["Code"]["ZipFile"]
            .as_str()
            .unwrap()
            .contains("objects.all().delete()"));
    }

    #[test]
    fn test_auto_delete_grants_only_list_and_delete() {
        let mut stack = Stack::new("test", environment());
        declare_auto_delete(&mut stack, &naming(), &BucketRef::owned("ArtifactBucket")).unwrap();

        let policy = stack
            .resource("TestAutoDeleteObjectsFunctionDevRoleDefaultPolicy")
            .unwrap();
        assert_eq!(
            policy.properties["PolicyDocument"]["Statement"],
            json!([
                {
                    "Action": "s3:ListBucket",
                    "Effect": "Allow",
                    "Resource": { "Fn::GetAtt": ["ArtifactBucket", "Arn"] },
                },
                {
                    "Action": "s3:DeleteObject*",
                    "Effect": "Allow",
                    "Resource": {
                        "Fn::Join": ["", [{ "Fn::GetAtt": ["ArtifactBucket", "Arn"] }, "/*"]],
                    },
                },
            ])
        );
    }

    #[test]
    fn test_imported_bucket_is_rejected() {
        let mut stack = Stack::new("test", environment());
        let bucket = BucketRef::from_arn("arn:aws:s3:::elsewhere").unwrap();
        assert!(declare_auto_delete(&mut stack, &naming(), &bucket).is_err());
    }
}
