//! IAM roles and policy statements

use crate::core::{
    error::SynthError,
    template::{Resource, Stack},
    token::Token,
};
use serde::Serialize;
use serde_json::{json, Value};

/// Managed policy letting a function write its logs
pub const LAMBDA_BASIC_EXECUTION: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

/// A single `Allow` statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    #[serde(serialize_with = "one_or_many")]
    pub action: Vec<String>,

    pub effect: &'static str,

    #[serde(serialize_with = "one_or_many")]
    pub resource: Vec<Token>,
}

impl PolicyStatement {
    pub fn allow<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator<Item = Token>,
    {
        Self {
            action: actions.into_iter().map(Into::into).collect(),
            effect: "Allow",
            resource: resources.into_iter().collect(),
        }
    }
}

/// Single values render unwrapped, matching how IAM documents are usually written
fn one_or_many<S, T>(items: &[T], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    T: Serialize,
{
    match items {
        [single] => single.serialize(serializer),
        many => many.serialize(serializer),
    }
}

/// Declare an IAM role assumable by a service principal
pub fn service_role(
    stack: &mut Stack,
    logical_id: &str,
    service: &str,
    managed_policy_arns: &[&str],
) -> Result<Token, SynthError> {
    let mut properties = json!({
        "AssumeRolePolicyDocument": {
            "Version": "2012-10-17",
            "Statement": [{
                "Action": "sts:AssumeRole",
                "Effect": "Allow",
                "Principal": { "Service": service },
            }],
        },
    });
    if !managed_policy_arns.is_empty() {
        properties["ManagedPolicyArns"] = json!(managed_policy_arns);
    }

    stack.add_resource(logical_id, Resource::new("AWS::IAM::Role", properties))
}

/// Attach an inline policy to a role
pub fn attach_policy(
    stack: &mut Stack,
    logical_id: &str,
    role: &Token,
    statements: Vec<PolicyStatement>,
) -> Result<Token, SynthError> {
    stack.add_resource(
        logical_id,
        Resource::new(
            "AWS::IAM::Policy",
            json!({
                "PolicyName": logical_id,
                "PolicyDocument": policy_document(&statements),
                "Roles": [role],
            }),
        ),
    )
}

pub fn policy_document(statements: &[PolicyStatement]) -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": statements,
    })
}

/// The ARN of a CloudFront distribution
pub fn distribution_arn(account_id: &str, distribution_id: &Token) -> Token {
    Token::join([
        Token::literal(format!("arn:aws:cloudfront::{}:distribution/", account_id)),
        distribution_id.clone(),
    ])
}

/// The only permission an invalidation principal receives:
/// `cloudfront:CreateInvalidation` on exactly one distribution
pub fn invalidation_statement(account_id: &str, distribution_id: &Token) -> PolicyStatement {
    PolicyStatement::allow(
        ["cloudfront:CreateInvalidation"],
        [distribution_arn(account_id, distribution_id)],
    )
}
