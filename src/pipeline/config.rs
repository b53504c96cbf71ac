//! Pipeline configuration

use crate::core::{
    bucket::BucketRef,
    error::SynthError,
    policy::PolicyStatement,
    template::Environment,
    token::Token,
};
use crate::pipeline::invalidation::InvalidationConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How CodeBuild resolves an environment variable's value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvVarType {
    /// Value used as-is
    #[default]
    Plaintext,
    /// Value names an SSM parameter
    ParameterStore,
    /// Value names a Secrets Manager secret
    SecretsManager,
}

/// A build environment variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarSpec {
    #[serde(rename = "type", default)]
    pub var_type: EnvVarType,

    pub value: String,
}

impl EnvVarSpec {
    pub fn plaintext(value: impl Into<String>) -> Self {
        Self {
            var_type: EnvVarType::Plaintext,
            value: value.into(),
        }
    }

    /// Permission the build role needs to resolve this variable
    ///
    /// Secrets Manager values may carry `:json-key:version-stage:version-id`
    /// after the secret ID; only the ID is granted.
    pub fn read_statement(&self, environment: &Environment) -> Option<PolicyStatement> {
        match self.var_type {
            EnvVarType::Plaintext => None,
            EnvVarType::ParameterStore => Some(PolicyStatement::allow(
                ["ssm:GetParameters"],
                [Token::literal(format!(
                    "arn:aws:ssm:{}:{}:parameter/{}",
                    environment.region,
                    environment.account,
                    self.value.trim_start_matches('/')
                ))],
            )),
            EnvVarType::SecretsManager => Some(PolicyStatement::allow(
                ["secretsmanager:GetSecretValue"],
                [Token::literal(secret_arn_pattern(&self.value, environment))],
            )),
        }
    }
}

/// ARN pattern matching a secret given by ARN or by name
///
/// Secret ARNs end in a six-character random suffix, which names do not include.
fn secret_arn_pattern(value: &str, environment: &Environment) -> String {
    if value.starts_with("arn:") {
        let arn: Vec<&str> = value.split(':').take(7).collect();
        format!("{}*", arn.join(":"))
    } else {
        let name = value.split(':').next().unwrap_or(value);
        format!(
            "arn:aws:secretsmanager:{}:{}:secret:{}-??????",
            environment.region, environment.account, name
        )
    }
}

/// A secret that ends up in the template
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretValue {
    /// Stored in the template as-is
    Plaintext(String),
    /// Resolved by CloudFormation from Secrets Manager at deploy time
    SecretsManager {
        secret_id: String,
        #[serde(default)]
        json_field: Option<String>,
    },
}

impl SecretValue {
    pub fn to_token(&self) -> Token {
        match self {
            SecretValue::Plaintext(value) => Token::literal(value),
            SecretValue::SecretsManager {
                secret_id,
                json_field,
            } => Token::literal(format!(
                "{{{{resolve:secretsmanager:{}:SecretString:{}::}}}}",
                secret_id,
                json_field.as_deref().unwrap_or("")
            )),
        }
    }

    pub fn is_plaintext(&self) -> bool {
        matches!(self, SecretValue::Plaintext(_))
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretValue::Plaintext(_) => f.write_str("Plaintext(<redacted>)"),
            SecretValue::SecretsManager {
                secret_id,
                json_field,
            } => f
                .debug_struct("SecretsManager")
                .field("secret_id", secret_id)
                .field("json_field", json_field)
                .finish(),
        }
    }
}

/// Inputs to the pipeline unit
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// GitHub user or organization owning the repository
    pub source_owner: String,

    /// Repository name
    pub source_repo: String,

    /// Branch to build
    pub source_branch: String,

    /// GitHub OAuth token
    pub source_auth_token: SecretValue,

    /// Whether the source action polls for changes
    pub poll_for_source_changes: bool,

    /// Variables exposed to the build stage, injected verbatim
    pub build_env_vars: BTreeMap<String, EnvVarSpec>,

    /// Addresses notified for manual approval before deploying
    pub approval_emails: Option<Vec<String>>,

    /// Bucket the built site is uploaded to
    pub deploy_target: BucketRef,

    /// Distribution whose cache is invalidated after upload
    pub distribution_id: Token,

    /// Account the pipeline is deployed into
    pub account_id: String,

    /// How the cache invalidation runs
    pub invalidation: InvalidationConfig,
}

/// Wire form of a build variable inside the `EnvironmentVariables` configuration
#[derive(Serialize)]
struct BuildVariable<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    var_type: EnvVarType,
    value: &'a str,
}

impl PipelineConfig {
    /// An approval stage exists only for a non-empty address list
    pub fn approval_requested(&self) -> bool {
        self.approval_emails
            .as_ref()
            .is_some_and(|emails| !emails.is_empty())
    }

    pub fn approval_emails(&self) -> &[String] {
        self.approval_emails.as_deref().unwrap_or(&[])
    }

    /// Permissions for every variable resolved from SSM or Secrets Manager
    pub fn build_variable_statements(&self, environment: &Environment) -> Vec<PolicyStatement> {
        self.build_env_vars
            .values()
            .filter_map(|spec| spec.read_statement(environment))
            .collect()
    }

    /// `EnvironmentVariables` value for the build action; `None` when there are none
    pub fn build_environment_json(&self) -> Result<Option<String>, SynthError> {
        if self.build_env_vars.is_empty() {
            return Ok(None);
        }

        let variables: Vec<BuildVariable<'_>> = self
            .build_env_vars
            .iter()
            .map(|(name, spec)| BuildVariable {
                name,
                var_type: spec.var_type,
                value: &spec.value,
            })
            .collect();

        Ok(Some(serde_json::to_string(&variables)?))
    }
}
