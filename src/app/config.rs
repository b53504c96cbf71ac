//! Application configuration from YAML

use crate::core::{bucket::parse_bucket_arn, template::Environment};
use crate::pipeline::config::{EnvVarSpec, SecretValue};
use crate::pipeline::invalidation::InvalidationConfig;
use crate::website::{config::is_within, HostedZone};
use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

/// Top-level application configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Prefix of every stack, resource, and export name
    pub namespace: String,

    /// Deployment stage, e.g. `dev` or `prod`
    pub stage: String,

    /// Account and region the stacks deploy into
    pub environment: Environment,

    /// Website delivery unit
    #[serde(default)]
    pub website: Option<WebsiteSection>,

    /// Pipeline unit
    #[serde(default)]
    pub pipeline: Option<PipelineSection>,
}

/// Website configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsiteSection {
    /// Domain the hosted zone serves, e.g. `example.com`
    pub base_domain_name: String,

    /// Domain the site is served at; defaults to the base domain
    #[serde(default)]
    pub full_domain_name: Option<String>,

    /// Zone attributes; looked up by the base domain when omitted
    #[serde(default)]
    pub hosted_zone: Option<HostedZone>,

    /// Existing bucket holding the site; a bucket is created when omitted
    #[serde(default)]
    pub origin_bucket_arn: Option<String>,
}

impl WebsiteSection {
    pub fn domain_name(&self) -> &str {
        self.full_domain_name
            .as_deref()
            .unwrap_or(&self.base_domain_name)
    }
}

/// Source repository settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    pub owner: String,
    pub repo: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(with = "serde_yaml::with::singleton_map")]
    pub oauth_token: SecretValue,

    #[serde(default = "default_poll")]
    pub poll_for_source_changes: bool,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_poll() -> bool {
    true
}

/// Pipeline configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    pub source: SourceSection,

    /// Variables injected into the build stage
    #[serde(default)]
    pub build_environment_variables: BTreeMap<String, EnvVarSpec>,

    /// Approvers notified before deploying; no approval stage when empty
    #[serde(default)]
    pub approval_notify_emails: Option<Vec<String>>,

    /// Upload target; imported from the website stack when omitted
    #[serde(default)]
    pub deploy_bucket_arn: Option<String>,

    /// Distribution to invalidate; imported from the website stack when omitted
    #[serde(default)]
    pub distribution_id: Option<String>,

    #[serde(default)]
    pub invalidation: InvalidationConfig,
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

fn domain_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?i)([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}\.?$")
            .expect("domain pattern is valid")
    })
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z][a-z0-9-]*$").expect("name pattern is valid"))
}

impl AppConfig {
    /// Load application configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse application configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the application configuration
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("namespace", &self.namespace), ("stage", &self.stage)] {
            if !name_pattern().is_match(value) {
                bail!(
                    "Invalid {} '{}': use lowercase letters, digits, and hyphens",
                    field,
                    value
                );
            }
        }

        if self.environment.account.is_empty() || self.environment.region.is_empty() {
            bail!("Environment requires both account and region");
        }

        if self.website.is_none() && self.pipeline.is_none() {
            bail!("Configuration defines neither a website nor a pipeline");
        }

        if let Some(website) = &self.website {
            website.validate()?;
        }

        if let Some(pipeline) = &self.pipeline {
            pipeline.validate()?;

            if self.website.is_none() {
                if pipeline.distribution_id.is_none() {
                    bail!("Pipeline requires 'distribution_id' when no website is configured");
                }
                if pipeline.deploy_bucket_arn.is_none() {
                    bail!("Pipeline requires 'deploy_bucket_arn' when no website is configured");
                }
            }
        }

        Ok(())
    }
}

impl WebsiteSection {
    fn validate(&self) -> Result<()> {
        for domain in [Some(&self.base_domain_name), self.full_domain_name.as_ref()]
            .into_iter()
            .flatten()
        {
            if !domain_pattern().is_match(domain) {
                bail!("Invalid domain name '{}'", domain);
            }
        }

        if !is_within(self.domain_name(), &self.base_domain_name) {
            bail!(
                "Full domain name '{}' is not within base domain '{}'",
                self.domain_name(),
                self.base_domain_name
            );
        }

        if let Some(zone) = &self.hosted_zone {
            if !zone.contains(self.domain_name()) {
                bail!(
                    "Domain '{}' is not within hosted zone '{}'",
                    self.domain_name(),
                    zone.name
                );
            }
        }

        if let Some(arn) = &self.origin_bucket_arn {
            parse_bucket_arn(arn).context("Invalid 'origin_bucket_arn'")?;
        }

        Ok(())
    }
}

impl PipelineSection {
    fn validate(&self) -> Result<()> {
        if self.source.owner.is_empty() || self.source.repo.is_empty() {
            bail!("Pipeline source requires both owner and repo");
        }
        if self.source.branch.is_empty() {
            bail!("Pipeline source branch must not be empty");
        }

        for email in self.approval_notify_emails.iter().flatten() {
            if !email_pattern().is_match(email) {
                bail!("Invalid approval email address '{}'", email);
            }
        }

        for name in self.build_environment_variables.keys() {
            if name.is_empty() {
                bail!("Build environment variable names must not be empty");
            }
        }

        if let Some(arn) = &self.deploy_bucket_arn {
            parse_bucket_arn(arn).context("Invalid 'deploy_bucket_arn'")?;
        }

        if let Some(id) = &self.distribution_id {
            if id.trim().is_empty() {
                bail!("'distribution_id' must not be empty");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::config::EnvVarType;

    const FULL: &str = r#"
namespace: acme
stage: prod
environment:
  account: "123456789012"
  region: ap-southeast-2
website:
  base_domain_name: example.com
  full_domain_name: www.example.com
  hosted_zone:
    id: /hostedzone/Z123
    name: example.com.
pipeline:
  source:
    owner: acme
    repo: site
    oauth_token:
      secrets_manager:
        secret_id: github-token
  build_environment_variables:
    API_URL:
      value: https://api.example.com
    API_KEY:
      type: PARAMETER_STORE
      value: /site/api-key
  approval_notify_emails:
    - a@x.com
    - b@x.com
"#;

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::from_yaml(FULL).unwrap();
        let website = config.website.as_ref().unwrap();
        assert_eq!(website.domain_name(), "www.example.com");
        assert_eq!(website.hosted_zone.as_ref().unwrap().id, "Z123");

        let pipeline = config.pipeline.as_ref().unwrap();
        assert_eq!(pipeline.source.branch, "main");
        assert!(pipeline.source.poll_for_source_changes);
        assert!(!pipeline.source.oauth_token.is_plaintext());
        assert_eq!(
            pipeline.build_environment_variables["API_KEY"].var_type,
            EnvVarType::ParameterStore
        );
        assert_eq!(pipeline.invalidation, InvalidationConfig::Build);
    }

    #[test]
    fn test_domain_defaults_to_base() {
        let website = WebsiteSection {
            base_domain_name: "example.com".to_string(),
            full_domain_name: None,
            hosted_zone: None,
            origin_bucket_arn: None,
        };
        assert_eq!(website.domain_name(), "example.com");
        assert!(website.validate().is_ok());
    }

    #[test]
    fn test_full_domain_outside_base_fails() {
        let yaml = FULL.replace("www.example.com", "www.example.org");
        let err = AppConfig::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("not within base domain"));
    }

    #[test]
    fn test_invalid_email_fails() {
        let yaml = FULL.replace("b@x.com", "not-an-email");
        let err = AppConfig::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("not-an-email"));
    }

    #[test]
    fn test_invalid_bucket_arn_fails() {
        let yaml = FULL.replace(
            "  base_domain_name: example.com\n",
            "  base_domain_name: example.com\n  origin_bucket_arn: arn:aws:sqs:::queue\n",
        );
        assert!(AppConfig::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_invalid_namespace_fails() {
        let yaml = FULL.replace("namespace: acme", "namespace: Acme_Site");
        assert!(AppConfig::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_empty_config_fails() {
        let yaml = r#"
namespace: acme
stage: dev
environment:
  account: "123456789012"
  region: us-east-1
"#;
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("neither"));
    }

    #[test]
    fn test_standalone_pipeline_requires_targets() {
        let yaml = r#"
namespace: acme
stage: dev
environment:
  account: "123456789012"
  region: us-east-1
pipeline:
  source:
    owner: acme
    repo: site
    oauth_token:
      plaintext: token
  deploy_bucket_arn: arn:aws:s3:::acme-site
"#;
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("distribution_id"));

        let with_id = format!("{}  distribution_id: E1ABCDEF\n", yaml);
        assert!(AppConfig::from_yaml(&with_id).is_ok());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.yaml");
        std::fs::write(&path, FULL).unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.namespace, "acme");
        assert!(AppConfig::from_file(dir.path().join("missing.yaml")).is_err());
    }
}
