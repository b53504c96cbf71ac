//! Stack and resource model rendered as CloudFormation templates

use crate::core::{error::SynthError, token::Token};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Account and region a stack is deployed into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// AWS account number
    pub account: String,

    /// AWS region, e.g. `ap-southeast-2`
    pub region: String,
}

impl Environment {
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
        }
    }

    /// Same account, different region
    pub fn in_region(&self, region: &str) -> Self {
        Self::new(self.account.clone(), region)
    }
}

/// What happens to a resource when it leaves the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemovalPolicy {
    Delete,
    Retain,
}

/// A single declared resource
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Value::is_null")]
    pub properties: Value,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<RemovalPolicy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<RemovalPolicy>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, properties: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.deletion_policy = Some(policy);
        self.update_replace_policy = Some(policy);
        self
    }
}

/// A template parameter supplied at deploy time
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    #[serde(rename = "Type")]
    pub parameter_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Where a parameter's value comes from, recorded in the assembly manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSource {
    pub stack: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub value: Token,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<Export>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Export {
    pub name: String,
}

/// A deployable unit: one template in one account/region
#[derive(Debug, Clone)]
pub struct Stack {
    /// Stack name
    pub name: String,

    /// Target account and region
    pub environment: Environment,

    /// Template description
    pub description: Option<String>,

    parameters: BTreeMap<String, Parameter>,
    parameter_sources: BTreeMap<String, ParameterSource>,
    resources: BTreeMap<String, Resource>,
    outputs: BTreeMap<String, Output>,
    dependencies: Vec<String>,
}

impl Stack {
    pub fn new(name: impl Into<String>, environment: Environment) -> Self {
        Self {
            name: name.into(),
            environment,
            description: None,
            parameters: BTreeMap::new(),
            parameter_sources: BTreeMap::new(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare a resource and return a `Ref` to it
    pub fn add_resource(
        &mut self,
        logical_id: impl Into<String>,
        resource: Resource,
    ) -> Result<Token, SynthError> {
        let logical_id = logical_id.into();
        self.ensure_unused(&logical_id)?;
        debug!(
            "{}: declaring {} ({})",
            self.name, logical_id, resource.resource_type
        );
        self.resources.insert(logical_id.clone(), resource);
        Ok(Token::reference(logical_id))
    }

    /// Declare a string parameter and return a `Ref` to it
    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Token, SynthError> {
        let name = name.into();
        self.ensure_unused(&name)?;
        self.parameters.insert(
            name.clone(),
            Parameter {
                parameter_type: "String".to_string(),
                description: Some(description.into()),
            },
        );
        Ok(Token::reference(name))
    }

    /// Record that `parameter` is fed by another stack's output
    pub fn bind_parameter(&mut self, parameter: &str, source: ParameterSource) {
        self.add_dependency(&source.stack);
        self.parameter_sources.insert(parameter.to_string(), source);
    }

    pub fn add_output(&mut self, name: impl Into<String>, value: Token, description: &str) {
        self.outputs.insert(
            name.into(),
            Output {
                value,
                description: Some(description.to_string()),
                export: None,
            },
        );
    }

    /// Add an exported output and return the token other stacks use to import it
    pub fn export(
        &mut self,
        name: impl Into<String>,
        export_name: impl Into<String>,
        value: Token,
    ) -> Token {
        let export_name = export_name.into();
        self.outputs.insert(
            name.into(),
            Output {
                value,
                description: None,
                export: Some(Export {
                    name: export_name.clone(),
                }),
            },
        );
        Token::import(export_name)
    }

    pub fn add_dependency(&mut self, stack_name: &str) {
        if !self.dependencies.iter().any(|d| d == stack_name) {
            self.dependencies.push(stack_name.to_string());
        }
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    /// Iterate resources of one CloudFormation type
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a Resource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn parameter_sources(&self) -> &BTreeMap<String, ParameterSource> {
        &self.parameter_sources
    }

    /// Names of all exports declared by this stack
    pub fn export_names(&self) -> impl Iterator<Item = &str> {
        self.outputs
            .values()
            .filter_map(|o| o.export.as_ref().map(|e| e.name.as_str()))
    }

    /// Render the CloudFormation template
    pub fn to_template(&self) -> Value {
        let mut template = Map::new();
        template.insert("AWSTemplateFormatVersion".into(), json!("2010-09-09"));
        if let Some(description) = &self.description {
            template.insert("Description".into(), json!(description));
        }
        if !self.parameters.is_empty() {
            template.insert("Parameters".into(), json!(self.parameters));
        }
        template.insert("Resources".into(), json!(self.resources));
        if !self.outputs.is_empty() {
            template.insert("Outputs".into(), json!(self.outputs));
        }
        Value::Object(template)
    }

    fn ensure_unused(&self, logical_id: &str) -> Result<(), SynthError> {
        if self.resources.contains_key(logical_id) || self.parameters.contains_key(logical_id) {
            return Err(SynthError::DuplicateLogicalId {
                stack: self.name.clone(),
                logical_id: logical_id.to_string(),
            });
        }
        Ok(())
    }
}
