//! Test utility functions for sitestack

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use sitestack::app::{synthesize, AppConfig, Synthesis};
use sitestack::core::template::{Resource, Stack};
use sitestack::trigger::{InvalidationClient, InvalidationError, InvalidationRequest};
use std::sync::{Arc, Mutex};

/// Whether `actual` contains everything in `expected`
///
/// Objects match when every expected key matches; arrays must match
/// element-wise with the same length; everything else must be equal.
pub fn object_like(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => expected
            .iter()
            .all(|(key, value)| actual.get(key).is_some_and(|a| object_like(a, value))),
        (Value::Array(actual), Value::Array(expected)) => {
            actual.len() == expected.len()
                && actual.iter().zip(expected).all(|(a, e)| object_like(a, e))
        }
        _ => actual == expected,
    }
}

/// Resources of `resource_type` whose properties contain `expected`
pub fn find_resources<'a>(
    stack: &'a Stack,
    resource_type: &'a str,
    expected: &Value,
) -> Vec<(&'a String, &'a Resource)> {
    stack
        .resources_of_type(resource_type)
        .filter(|(_, r)| object_like(&r.properties, expected))
        .collect()
}

/// Assert at least one resource of `resource_type` has `expected` properties
pub fn assert_has_resource_properties(stack: &Stack, resource_type: &str, expected: Value) {
    assert!(
        !find_resources(stack, resource_type, &expected).is_empty(),
        "No {} in {} matching {}\nTemplate: {}",
        resource_type,
        stack.name,
        expected,
        serde_json::to_string_pretty(&stack.to_template()).unwrap_or_default()
    );
}

/// Assert the stack declares exactly `count` resources of `resource_type`
pub fn assert_resource_count_is(stack: &Stack, resource_type: &str, count: usize) {
    let actual = stack.resources_of_type(resource_type).count();
    assert_eq!(
        actual, count,
        "Expected {} {} in {}, found {}",
        count, resource_type, stack.name, actual
    );
}

/// The single resource of `resource_type`
pub fn only_resource<'a>(stack: &'a Stack, resource_type: &'a str) -> &'a Resource {
    let mut resources = stack.resources_of_type(resource_type);
    let (_, resource) = resources
        .next()
        .unwrap_or_else(|| panic!("No {} in {}", resource_type, stack.name));
    assert!(resources.next().is_none(), "More than one {}", resource_type);
    resource
}

/// Stage names of the stack's pipeline, in order
pub fn stage_names(stack: &Stack) -> Vec<String> {
    only_resource(stack, "AWS::CodePipeline::Pipeline").properties["Stages"]
        .as_array()
        .expect("Stages should be an array")
        .iter()
        .map(|s| s["Name"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// Parse, validate, and synthesize a YAML application config
pub fn synth_yaml(yaml: &str) -> Synthesis {
    let config = AppConfig::from_yaml(yaml).expect("Should parse YAML");
    synthesize(&config).expect("Should synthesize")
}

/// Mock client that records requests and returns a canned result
#[derive(Clone, Default)]
pub struct MockInvalidationClient {
    requests: Arc<Mutex<Vec<InvalidationRequest>>>,
    reported_jobs: Arc<Mutex<Vec<String>>>,
    failure: Option<String>,
}

impl MockInvalidationClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with `message`
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<InvalidationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn reported_jobs(&self) -> Vec<String> {
        self.reported_jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl InvalidationClient for MockInvalidationClient {
    async fn create_invalidation(
        &self,
        request: &InvalidationRequest,
    ) -> Result<String, InvalidationError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.failure {
            Some(message) => Err(InvalidationError::Request(message.clone())),
            None => Ok(format!("I{}", self.requests.lock().unwrap().len())),
        }
    }

    async fn report_job_success(&self, job_id: &str) -> Result<(), InvalidationError> {
        self.reported_jobs.lock().unwrap().push(job_id.to_string());
        match &self.failure {
            Some(message) => Err(InvalidationError::Request(message.clone())),
            None => Ok(()),
        }
    }
}
