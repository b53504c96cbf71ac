//! Stages, actions, and artifacts of a CodePipeline pipeline

use heck::ToUpperCamelCase;
use serde_json::{json, Map, Value};

/// Data handed from one action to a later one within a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact(String);

impl Artifact {
    /// Named after the stage and action producing it, e.g. `Artifact_Source_source`
    pub fn new(stage_name: &str, action_name: &str) -> Self {
        Self(format!(
            "Artifact_{}_{}",
            stage_name.to_upper_camel_case(),
            action_name
        ))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    fn to_value(&self) -> Value {
        json!({ "Name": self.0 })
    }
}

/// Category, owner, and provider identifying an action's type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionType {
    pub category: &'static str,
    pub owner: &'static str,
    pub provider: &'static str,
}

impl ActionType {
    pub const GITHUB_SOURCE: Self = Self {
        category: "Source",
        owner: "ThirdParty",
        provider: "GitHub",
    };

    pub const CODEBUILD: Self = Self {
        category: "Build",
        owner: "AWS",
        provider: "CodeBuild",
    };

    pub const MANUAL_APPROVAL: Self = Self {
        category: "Approval",
        owner: "AWS",
        provider: "Manual",
    };

    pub const S3_DEPLOY: Self = Self {
        category: "Deploy",
        owner: "AWS",
        provider: "S3",
    };

    pub const LAMBDA_INVOKE: Self = Self {
        category: "Invoke",
        owner: "AWS",
        provider: "Lambda",
    };
}

/// A unit of work inside a stage
#[derive(Debug, Clone)]
pub struct Action {
    pub name: String,
    pub action_type: ActionType,
    pub configuration: Map<String, Value>,
    pub inputs: Vec<Artifact>,
    pub outputs: Vec<Artifact>,

    /// Actions with a lower run order finish before higher ones start
    pub run_order: u32,
}

impl Action {
    pub fn new(name: &str, action_type: ActionType) -> Self {
        Self {
            name: name.to_string(),
            action_type,
            configuration: Map::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            run_order: 1,
        }
    }

    pub fn with_config(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.configuration.insert(key.to_string(), value.into());
        self
    }

    pub fn with_input(mut self, artifact: &Artifact) -> Self {
        self.inputs.push(artifact.clone());
        self
    }

    pub fn with_output(mut self, artifact: &Artifact) -> Self {
        self.outputs.push(artifact.clone());
        self
    }

    pub fn with_run_order(mut self, run_order: u32) -> Self {
        self.run_order = run_order;
        self
    }

    pub fn to_value(&self) -> Value {
        let mut action = json!({
            "Name": self.name,
            "ActionTypeId": {
                "Category": self.action_type.category,
                "Owner": self.action_type.owner,
                "Provider": self.action_type.provider,
                "Version": "1",
            },
            "RunOrder": self.run_order,
        });
        if !self.configuration.is_empty() {
            action["Configuration"] = Value::Object(self.configuration.clone());
        }
        if !self.inputs.is_empty() {
            action["InputArtifacts"] = self.inputs.iter().map(Artifact::to_value).collect();
        }
        if !self.outputs.is_empty() {
            action["OutputArtifacts"] = self.outputs.iter().map(Artifact::to_value).collect();
        }
        action
    }
}

/// An ordered, named group of actions; stages run one after another
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: String,
    pub actions: Vec<Action>,
}

impl Stage {
    pub fn new(name: &str, actions: Vec<Action>) -> Self {
        Self {
            name: name.to_string(),
            actions,
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "Name": self.name,
            "Actions": self.actions.iter().map(Action::to_value).collect::<Vec<_>>(),
        })
    }
}
