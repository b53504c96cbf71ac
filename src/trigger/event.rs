//! Payload of a CodePipeline `Invoke` action

use serde::Deserialize;

/// What CodePipeline sends a function it invokes
///
/// Invocations from outside a pipeline carry no job; they still run the trigger.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvokeEvent {
    #[serde(rename = "CodePipeline.job", default)]
    pub job: Option<PipelineJob>,
}

/// The job the invoking action is waiting on
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineJob {
    pub id: String,

    #[serde(default)]
    pub account_id: Option<String>,
}

impl InvokeEvent {
    pub fn job_id(&self) -> Option<&str> {
        self.job.as_ref().map(|job| job.id.as_str())
    }
}
