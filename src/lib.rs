//! sitestack - static website hosting and delivery pipelines for AWS

pub mod app;
pub mod aws;
pub mod cli;
pub mod core;
pub mod pipeline;
pub mod trigger;
pub mod website;

#[cfg(test)]
mod testutil;

// Re-export commonly used types
pub use app::{synthesize, AppConfig, Synthesis};
pub use core::{Assembly, Environment, Naming, Stack, SynthError, Token};
pub use pipeline::{PipelineBuilder, PipelineConfig, PipelineHandle};
pub use trigger::{InvalidationTrigger, TriggerOutcome};
pub use website::{DistributionHandle, WebsiteConfig, WebsiteDeployment};
