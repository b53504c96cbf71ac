//! Pipeline unit
//!
//! Builds a CodePipeline that pulls a GitHub branch, runs the project's
//! `buildspec.yml`, optionally waits for manual approval, uploads the build
//! output to the website bucket, and invalidates the distribution's cache.

pub mod builder;
pub mod cleanup;
pub mod condition;
pub mod config;
pub mod invalidation;
pub mod project;
pub mod stage;

pub use builder::{PipelineBuilder, PipelineHandle};
pub use condition::{StageCondition, StageKind, StagePlan};
pub use config::{EnvVarSpec, EnvVarType, PipelineConfig, SecretValue};
pub use invalidation::{
    FunctionInvalidation, FunctionSettings, InlineBuildInvalidation, InvalidationConfig,
    InvalidationStrategy,
};
