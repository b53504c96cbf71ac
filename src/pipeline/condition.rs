//! Stage plan - which stages a pipeline gets, in which order

use crate::pipeline::config::PipelineConfig;

/// The stages a static website pipeline can contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Source,
    Build,
    Approve,
    Deploy,
}

impl StageKind {
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Source => "source",
            StageKind::Build => "build",
            StageKind::Approve => "approve",
            StageKind::Deploy => "deploy",
        }
    }
}

/// Predicate deciding whether a planned stage is materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageCondition {
    Always,
    /// A non-empty approval address list is configured
    ApprovalRequested,
}

impl StageCondition {
    pub fn holds(&self, config: &PipelineConfig) -> bool {
        match self {
            StageCondition::Always => true,
            StageCondition::ApprovalRequested => config.approval_requested(),
        }
    }
}

/// Ordered list of candidate stages, each guarded by a condition
#[derive(Debug, Clone)]
pub struct StagePlan {
    entries: Vec<(StageKind, StageCondition)>,
}

impl StagePlan {
    /// source → build → (approve) → deploy
    pub fn standard() -> Self {
        Self {
            entries: vec![
                (StageKind::Source, StageCondition::Always),
                (StageKind::Build, StageCondition::Always),
                (StageKind::Approve, StageCondition::ApprovalRequested),
                (StageKind::Deploy, StageCondition::Always),
            ],
        }
    }

    /// Stages whose condition holds for `config`, in plan order
    pub fn resolve(&self, config: &PipelineConfig) -> Vec<StageKind> {
        self.entries
            .iter()
            .filter(|(_, condition)| condition.holds(config))
            .map(|(kind, _)| *kind)
            .collect()
    }
}

impl Default for StagePlan {
    fn default() -> Self {
        Self::standard()
    }
}
