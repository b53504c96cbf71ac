//! Namespaced names for stacks, resources, and exports

use heck::ToUpperCamelCase;
use serde::{Deserialize, Serialize};

/// Namespace and stage shared by everything synthesized for one application
///
/// Avoids collisions between applications and between their stages
/// (`dev`, `test`, `prod`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Naming {
    pub namespace: String,
    pub stage: String,
}

impl Naming {
    pub fn new(namespace: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            stage: stage.into(),
        }
    }

    /// `<namespace>-<purpose>-<stage>`
    pub fn name(&self, purpose: &str) -> String {
        format!("{}-{}-{}", self.namespace, purpose, self.stage)
    }

    /// Stack name for a unit, e.g. `acme-website-prod`
    pub fn stack_name(&self, unit: &str) -> String {
        self.name(unit)
    }

    /// Alphanumeric logical ID, e.g. `AcmeDistributionProd`
    pub fn logical_id(&self, purpose: &str) -> String {
        self.name(purpose)
            .to_upper_camel_case()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect()
    }

    /// Export name visible across stacks in the same region
    pub fn export_name(&self, purpose: &str) -> String {
        self.name(purpose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_id_is_alphanumeric() {
        let naming = Naming::new("my-site", "dev");
        assert_eq!(naming.logical_id("a-record"), "MySiteARecordDev");
        assert_eq!(naming.logical_id("build.project"), "MySiteBuildProjectDev");
        assert!(naming
            .logical_id("invalidate-cache_project")
            .chars()
            .all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_names() {
        let naming = Naming::new("acme", "prod");
        assert_eq!(naming.stack_name("website"), "acme-website-prod");
        assert_eq!(naming.export_name("distribution-id"), "acme-distribution-id-prod");
    }
}
