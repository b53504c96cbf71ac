//! Cloud assembly - the set of synthesized stacks written to disk

use crate::core::{error::SynthError, template::Stack};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the manifest file written next to the templates
pub const MANIFEST_FILE: &str = "manifest.json";

/// Synthesized stacks in deployment order
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    stacks: Vec<Stack>,
}

impl Assembly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stack; names and export names must be unique across the assembly
    pub fn push(&mut self, stack: Stack) -> Result<(), SynthError> {
        if self.stack(&stack.name).is_some() {
            return Err(SynthError::InvalidConfig(format!(
                "Duplicate stack name: {}",
                stack.name
            )));
        }

        let existing: HashSet<&str> = self.stacks.iter().flat_map(Stack::export_names).collect();
        if let Some(duplicate) = stack.export_names().find(|name| existing.contains(name)) {
            return Err(SynthError::DuplicateExport(duplicate.to_string()));
        }

        self.stacks.push(stack);
        Ok(())
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name == name)
    }

    /// Manifest describing every stack and how stacks feed each other
    pub fn manifest(&self) -> Value {
        let stacks: Vec<Value> = self
            .stacks
            .iter()
            .map(|stack| {
                json!({
                    "name": stack.name,
                    "template": template_file_name(&stack.name),
                    "account": stack.environment.account,
                    "region": stack.environment.region,
                    "dependencies": stack.dependencies(),
                    "parameters": stack.parameter_sources(),
                })
            })
            .collect();

        json!({ "version": 1, "stacks": stacks })
    }

    /// Write one template per stack plus the manifest
    pub fn write_to<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>, SynthError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let mut written = Vec::new();
        for stack in &self.stacks {
            let path = dir.join(template_file_name(&stack.name));
            let content = serde_json::to_string_pretty(&stack.to_template())?;
            std::fs::write(&path, content)?;
            info!("Wrote {} ({} resources)", path.display(), stack.resource_count());
            written.push(path);
        }

        let manifest_path = dir.join(MANIFEST_FILE);
        std::fs::write(&manifest_path, serde_json::to_string_pretty(&self.manifest())?)?;
        written.push(manifest_path);

        Ok(written)
    }
}

pub fn template_file_name(stack_name: &str) -> String {
    format!("{}.template.json", stack_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::template::Environment;
    use crate::core::token::Token;

    fn env() -> Environment {
        Environment::new("1234567890", "ap-southeast-2")
    }

    #[test]
    fn test_duplicate_export_rejected() {
        let mut a = Stack::new("a", env());
        a.export("Out", "shared-export", Token::literal("x"));
        let mut b = Stack::new("b", env());
        b.export("Out", "shared-export", Token::literal("y"));

        let mut assembly = Assembly::new();
        assembly.push(a).unwrap();
        let err = assembly.push(b).unwrap_err();
        assert!(matches!(err, SynthError::DuplicateExport(name) if name == "shared-export"));
    }

    #[test]
    fn test_manifest_lists_stacks_in_order() {
        let mut assembly = Assembly::new();
        assembly.push(Stack::new("first", env())).unwrap();
        let mut second = Stack::new("second", env());
        second.add_dependency("first");
        assembly.push(second).unwrap();

        let manifest = assembly.manifest();
        assert_eq!(manifest["stacks"][0]["name"], "first");
        assert_eq!(manifest["stacks"][1]["dependencies"], json!(["first"]));
        assert_eq!(manifest["stacks"][1]["template"], "second.template.json");
    }
}
