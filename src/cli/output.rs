//! CLI output formatting

use crate::core::{assembly::template_file_name, template::Stack};
use crate::trigger::TriggerOutcome;
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// One line per stack: name, region, resource count, dependencies
pub fn format_stack(stack: &Stack) -> String {
    let mut line = format!(
        "  {} {} ({} resources) → {}",
        style(&stack.name).bold(),
        style(&stack.environment.region).cyan(),
        stack.resource_count(),
        style(template_file_name(&stack.name)).dim()
    );
    if !stack.dependencies().is_empty() {
        line.push_str(&format!(
            " {}",
            style(format!("after {}", stack.dependencies().join(", "))).dim()
        ));
    }
    line
}

/// Stage names joined in execution order
pub fn format_stages(stages: &[String]) -> String {
    stages
        .iter()
        .map(|s| style(s).cyan().to_string())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Format a trigger outcome for display
pub fn format_outcome(outcome: &TriggerOutcome) -> String {
    match outcome {
        TriggerOutcome::Skipped => format!("{} No distribution ID; nothing invalidated", WARN),
        TriggerOutcome::Submitted { invalidation_id } => format!(
            "{} Invalidation {} submitted",
            CHECK,
            style(invalidation_id).bold()
        ),
        TriggerOutcome::Failed { error } => {
            format!("{} Invalidation failed: {}", CROSS, style(error).red())
        }
    }
}
