//! Shared helper functions for CLI commands

use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::identity::EntityId;
use crate::entities::stack::StackDefinition;

/// Short display form of an id (`CTR-` plus the last 6 ULID characters)
pub fn format_short_id(id: &EntityId) -> String {
    id.short()
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Load a stack file, mapping errors to diagnostics
pub fn load_stack(path: &Path) -> Result<StackDefinition> {
    StackDefinition::load(path).into_diagnostic()
}

/// Save a stack file, mapping errors to diagnostics
pub fn save_stack(stack: &StackDefinition, path: &Path) -> Result<()> {
    stack.save(path).into_diagnostic()
}

/// Format a statistic with a precision that suits its magnitude
pub fn fmt_value(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-3..1e6).contains(&magnitude) {
        format!("{:.4}", value)
    } else {
        format!("{:.4e}", value)
    }
}

/// Format an optional capability index
pub fn fmt_index(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.3}", v))
}
