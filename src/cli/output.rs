//! Output formatting utilities

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::io::IsTerminal;

use crate::cli::OutputFormat;

/// Determine the effective output format based on context
///
/// `Auto` renders text on a terminal. When piped, commands that print a
/// document (`show`, `run`) fall back to YAML; the rest keep text.
pub fn effective_format(format: OutputFormat, is_document: bool) -> OutputFormat {
    match format {
        OutputFormat::Auto => {
            if is_document && !std::io::stdout().is_terminal() {
                OutputFormat::Yaml
            } else {
                OutputFormat::Text
            }
        }
        other => other,
    }
}

/// Print a serializable value as YAML or JSON
pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value).into_diagnostic()?;
            println!("{}", json);
        }
        _ => {
            let yaml = serde_yml::to_string(value).into_diagnostic()?;
            print!("{}", yaml);
        }
    }
    Ok(())
}
