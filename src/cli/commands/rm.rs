//! `tolstack rm` command - Remove a contributor from a stack

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{format_short_id, load_stack, save_stack};
use crate::cli::output::{effective_format, print_structured};
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct RmArgs {
    /// Stack file
    pub file: PathBuf,

    /// Contributor to remove (CTR id, short id, 1-based index or label)
    pub reference: String,
}

pub fn run(args: RmArgs, global: &GlobalOpts) -> Result<()> {
    let mut stack = load_stack(&args.file)?;
    let removed = stack
        .remove_contributor(&args.reference)
        .map_err(|e| miette::miette!("{}", e))?;
    save_stack(&stack, &args.file)?;
    tracing::debug!(id = %removed.id, revision = stack.revision, "removed contributor");

    match effective_format(global.format, false) {
        OutputFormat::Text | OutputFormat::Auto => {
            if !global.quiet {
                println!(
                    "{} Removed {} {}",
                    style("✓").green(),
                    style(format_short_id(&removed.id)).cyan(),
                    style(&removed.label).yellow()
                );
                if stack.contributors.is_empty() {
                    println!("   {}", style("Stack has no contributors left").dim());
                }
            }
        }
        format => print_structured(&removed, format)?,
    }

    Ok(())
}
