//! `tolstack show` command - Display a stack definition

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{format_short_id, load_stack, truncate_str};
use crate::cli::output::{effective_format, print_structured};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Config;
use crate::entities::stack::StackDefinition;

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Stack file
    pub file: PathBuf,
}

pub fn run(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let stack = load_stack(&args.file)?;

    match effective_format(global.format, true) {
        OutputFormat::Text | OutputFormat::Auto => print_text(&stack),
        format => print_structured(&stack, format)?,
    }
    Ok(())
}

fn print_text(stack: &StackDefinition) {
    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(&stack.id.to_string()).cyan());
    println!("{}: {}", style("Title").bold(), style(&stack.title).yellow());
    println!("{}: {}", style("Kind").bold(), stack.kind);
    println!("{}: {}", style("Units").bold(), stack.units);
    println!(
        "{}: {} (rev {})",
        style("Author").bold(),
        stack.author,
        stack.revision
    );
    println!("{}", style("─".repeat(60)).dim());

    if let Some(ref description) = stack.description {
        println!();
        println!("{}", description);
    }

    for (name, limits) in [("Spec limits", &stack.spec_limits), ("Custom limits", &stack.custom_limits)] {
        if let Some(limits) = limits {
            println!();
            println!(
                "{}: LSL {}  USL {}",
                style(name).bold(),
                limits.lower.map_or_else(|| "-".to_string(), |v| v.to_string()),
                limits.upper.map_or_else(|| "-".to_string(), |v| v.to_string())
            );
        }
    }

    println!();
    if stack.contributors.is_empty() {
        println!("{}", style("No contributors").dim());
        return;
    }

    println!(
        "{} ({}):",
        style("Contributors").bold(),
        stack.contributors.len()
    );
    println!(
        "  {:<3} {:<12} {:<8} {:<24} {:<22} {}",
        style("#").bold(),
        style("ID").bold(),
        style("PLACE").bold(),
        style("LABEL").bold(),
        style("DISTRIBUTION").bold(),
        style("TRUNCATION").bold()
    );
    for (i, c) in stack.contributors.iter().enumerate() {
        let truncation = c.truncate.map_or_else(String::new, |t| {
            format!(
                "[{}, {}]",
                t.lower.map_or_else(|| "-inf".to_string(), |v| v.to_string()),
                t.upper.map_or_else(|| "+inf".to_string(), |v| v.to_string())
            )
        });
        println!(
            "  {:<3} {:<12} {:<8} {:<24} {:<22} {}",
            i + 1,
            style(format_short_id(&c.id)).cyan(),
            c.placement.describe(),
            truncate_str(&c.label, 24),
            truncate_str(&c.distribution.describe(), 22),
            truncation
        );
    }

    // Analytic preview from the chain snapshot, when it builds
    if let Ok(chain) = stack.to_chain(&Config::load().truncation_policy()) {
        if let Some(wc) = chain.worst_case_bounds() {
            println!();
            println!(
                "{}: {:.4} to {:.4} {}",
                style("Worst case").bold(),
                wc.min,
                wc.max,
                stack.units
            );
        }
        if let Some(rss) = chain.rss_estimate() {
            println!(
                "{}: mean {:.4}, σ {:.4} {}",
                style("RSS").bold(),
                rss.mean,
                rss.std_dev,
                stack.units
            );
        }
    }
}
