//! `tolstack new` command - Create a stack file

use clap::ValueEnum;
use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{format_short_id, save_stack};
use crate::cli::output::{effective_format, print_structured};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::analyzer::SpecLimits;
use crate::core::chain::ChainKind;
use crate::core::Config;
use crate::entities::stack::StackDefinition;

/// Chain kind (CLI enum)
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum KindArg {
    /// Signed scalar sum of contributors
    #[default]
    Linear,
    /// 2D vector sum, reported as magnitude (e.g. concentricity)
    Radial,
}

impl From<KindArg> for ChainKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Linear => ChainKind::Linear,
            KindArg::Radial => ChainKind::Radial,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Stack file to create
    pub file: PathBuf,

    /// Title
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Chain kind
    #[arg(long, short = 'k', default_value = "linear")]
    pub kind: KindArg,

    /// Description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Units label used in reports
    #[arg(long, default_value = "mm")]
    pub units: String,

    /// Lower spec limit
    #[arg(long, allow_negative_numbers = true)]
    pub lsl: Option<f64>,

    /// Upper spec limit
    #[arg(long, allow_negative_numbers = true)]
    pub usl: Option<f64>,

    /// Lower custom limit (reported alongside the spec limits)
    #[arg(long, allow_negative_numbers = true)]
    pub custom_lsl: Option<f64>,

    /// Upper custom limit
    #[arg(long, allow_negative_numbers = true)]
    pub custom_usl: Option<f64>,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Build limits from a pair of optional flags
pub(crate) fn limits_from_flags(
    lower: Option<f64>,
    upper: Option<f64>,
) -> Result<Option<SpecLimits>> {
    if lower.is_none() && upper.is_none() {
        return Ok(None);
    }
    SpecLimits::new(lower, upper)
        .map(Some)
        .map_err(|e| miette::miette!("{}", e))
}

pub fn run(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    if args.file.exists() && !args.force {
        return Err(miette::miette!(
            "{} already exists (use --force to overwrite)",
            args.file.display()
        ));
    }

    let config = Config::load();
    let title = args.title.unwrap_or_else(|| {
        args.file
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.trim_end_matches(".stack").to_string())
            .unwrap_or_else(|| "Untitled stack".to_string())
    });

    let mut stack = StackDefinition::new(title, args.kind.into(), config.author());
    stack.description = args.description;
    stack.units = args.units;
    stack.spec_limits = limits_from_flags(args.lsl, args.usl)?;
    stack.custom_limits = limits_from_flags(args.custom_lsl, args.custom_usl)?;

    save_stack(&stack, &args.file)?;
    tracing::debug!(path = %args.file.display(), id = %stack.id, "created stack");

    match effective_format(global.format, false) {
        OutputFormat::Text | OutputFormat::Auto => {
            if global.quiet {
                return Ok(());
            }
            println!(
                "{} Created {} stack {}",
                style("✓").green(),
                stack.kind,
                style(format_short_id(&stack.id)).cyan()
            );
            println!("   {}", style(args.file.display()).dim());
            println!("   Title: {}", style(&stack.title).yellow());
            if let Some(ref limits) = stack.spec_limits {
                println!(
                    "   Spec limits: LSL {} / USL {}",
                    fmt_limit(limits.lower),
                    fmt_limit(limits.upper)
                );
            }
        }
        format => print_structured(&stack, format)?,
    }

    Ok(())
}

fn fmt_limit(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
