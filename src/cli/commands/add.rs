//! `tolstack add` command - Add a contributor to a stack
//!
//! Distributions can be given by their parameters (`--mean/--std`,
//! `--min/--max`) or as a nominal with a symmetric tolerance. For the
//! normal family the tolerance is taken as ±3σ.

use clap::ValueEnum;
use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{format_short_id, load_stack, save_stack};
use crate::cli::output::{effective_format, print_structured};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::chain::{ChainKind, Direction};
use crate::core::Config;
use crate::entities::stack::{ContributorDef, DistributionDef, PlacementDef, TruncationDef};

/// Standard deviations spanned by a `--tol` band for normal distributions
pub const TOLERANCE_SIGMAS: f64 = 3.0;

/// Distribution family (CLI enum)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DistArg {
    #[default]
    Normal,
    SkewNormal,
    Uniform,
}

/// Linear direction (CLI enum)
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum DirectionArg {
    #[default]
    Positive,
    Negative,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Positive => Direction::Positive,
            DirectionArg::Negative => Direction::Negative,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Stack file
    pub file: PathBuf,

    /// Contributor label
    #[arg(long, short = 'l')]
    pub label: String,

    /// Distribution family
    #[arg(long, default_value = "normal")]
    pub dist: DistArg,

    /// Mean (normal) or location (skew-normal)
    #[arg(long, allow_negative_numbers = true)]
    pub mean: Option<f64>,

    /// Standard deviation (normal) or scale (skew-normal)
    #[arg(long, allow_negative_numbers = true)]
    pub std: Option<f64>,

    /// Skew-normal shape (0 = symmetric, > 0 skews right)
    #[arg(long, allow_negative_numbers = true, default_value_t = 0.0)]
    pub skew: f64,

    /// Nominal value, used with --tol
    #[arg(long, allow_negative_numbers = true, requires = "tol")]
    pub nominal: Option<f64>,

    /// Symmetric tolerance (±3σ for normal families, full range for uniform)
    #[arg(long, allow_negative_numbers = true, requires = "nominal")]
    pub tol: Option<f64>,

    /// Uniform lower bound
    #[arg(long, allow_negative_numbers = true, requires = "max")]
    pub min: Option<f64>,

    /// Uniform upper bound
    #[arg(long, allow_negative_numbers = true, requires = "min")]
    pub max: Option<f64>,

    /// Truncate the distribution below this value
    #[arg(long, allow_negative_numbers = true)]
    pub lower: Option<f64>,

    /// Truncate the distribution above this value
    #[arg(long, allow_negative_numbers = true)]
    pub upper: Option<f64>,

    /// Direction in a linear stack
    #[arg(long)]
    pub direction: Option<DirectionArg>,

    /// Fixed angle in degrees (radial stacks)
    #[arg(long, allow_negative_numbers = true, conflicts_with = "random_phase")]
    pub angle: Option<f64>,

    /// Uniformly random phase (radial stacks, the default there)
    #[arg(long)]
    pub random_phase: bool,

    /// Description
    #[arg(long, short = 'd')]
    pub description: Option<String>,
}

/// Build the distribution definition from the flags given
pub(crate) fn distribution_from_args(args: &AddArgs) -> Result<DistributionDef> {
    let nominal_tol = args.nominal.zip(args.tol);
    match args.dist {
        DistArg::Normal | DistArg::SkewNormal => {
            let (mean, std) = match (args.mean, args.std, nominal_tol) {
                (Some(mean), Some(std), None) => (mean, std),
                (None, None, Some((nominal, tol))) => (nominal, tol.abs() / TOLERANCE_SIGMAS),
                _ => {
                    return Err(miette::miette!(
                        "{} needs either --mean and --std, or --nominal and --tol",
                        dist_name(args.dist)
                    ))
                }
            };
            if args.min.is_some() {
                return Err(miette::miette!("--min/--max only apply to uniform distributions"));
            }
            Ok(match args.dist {
                DistArg::SkewNormal => DistributionDef::SkewNormal {
                    location: mean,
                    scale: std,
                    shape: args.skew,
                },
                _ => DistributionDef::Normal { mean, std },
            })
        }
        DistArg::Uniform => match (args.min.zip(args.max), nominal_tol) {
            (Some((lower, upper)), None) => Ok(DistributionDef::Uniform { lower, upper }),
            (None, Some((nominal, tol))) => Ok(DistributionDef::uniform_centered(nominal, tol)),
            _ => Err(miette::miette!(
                "uniform needs either --min and --max, or --nominal and --tol"
            )),
        },
    }
}

fn dist_name(dist: DistArg) -> &'static str {
    match dist {
        DistArg::Normal => "normal",
        DistArg::SkewNormal => "skew-normal",
        DistArg::Uniform => "uniform",
    }
}

/// Pick the placement that fits the stack kind
pub(crate) fn placement_from_args(args: &AddArgs, kind: ChainKind) -> Result<PlacementDef> {
    match kind {
        ChainKind::Linear => {
            if args.angle.is_some() || args.random_phase {
                return Err(miette::miette!(
                    "--angle/--random-phase only apply to radial stacks"
                ));
            }
            Ok(PlacementDef::Linear {
                direction: args.direction.unwrap_or_default().into(),
            })
        }
        ChainKind::Radial => {
            if args.direction.is_some() {
                return Err(miette::miette!("--direction only applies to linear stacks"));
            }
            Ok(match args.angle {
                Some(angle) => PlacementDef::Fixed { angle },
                None => PlacementDef::Random,
            })
        }
    }
}

pub fn run(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let mut stack = load_stack(&args.file)?;

    let mut def = ContributorDef::new(
        args.label.clone(),
        distribution_from_args(&args)?,
        placement_from_args(&args, stack.kind)?,
    );
    def.description = args.description.clone();
    if args.lower.is_some() || args.upper.is_some() {
        def.truncate = Some(TruncationDef {
            lower: args.lower,
            upper: args.upper,
        });
    }

    // Reject anything that cannot be simulated before touching the file
    let policy = Config::load().truncation_policy();
    def.to_contributor(&policy)
        .map_err(|e| miette::miette!("{}", e))?;

    stack.add_contributor(def.clone());
    save_stack(&stack, &args.file)?;
    tracing::debug!(id = %def.id, revision = stack.revision, "added contributor");

    match effective_format(global.format, false) {
        OutputFormat::Text | OutputFormat::Auto => {
            if !global.quiet {
                println!(
                    "{} Added {} {} {} {}",
                    style("✓").green(),
                    style(format_short_id(&def.id)).cyan(),
                    def.placement.describe(),
                    style(&def.label).yellow(),
                    def.distribution.describe()
                );
                println!(
                    "   {} now has {} contributor(s)",
                    style(args.file.display()).dim(),
                    stack.contributors.len()
                );
            }
        }
        format => print_structured(&def, format)?,
    }

    Ok(())
}
