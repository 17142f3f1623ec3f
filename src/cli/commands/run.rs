//! `tolstack run` command - Simulate a stack and report statistics

use clap::ValueEnum;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cli::commands::new::limits_from_flags;
use crate::cli::helpers::{fmt_index, fmt_value, load_stack};
use crate::cli::output::{effective_format, print_structured};
use crate::cli::viz;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::analyzer::{
    self, BinRule, Capability, Coverage, CoverageInterval, EcdfPoint, Histogram, ResultSummary,
    SummaryRequest,
};
use crate::core::chain::{Chain, ChainKind, RssEstimate};
use crate::core::engine::{Engine, SamplePopulation};
use crate::core::identity::EntityId;
use crate::core::Config;
use crate::entities::stack::StackDefinition;

/// ECDF steps kept in reports
const ECDF_POINTS: usize = 200;

/// Tails left out of coverage intervals (CLI enum)
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum CoverageArg {
    /// From the minimum up
    Lower,
    /// From the maximum down
    Upper,
    /// Centered, equal tails
    #[default]
    Symmetric,
}

impl From<CoverageArg> for Coverage {
    fn from(arg: CoverageArg) -> Self {
        match arg {
            CoverageArg::Lower => Coverage::Lower,
            CoverageArg::Upper => Coverage::Upper,
            CoverageArg::Symmetric => Coverage::Symmetric,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Stack file
    pub file: PathBuf,

    /// Number of Monte Carlo samples
    #[arg(long, short = 'n')]
    pub samples: Option<usize>,

    /// Seed for a reproducible run
    #[arg(long, short = 's')]
    pub seed: Option<u64>,

    /// Percentiles to report, comma separated
    #[arg(long, value_delimiter = ',')]
    pub percentiles: Option<Vec<f64>>,

    /// Fixed histogram bin count (Freedman-Diaconis when unset)
    #[arg(long)]
    pub bins: Option<usize>,

    /// Coverage percentages to report, comma separated
    #[arg(long, value_delimiter = ',', default_value = "95,99.73")]
    pub coverage: Vec<f64>,

    /// Tails left out of the coverage intervals
    #[arg(long, default_value = "symmetric")]
    pub coverage_mode: CoverageArg,

    /// Lower custom limit (overrides the stack file)
    #[arg(long, allow_negative_numbers = true)]
    pub custom_lsl: Option<f64>,

    /// Upper custom limit (overrides the stack file)
    #[arg(long, allow_negative_numbers = true)]
    pub custom_usl: Option<f64>,

    /// Write the raw samples to a CSV file
    #[arg(long, short = 'e')]
    pub export: Option<PathBuf>,

    /// Draw the histogram (and radial scatter) in the terminal
    #[arg(long, short = 'p')]
    pub plot: bool,

    /// Worker threads
    #[arg(long, short = 'j')]
    pub workers: Option<usize>,
}

/// Share of the analytic variance owed to one contributor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sensitivity {
    pub id: EntityId,
    pub label: String,
    pub percent: f64,
}

/// Everything a run reports, in serializable form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub stack: EntityId,
    pub title: String,
    pub kind: ChainKind,
    pub units: String,
    pub seed: u64,
    pub samples: usize,
    pub summary: ResultSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rss: Option<RssEstimate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sensitivity: Vec<Sensitivity>,
    pub coverage: Vec<CoverageInterval>,
    pub histogram: Histogram,
    pub ecdf: Vec<EcdfPoint>,
}

impl RunReport {
    pub fn build(
        stack: &StackDefinition,
        chain: &Chain,
        population: &SamplePopulation,
        request: &SummaryRequest,
        rule: BinRule,
        coverage: &[f64],
        coverage_mode: Coverage,
    ) -> Result<Self> {
        let values = population.values();
        let summary = analyzer::summarize_values(&values, population.worst_case, request)
            .map_err(|e| miette::miette!("{}", e))?;
        let histogram = analyzer::histogram(&values, rule).map_err(|e| miette::miette!("{}", e))?;
        let ecdf = analyzer::ecdf(&values, ECDF_POINTS).map_err(|e| miette::miette!("{}", e))?;
        let coverage = coverage
            .iter()
            .map(|&pct| analyzer::coverage_interval(&values, pct, coverage_mode))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| miette::miette!("{}", e))?;

        let sensitivity = chain
            .contributors()
            .iter()
            .zip(chain.variance_contributions())
            .map(|(c, percent)| Sensitivity {
                id: c.id().clone(),
                label: c.label().to_string(),
                percent,
            })
            .collect();

        Ok(Self {
            stack: stack.id.clone(),
            title: stack.title.clone(),
            kind: population.kind,
            units: stack.units.clone(),
            seed: population.seed,
            samples: population.len(),
            summary,
            rss: chain.rss_estimate(),
            sensitivity,
            coverage,
            histogram,
            ecdf,
        })
    }
}

pub fn run(args: RunArgs, global: &GlobalOpts) -> Result<()> {
    let stack = load_stack(&args.file)?;
    let config = Config::load();

    // CLI flags take precedence over the config layers
    let samples = args.samples.unwrap_or_else(|| config.samples());
    let seed = args.seed.or(config.seed);
    let rule = args.bins.map_or_else(|| config.bin_rule(), BinRule::Fixed);
    let mut run_config = config.run_config();
    if let Some(workers) = args.workers {
        run_config.workers = workers;
    }

    let chain = stack
        .validate(&config.truncation_policy())
        .map_err(|e| miette::miette!("{}", e))?;

    let custom_limits = match limits_from_flags(args.custom_lsl, args.custom_usl)? {
        Some(limits) => Some(limits),
        None => stack.custom_limits,
    };
    let request = SummaryRequest {
        percentiles: args.percentiles.clone().unwrap_or_else(|| config.percentiles()),
        spec_limits: stack.spec_limits,
        custom_limits,
    };

    let population = Engine::new(run_config)
        .run(&chain, samples, seed)
        .map_err(|e| miette::miette!("{}", e))?;

    if let Some(ref path) = args.export {
        export_csv(&population, path)?;
    }

    let report = RunReport::build(
        &stack,
        &chain,
        &population,
        &request,
        rule,
        &args.coverage,
        args.coverage_mode.into(),
    )?;

    match effective_format(global.format, true) {
        OutputFormat::Text | OutputFormat::Auto => {
            print_report(&report, &stack, global.quiet);
            if let Some(ref path) = args.export {
                println!(
                    "\n{} Wrote {} samples to {}",
                    style("✓").green(),
                    population.len(),
                    style(path.display()).dim()
                );
            }
            if args.plot {
                print_plots(&report, &stack, &population);
            }
        }
        format => print_structured(&report, format)?,
    }

    Ok(())
}

/// Write one row per sample; radial rows carry x, y, magnitude and angle
fn export_csv(population: &SamplePopulation, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).into_diagnostic()?;
    match (population.points(), population.angles_deg()) {
        (Some(points), Some(angles)) => {
            writer
                .write_record(["index", "x", "y", "magnitude", "angle_deg"])
                .into_diagnostic()?;
            for (i, (p, angle)) in points.iter().zip(angles).enumerate() {
                writer
                    .write_record([
                        i.to_string(),
                        p.x.to_string(),
                        p.y.to_string(),
                        p.norm().to_string(),
                        angle.to_string(),
                    ])
                    .into_diagnostic()?;
            }
        }
        _ => {
            writer.write_record(["index", "value"]).into_diagnostic()?;
            for (i, v) in population.values().iter().enumerate() {
                writer
                    .write_record([i.to_string(), v.to_string()])
                    .into_diagnostic()?;
            }
        }
    }
    writer.flush().into_diagnostic()?;
    tracing::debug!(path = %path.display(), rows = population.len(), "exported samples");
    Ok(())
}

fn print_report(report: &RunReport, stack: &StackDefinition, quiet: bool) {
    let summary = &report.summary;
    let units = &report.units;

    if !quiet {
        println!(
            "{} Simulated {} ({} stack, {} samples, seed {})",
            style("✓").green(),
            style(&report.title).yellow(),
            report.kind,
            report.samples,
            style(report.seed).cyan()
        );
    }

    println!();
    match report.kind {
        ChainKind::Linear => println!("   {}:", style("Monte Carlo").bold()),
        ChainKind::Radial => println!("   {} (eccentricity):", style("Monte Carlo").bold()),
    }
    println!("     Mean: {} {}", fmt_value(summary.mean), units);
    println!("     Std Dev: {} {}", fmt_value(summary.std_dev), units);
    println!("     Median: {} {}", fmt_value(summary.median), units);
    println!(
        "     Range: {} to {} {}",
        fmt_value(summary.min),
        fmt_value(summary.max),
        units
    );

    if !summary.percentiles.is_empty() {
        println!();
        println!("   {}:", style("Percentiles").bold());
        for pv in &summary.percentiles {
            println!("     {:>8}%: {}", pv.percentile, fmt_value(pv.value));
        }
    }

    if !report.coverage.is_empty() {
        println!();
        println!("   {}:", style("Coverage").bold());
        for ci in &report.coverage {
            println!(
                "     {:>6}%: {} to {}",
                ci.percent,
                fmt_value(ci.lower),
                fmt_value(ci.upper)
            );
        }
    }

    for (name, capability) in [("Spec Limits", &summary.spec), ("Custom Limits", &summary.custom)] {
        if let Some(capability) = capability {
            print_capability(name, capability);
        }
    }

    if let Some(ref rss) = report.rss {
        println!();
        println!("   {} Estimate:", style("RSS").bold());
        println!("     Mean: {} {}", fmt_value(rss.mean), units);
        println!("     ±3σ: {} {}", fmt_value(3.0 * rss.std_dev), units);
    }

    if let Some(ref wc) = summary.worst_case {
        println!();
        println!("   {}:", style("Worst-Case").bold());
        let two_sided = stack
            .spec_limits
            .and_then(|l| l.lower.zip(l.upper));
        match two_sided {
            Some((lsl, usl)) => println!("{}", indent(&viz::render_range_bar(wc, lsl, usl), "   ")),
            None => println!(
                "     Range: {} to {} {}",
                fmt_value(wc.min),
                fmt_value(wc.max),
                units
            ),
        }
    }

    if report.sensitivity.len() > 1 {
        println!();
        println!(
            "   {} (Variance Contribution):",
            style("Sensitivity").bold()
        );
        for s in &report.sensitivity {
            let pct = if s.percent >= 50.0 {
                style(format!("{:5.1}%", s.percent)).red().bold()
            } else if s.percent >= 25.0 {
                style(format!("{:5.1}%", s.percent)).yellow()
            } else {
                style(format!("{:5.1}%", s.percent)).dim()
            };
            let bar = "█".repeat(((s.percent / 100.0) * 30.0).round() as usize);
            println!("     {} {} {}", pct, bar, s.label);
        }
    }
}

fn print_capability(name: &str, capability: &Capability) {
    let ok = capability.percent_ok();
    let ok_styled = if capability.fraction_outside == 0.0 {
        style(format!("{:.4}%", ok)).green()
    } else if capability.ppm_outside < 2700.0 {
        style(format!("{:.4}%", ok)).yellow()
    } else {
        style(format!("{:.4}%", ok)).red()
    };

    println!();
    println!(
        "   {} (LSL {}, USL {}):",
        style(name).bold(),
        capability.limits.lower.map_or_else(|| "-".to_string(), fmt_value),
        capability.limits.upper.map_or_else(|| "-".to_string(), fmt_value)
    );
    println!(
        "     Capability: Cp={}, Cpk={}",
        fmt_index(capability.cp),
        fmt_index(capability.cpk)
    );
    println!("     Within limits: {}", ok_styled);
    println!(
        "     Below: {:.4}%  Above: {:.4}%  ({:.0} ppm outside)",
        capability.fraction_below * 100.0,
        capability.fraction_above * 100.0,
        capability.ppm_outside
    );
}

fn print_plots(report: &RunReport, stack: &StackDefinition, population: &SamplePopulation) {
    println!();
    println!("   {}:", style("Histogram").bold());
    println!(
        "{}",
        indent(
            &viz::render_histogram(
                &report.histogram,
                stack.spec_limits.as_ref(),
                viz::HISTOGRAM_WIDTH,
                viz::HISTOGRAM_HEIGHT
            ),
            "   "
        )
    );

    if let Some(points) = population.points() {
        let radius = stack.spec_limits.and_then(|l| l.upper);
        println!();
        println!("   {}:", style("Radial Outcomes").bold());
        println!(
            "{}",
            indent(
                &viz::render_radial_scatter(points, radius, viz::SCATTER_SIZE),
                "   "
            )
        );
    }
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}
