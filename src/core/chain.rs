//! Chain model - ordered contributors and their combination rule
//!
//! A linear chain sums signed draws. A radial (coaxial) chain turns every
//! draw into a 2D vector using the contributor's phase and sums the vectors;
//! the magnitude of the result is the eccentricity.

use nalgebra::Vector2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;

use crate::core::distribution::{Distribution, TruncationPolicy};
use crate::core::error::{ChainError, DistributionError};
use crate::core::identity::{EntityId, EntityPrefix};

/// How contributor draws are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    /// Signed scalar sum
    #[default]
    Linear,
    /// 2D vector sum (coaxial / eccentricity stacks)
    Radial,
}

impl ChainKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainKind::Linear => "linear",
            ChainKind::Radial => "radial",
        }
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of a linear contributor
///
/// A plain multiplier on each draw. A subtracted 5 mm part is either
/// `Normal(5, σ)` with `Negative`, or a signed length `Normal(-5, σ)` with
/// `Positive`; `Normal(-5, σ)` with `Negative` adds 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Adds to the stack
    #[default]
    Positive,
    /// Subtracts from the stack
    Negative,
}

impl Direction {
    /// Multiplier applied to every draw
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Positive => 1.0,
            Direction::Negative => -1.0,
        }
    }
}

/// Angular placement of a radial contributor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    /// Fixed direction, degrees counter-clockwise from +x
    Fixed { angle_deg: f64 },
    /// Uniformly random direction drawn per sample
    Random,
}

/// Where a contributor sits in its chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Linear(Direction),
    Radial(Phase),
}

impl Placement {
    pub fn kind(&self) -> ChainKind {
        match self {
            Placement::Linear(_) => ChainKind::Linear,
            Placement::Radial(_) => ChainKind::Radial,
        }
    }
}

/// One tolerance source in a chain
#[derive(Debug, Clone, PartialEq)]
pub struct Contributor {
    id: EntityId,
    label: String,
    description: Option<String>,
    distribution: Distribution,
    placement: Placement,
}

impl Contributor {
    /// Create a contributor with a fresh id and the default truncation policy
    ///
    /// Random-phase radial contributors are magnitudes, so their lower
    /// truncation bound is raised to 0.
    pub fn new(
        label: impl Into<String>,
        distribution: Distribution,
        placement: Placement,
    ) -> Result<Self, ChainError> {
        Self::with_id(
            EntityId::new(EntityPrefix::Ctr),
            label,
            distribution,
            placement,
            &TruncationPolicy::default(),
        )
    }

    /// Create a contributor with a known id (e.g. loaded from a stack file)
    ///
    /// `policy` applies when a random-phase distribution has to be
    /// re-truncated at 0.
    pub fn with_id(
        id: EntityId,
        label: impl Into<String>,
        distribution: Distribution,
        placement: Placement,
        policy: &TruncationPolicy,
    ) -> Result<Self, ChainError> {
        let label = label.into();
        let distribution = match placement {
            Placement::Radial(Phase::Random) => clamp_to_magnitude(distribution, policy)
                .map_err(|source| ChainError::Distribution {
                    label: label.clone(),
                    source,
                })?,
            _ => distribution,
        };
        Ok(Self {
            id,
            label,
            description: None,
            distribution,
            placement,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Draw `n` values, plus `n` phases (radians) for random-phase contributors
    pub fn draw<R: Rng>(&self, n: usize, rng: &mut R) -> Result<Draws, DistributionError> {
        let values = self.distribution.sample(n, rng)?;
        let phases = match self.placement {
            Placement::Radial(Phase::Random) => Some((0..n).map(|_| rng.random_range(0.0..TAU)).collect()),
            _ => None,
        };
        Ok(Draws { values, phases })
    }

    fn check(&self, kind: ChainKind) -> Result<(), ChainError> {
        if self.placement.kind() != kind {
            return Err(ChainError::PlacementMismatch {
                label: self.label.clone(),
                kind: self.placement.kind().as_str(),
                chain: kind.as_str(),
            });
        }
        if let Placement::Radial(Phase::Fixed { angle_deg }) = self.placement {
            if !angle_deg.is_finite() {
                return Err(ChainError::InvalidAngle {
                    label: self.label.clone(),
                    angle: angle_deg,
                });
            }
        }
        Ok(())
    }
}

fn clamp_to_magnitude(
    distribution: Distribution,
    policy: &TruncationPolicy,
) -> Result<Distribution, DistributionError> {
    let bounds = distribution.bounds();
    let floored = bounds.with_lower_floor(0.0);
    let already_non_negative = matches!(distribution.support().0, Some(lo) if lo >= 0.0);
    if floored == bounds || already_non_negative {
        return Ok(distribution);
    }
    distribution.with_bounds(floored, policy)
}

/// Per-contributor draws for one batch
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Draws {
    pub values: Vec<f64>,
    /// Per-sample phase in radians (random-phase radial contributors only)
    pub phases: Option<Vec<f64>>,
}

/// Unit direction of a radial term
#[derive(Clone, Copy)]
enum Heading<'a> {
    Fixed(f64, f64),
    /// Phase in radians per sample
    PerSample(&'a [f64]),
}

/// Composed outcomes for a batch or a whole run
#[derive(Debug, Clone, PartialEq)]
pub enum ComposedOutcome {
    Linear(Vec<f64>),
    Radial(Vec<Vector2<f64>>),
}

impl ComposedOutcome {
    pub fn empty(kind: ChainKind) -> Self {
        match kind {
            ChainKind::Linear => ComposedOutcome::Linear(Vec::new()),
            ChainKind::Radial => ComposedOutcome::Radial(Vec::new()),
        }
    }

    pub fn kind(&self) -> ChainKind {
        match self {
            ComposedOutcome::Linear(_) => ChainKind::Linear,
            ComposedOutcome::Radial(_) => ChainKind::Radial,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ComposedOutcome::Linear(v) => v.len(),
            ComposedOutcome::Radial(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append another outcome of the same kind
    pub fn append(&mut self, other: ComposedOutcome) {
        match (self, other) {
            (ComposedOutcome::Linear(a), ComposedOutcome::Linear(b)) => a.extend(b),
            (ComposedOutcome::Radial(a), ComposedOutcome::Radial(b)) => a.extend(b),
            _ => {}
        }
    }
}

/// Worst-case extent of a chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorstCase {
    pub min: f64,
    pub max: f64,
}

/// Analytic mean and root-sum-square spread of a linear chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RssEstimate {
    pub mean: f64,
    pub std_dev: f64,
}

/// An ordered chain of contributors
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chain {
    kind: ChainKind,
    contributors: Vec<Contributor>,
}

impl Chain {
    pub fn new(kind: ChainKind) -> Self {
        Self {
            kind,
            contributors: Vec::new(),
        }
    }

    pub fn kind(&self) -> ChainKind {
        self.kind
    }

    pub fn contributors(&self) -> &[Contributor] {
        &self.contributors
    }

    pub fn len(&self) -> usize {
        self.contributors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contributors.is_empty()
    }

    /// Append a contributor; its placement must match the chain kind
    pub fn add_contributor(&mut self, contributor: Contributor) -> Result<(), ChainError> {
        contributor.check(self.kind)?;
        self.contributors.push(contributor);
        Ok(())
    }

    /// Remove a contributor by id, returning it
    pub fn remove_contributor(&mut self, id: &EntityId) -> Result<Contributor, ChainError> {
        let pos = self
            .contributors
            .iter()
            .position(|c| c.id() == id)
            .ok_or_else(|| ChainError::UnknownContributor(id.to_string()))?;
        Ok(self.contributors.remove(pos))
    }

    /// Check that the chain can be run
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.contributors.is_empty() {
            return Err(ChainError::Empty);
        }
        self.contributors.iter().try_for_each(|c| c.check(self.kind))
    }

    /// Compose per-contributor draws (in chain order) into outcomes
    ///
    /// Each sample's terms are summed in value-sorted order, so the result
    /// does not depend on contributor order, bit for bit.
    pub fn combine(&self, draws: &[Draws]) -> Result<ComposedOutcome, ChainError> {
        self.validate()?;
        if draws.len() != self.contributors.len() {
            return Err(ChainError::DrawCountMismatch {
                expected: self.contributors.len(),
                actual: draws.len(),
            });
        }

        let n = draws[0].values.len();
        for (contrib, d) in self.contributors.iter().zip(draws) {
            let phase_len = d.phases.as_ref().map_or(n, Vec::len);
            if d.values.len() != n || phase_len != n {
                return Err(ChainError::DrawLengthMismatch {
                    label: contrib.label.clone(),
                    expected: n,
                    actual: d.values.len().min(phase_len),
                });
            }
        }

        Ok(match self.kind {
            ChainKind::Linear => ComposedOutcome::Linear(self.combine_linear(draws, n)),
            ChainKind::Radial => ComposedOutcome::Radial(self.combine_radial(draws, n)?),
        })
    }

    fn combine_linear(&self, draws: &[Draws], n: usize) -> Vec<f64> {
        let signs: Vec<f64> = self
            .contributors
            .iter()
            .map(|c| match c.placement {
                Placement::Linear(dir) => dir.sign(),
                Placement::Radial(_) => 1.0,
            })
            .collect();

        let mut terms = vec![0.0; draws.len()];
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            for (j, d) in draws.iter().enumerate() {
                terms[j] = signs[j] * d.values[i];
            }
            terms.sort_unstable_by(f64::total_cmp);
            out.push(terms.iter().sum());
        }
        out
    }

    fn combine_radial(&self, draws: &[Draws], n: usize) -> Result<Vec<Vector2<f64>>, ChainError> {
        let headings = self
            .contributors
            .iter()
            .zip(draws)
            .map(|(c, d)| match (c.placement, d.phases.as_deref()) {
                (Placement::Radial(Phase::Fixed { angle_deg }), _) => {
                    let theta = angle_deg.to_radians();
                    Ok(Heading::Fixed(theta.cos(), theta.sin()))
                }
                (_, Some(phases)) => Ok(Heading::PerSample(phases)),
                (_, None) => Err(ChainError::MissingPhases {
                    label: c.label.clone(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut terms = vec![(0.0, 0.0); draws.len()];
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            for (j, d) in draws.iter().enumerate() {
                let r = d.values[i];
                let (c, s) = match headings[j] {
                    Heading::Fixed(c, s) => (c, s),
                    Heading::PerSample(phases) => (phases[i].cos(), phases[i].sin()),
                };
                terms[j] = (r * c, r * s);
            }
            terms.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
            let (x, y) = terms
                .iter()
                .fold((0.0, 0.0), |(sx, sy), (tx, ty)| (sx + tx, sy + ty));
            out.push(Vector2::new(x, y));
        }
        Ok(out)
    }

    /// Extreme outcomes from the contributors' supports
    ///
    /// None when any contributor is unbounded. Radial chains give
    /// `[0, Σ max|r|]`.
    pub fn worst_case_bounds(&self) -> Option<WorstCase> {
        if self.contributors.is_empty() {
            return None;
        }
        let mut min = 0.0;
        let mut max = 0.0;
        for c in &self.contributors {
            let (Some(lo), Some(hi)) = c.distribution.support() else {
                return None;
            };
            match c.placement {
                Placement::Linear(Direction::Positive) => {
                    min += lo;
                    max += hi;
                }
                Placement::Linear(Direction::Negative) => {
                    min -= hi;
                    max -= lo;
                }
                Placement::Radial(_) => max += lo.abs().max(hi.abs()),
            }
        }
        Some(WorstCase { min, max })
    }

    /// Analytic mean and RSS spread (linear chains only)
    pub fn rss_estimate(&self) -> Option<RssEstimate> {
        if self.kind != ChainKind::Linear || self.contributors.is_empty() {
            return None;
        }
        let mut mean = 0.0;
        let mut variance = 0.0;
        for c in &self.contributors {
            let sign = match c.placement {
                Placement::Linear(dir) => dir.sign(),
                Placement::Radial(_) => 1.0,
            };
            mean += sign * c.distribution.mean();
            variance += c.distribution.std().powi(2);
        }
        Some(RssEstimate {
            mean,
            std_dev: variance.sqrt(),
        })
    }

    /// Share of total variance per contributor, in percent (chain order)
    ///
    /// Empty when the total variance is zero.
    pub fn variance_contributions(&self) -> Vec<f64> {
        let variances: Vec<f64> = self
            .contributors
            .iter()
            .map(|c| c.distribution.std().powi(2))
            .collect();
        let total: f64 = variances.iter().sum();
        if total > 0.0 {
            variances.iter().map(|v| v / total * 100.0).collect()
        } else {
            Vec::new()
        }
    }
}
