//! Error taxonomy for the simulation core
//!
//! Construction errors (distributions, chains) surface before any sampling
//! starts. Run errors abort the run and the partial population is dropped.

use thiserror::Error;

/// Invalid distribution parameters or an unusable truncation window
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistributionError {
    #[error("{name} must be a finite number (got {value})")]
    NonFinite { name: &'static str, value: f64 },

    #[error("scale must be > 0 (got {0})")]
    NonPositiveScale(f64),

    #[error("uniform range is empty: lower {lower} must be < upper {upper}")]
    EmptyRange { lower: f64, upper: f64 },

    #[error("uniform range [{lower}, {upper}] is too wide to sample")]
    RangeTooWide { lower: f64, upper: f64 },

    #[error("truncation bounds are inverted: lower {lower} must be < upper {upper}")]
    InvertedBounds { lower: f64, upper: f64 },

    #[error("truncation window [{lower}, {upper}] encloses negligible probability mass ({mass:.3e} < {epsilon:.1e})")]
    NegligibleMass {
        lower: f64,
        upper: f64,
        mass: f64,
        epsilon: f64,
    },

    #[error("truncated sampling gave up after {rounds} rejection rounds ({accepted}/{requested} samples accepted)")]
    RejectionLimit {
        rounds: u32,
        accepted: usize,
        requested: usize,
    },
}

/// Structural problems with a chain
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    #[error("chain has no contributors")]
    Empty,

    #[error("contributor '{label}' has an invalid angle ({angle})")]
    InvalidAngle { label: String, angle: f64 },

    #[error("no contributor matches '{0}'")]
    UnknownContributor(String),

    #[error("contributor '{label}' uses a {kind} placement in a {chain} chain")]
    PlacementMismatch {
        label: String,
        kind: &'static str,
        chain: &'static str,
    },

    #[error("expected draws for {expected} contributors, got {actual}")]
    DrawCountMismatch { expected: usize, actual: usize },

    #[error("contributor '{label}' supplied {actual} draws, expected {expected}")]
    DrawLengthMismatch {
        label: String,
        expected: usize,
        actual: usize,
    },

    #[error("random-phase contributor '{label}' supplied no phases")]
    MissingPhases { label: String },

    #[error("contributor '{label}': {source}")]
    Distribution {
        label: String,
        #[source]
        source: DistributionError,
    },
}

/// Invalid run or analysis parameters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("sample count must be a positive integer")]
    ZeroSamples,

    #[error("batch size must be a positive integer")]
    ZeroBatchSize,

    #[error("percentile must be within [0, 100] (got {0})")]
    InvalidPercentile(f64),

    #[error("coverage must be within (0, 100] (got {0})")]
    InvalidCoverage(f64),

    #[error("histogram needs at least one bin")]
    ZeroBins,

    #[error("histogram bin count {requested} exceeds the limit of {max}")]
    TooManyBins { requested: usize, max: usize },

    #[error("limits are inverted: lower {lower} must be < upper {upper}")]
    InvertedLimits { lower: f64, upper: f64 },

    #[error("limit must be a finite number (got {0})")]
    NonFiniteLimit(f64),

    #[error("limits must specify at least one of lower/upper")]
    EmptyLimits,

    #[error("population is empty")]
    EmptyPopulation,
}

/// Anything that can stop a simulation run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Distribution(#[from] DistributionError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("simulation cancelled")]
    Cancelled,
}

impl SimulationError {
    /// Short category name, used in logs and machine-readable output
    pub fn kind(&self) -> &'static str {
        match self {
            SimulationError::Distribution(_) => "distribution",
            SimulationError::Chain(_) => "chain",
            SimulationError::Validation(_) => "validation",
            SimulationError::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DistributionError::NonPositiveScale(-1.0);
        assert_eq!(err.to_string(), "scale must be > 0 (got -1)");

        let err = ChainError::Distribution {
            label: "Housing".to_string(),
            source: DistributionError::NonPositiveScale(0.0),
        };
        assert!(err.to_string().starts_with("contributor 'Housing':"));
    }

    #[test]
    fn test_simulation_error_kind() {
        let err: SimulationError = ValidationError::ZeroSamples.into();
        assert_eq!(err.kind(), "validation");
        assert_eq!(SimulationError::from(ChainError::Empty).kind(), "chain");
        assert_eq!(SimulationError::Cancelled.kind(), "cancelled");
    }
}
