//! Core module - distributions, chains, the Monte Carlo engine and analysis

pub mod analyzer;
pub mod chain;
pub mod config;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod identity;

pub use analyzer::{
    coverage_interval, ecdf, histogram, percentile, summarize, summarize_values, BinRule,
    Capability, Coverage, CoverageInterval, EcdfPoint, Histogram, ResultSummary, SpecLimits,
    SummaryRequest,
};
pub use chain::{
    Chain, ChainKind, ComposedOutcome, Contributor, Direction, Draws, Phase, Placement,
    RssEstimate, WorstCase,
};
pub use config::Config;
pub use distribution::{Bounds, Distribution, Normal, SkewedNormal, TruncationPolicy, Uniform};
pub use engine::{CancelToken, Engine, RunConfig, SamplePopulation};
pub use error::{ChainError, DistributionError, SimulationError, ValidationError};
pub use identity::{EntityId, EntityPrefix, IdParseError};
