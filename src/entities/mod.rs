//! Persisted entity definitions

pub mod stack;

pub use stack::{ContributorDef, DistributionDef, PlacementDef, StackDefinition, StackFileError};
