//! tolstack: Monte Carlo tolerance stackup analysis
//!
//! Linear and radial (coaxial) dimension chains are described as plain YAML
//! stack files, simulated with a seeded batched Monte Carlo engine and
//! summarized with capability statistics.

pub mod cli;
pub mod core;
pub mod entities;
