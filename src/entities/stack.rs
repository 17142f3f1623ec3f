//! Stack entity - persisted definition of one tolerance chain
//!
//! The file format is an explicit, versioned YAML schema. It is converted
//! into a validated [`Chain`] snapshot with [`StackDefinition::to_chain`]
//! and never shares types with the in-memory model beyond simple enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::analyzer::SpecLimits;
use crate::core::chain::{Chain, ChainKind, Contributor, Direction, Phase, Placement};
use crate::core::distribution::{
    Bounds, Distribution, Normal, SkewedNormal, TruncationPolicy, Uniform,
};
use crate::core::error::{ChainError, DistributionError, ValidationError};
use crate::core::identity::{EntityId, EntityPrefix};

/// Schema version written by this build
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StackFileError {
    #[error("cannot access stack file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid stack file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },

    #[error("cannot serialize stack: {0}")]
    Serialize(#[source] serde_yml::Error),

    #[error("stack file has no schema_version")]
    MissingVersion,

    #[error("unsupported schema_version {found} (this build reads version {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("contributor '{label}': {source}")]
    Distribution {
        label: String,
        #[source]
        source: DistributionError,
    },

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Limits(#[from] ValidationError),

    #[error("no contributor matches '{0}' (use a CTR id, 1-based index or label)")]
    UnknownReference(String),
}

/// Distribution parameters as written in the stack file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DistributionDef {
    Normal {
        mean: f64,
        std: f64,
    },
    SkewNormal {
        location: f64,
        scale: f64,
        /// 0 = symmetric, > 0 skews right, < 0 skews left
        shape: f64,
    },
    Uniform {
        lower: f64,
        upper: f64,
    },
}

impl DistributionDef {
    /// Uniform over `nominal ± tolerance`
    pub fn uniform_centered(nominal: f64, tolerance: f64) -> Self {
        DistributionDef::Uniform {
            lower: nominal - tolerance.abs(),
            upper: nominal + tolerance.abs(),
        }
    }

    pub fn build(
        &self,
        bounds: Bounds,
        policy: &TruncationPolicy,
    ) -> Result<Distribution, DistributionError> {
        Ok(match *self {
            DistributionDef::Normal { mean, std } => {
                Normal::truncated(mean, std, bounds, policy)?.into()
            }
            DistributionDef::SkewNormal {
                location,
                scale,
                shape,
            } => SkewedNormal::truncated(location, scale, shape, bounds, policy)?.into(),
            DistributionDef::Uniform { lower, upper } => {
                Uniform::truncated(lower, upper, bounds, policy)?.into()
            }
        })
    }

    /// Compact notation, e.g. `N(10, 0.1)`
    pub fn describe(&self) -> String {
        match self {
            DistributionDef::Normal { mean, std } => format!("N({}, {})", mean, std),
            DistributionDef::SkewNormal {
                location,
                scale,
                shape,
            } => format!("SN({}, {}, {})", location, scale, shape),
            DistributionDef::Uniform { lower, upper } => format!("U({}, {})", lower, upper),
        }
    }
}

/// Optional truncation window
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TruncationDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

/// Contributor placement as written in the stack file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PlacementDef {
    /// Linear chain member
    Linear {
        #[serde(default)]
        direction: Direction,
    },
    /// Radial member at a fixed angle (degrees)
    Fixed { angle: f64 },
    /// Radial member with uniformly random phase
    Random,
}

impl PlacementDef {
    fn to_placement(self) -> Placement {
        match self {
            PlacementDef::Linear { direction } => Placement::Linear(direction),
            PlacementDef::Fixed { angle } => Placement::Radial(Phase::Fixed { angle_deg: angle }),
            PlacementDef::Random => Placement::Radial(Phase::Random),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            PlacementDef::Linear {
                direction: Direction::Positive,
            } => "+".to_string(),
            PlacementDef::Linear {
                direction: Direction::Negative,
            } => "-".to_string(),
            PlacementDef::Fixed { angle } => format!("@{}°", angle),
            PlacementDef::Random => "@random".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorDef {
    /// Unique identifier (CTR-...)
    pub id: EntityId,

    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub distribution: DistributionDef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncate: Option<TruncationDef>,

    pub placement: PlacementDef,
}

impl ContributorDef {
    pub fn new(label: impl Into<String>, distribution: DistributionDef, placement: PlacementDef) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Ctr),
            label: label.into(),
            description: None,
            distribution,
            truncate: None,
            placement,
        }
    }

    fn bounds(&self) -> Bounds {
        let t = self.truncate.unwrap_or_default();
        let bounds = Bounds {
            lower: t.lower,
            upper: t.upper,
        };
        // Random-phase members are magnitudes
        if self.placement == PlacementDef::Random {
            bounds.with_lower_floor(0.0)
        } else {
            bounds
        }
    }

    /// Build the in-memory contributor
    pub fn to_contributor(&self, policy: &TruncationPolicy) -> Result<Contributor, StackFileError> {
        let distribution = self
            .distribution
            .build(self.bounds(), policy)
            .map_err(|source| StackFileError::Distribution {
                label: self.label.clone(),
                source,
            })?;
        let contributor = Contributor::with_id(
            self.id.clone(),
            self.label.clone(),
            distribution,
            self.placement.to_placement(),
            policy,
        )?;
        Ok(match self.description {
            Some(ref d) => contributor.with_description(d.clone()),
            None => contributor,
        })
    }
}

/// Persisted stack definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackDefinition {
    pub schema_version: u32,

    /// Unique identifier (STK-...)
    pub id: EntityId,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub kind: ChainKind,

    #[serde(default = "default_units")]
    pub units: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_limits: Option<SpecLimits>,

    /// Secondary limits reported alongside the spec limits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_limits: Option<SpecLimits>,

    #[serde(default)]
    pub contributors: Vec<ContributorDef>,

    pub created: DateTime<Utc>,

    pub author: String,

    /// Revision counter, bumped on every edit
    #[serde(default = "default_revision")]
    pub revision: u32,
}

fn default_units() -> String {
    "mm".to_string()
}

fn default_revision() -> u32 {
    1
}

#[derive(Deserialize)]
struct VersionProbe {
    schema_version: Option<u32>,
}

impl StackDefinition {
    pub fn new(title: impl Into<String>, kind: ChainKind, author: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            id: EntityId::new(EntityPrefix::Stk),
            title: title.into(),
            description: None,
            kind,
            units: default_units(),
            spec_limits: None,
            custom_limits: None,
            contributors: Vec::new(),
            created: Utc::now(),
            author: author.into(),
            revision: 1,
        }
    }

    /// Parse a stack file, rejecting unknown schema versions
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, StackFileError> {
        let yaml_err = |source| StackFileError::Yaml {
            path: path.to_path_buf(),
            source,
        };
        let probe: VersionProbe = serde_yml::from_str(content).map_err(yaml_err)?;
        match probe.schema_version {
            None => return Err(StackFileError::MissingVersion),
            Some(SCHEMA_VERSION) => {}
            Some(found) => {
                return Err(StackFileError::UnsupportedVersion {
                    found,
                    supported: SCHEMA_VERSION,
                })
            }
        }
        serde_yml::from_str(content).map_err(yaml_err)
    }

    pub fn load(path: &Path) -> Result<Self, StackFileError> {
        let content = fs::read_to_string(path).map_err(|source| StackFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content, path)
    }

    pub fn to_yaml(&self) -> Result<String, StackFileError> {
        serde_yml::to_string(self).map_err(StackFileError::Serialize)
    }

    pub fn save(&self, path: &Path) -> Result<(), StackFileError> {
        let yaml = self.to_yaml()?;
        fs::write(path, yaml).map_err(|source| StackFileError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn add_contributor(&mut self, contributor: ContributorDef) {
        self.contributors.push(contributor);
        self.revision += 1;
    }

    /// Find a contributor by CTR id (full or short form), 1-based index or label
    pub fn resolve(&self, reference: &str) -> Option<usize> {
        let reference = reference.trim();
        if let Ok(id) = EntityId::parse(reference) {
            return self.contributors.iter().position(|c| c.id == id);
        }
        if let Some(pos) = self
            .contributors
            .iter()
            .position(|c| c.id.short().eq_ignore_ascii_case(reference))
        {
            return Some(pos);
        }
        if let Ok(index) = reference.parse::<usize>() {
            return (1..=self.contributors.len())
                .contains(&index)
                .then(|| index - 1);
        }
        self.contributors
            .iter()
            .position(|c| c.label.eq_ignore_ascii_case(reference))
    }

    pub fn remove_contributor(&mut self, reference: &str) -> Result<ContributorDef, StackFileError> {
        let index = self
            .resolve(reference)
            .ok_or_else(|| StackFileError::UnknownReference(reference.to_string()))?;
        self.revision += 1;
        Ok(self.contributors.remove(index))
    }

    /// Build a validated chain snapshot
    pub fn to_chain(&self, policy: &TruncationPolicy) -> Result<Chain, StackFileError> {
        let mut chain = Chain::new(self.kind);
        for def in &self.contributors {
            chain.add_contributor(def.to_contributor(policy)?)?;
        }
        Ok(chain)
    }

    /// Check that the stack can be simulated
    pub fn validate(&self, policy: &TruncationPolicy) -> Result<Chain, StackFileError> {
        for limits in [&self.spec_limits, &self.custom_limits].into_iter().flatten() {
            limits.validate()?;
        }
        let chain = self.to_chain(policy)?;
        chain.validate()?;
        Ok(chain)
    }
}
