//! Configuration management with layered hierarchy
//!
//! Later layers win: built-in defaults, the global user config
//! (`~/.config/tolstack/config.yaml`), `./.tolstack.yaml`, then
//! `TOLSTACK_*` environment variables. CLI flags override the result.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::analyzer::{BinRule, DEFAULT_PERCENTILES};
use crate::core::distribution::TruncationPolicy;
use crate::core::engine::RunConfig;

/// Default Monte Carlo sample count
pub const DEFAULT_SAMPLES: usize = 50_000;

/// Name of the per-directory config file
pub const LOCAL_CONFIG_FILE: &str = ".tolstack.yaml";

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Samples per run
    pub samples: Option<usize>,

    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,

    /// Percentiles to report
    pub percentiles: Option<Vec<f64>>,

    /// Fixed histogram bin count (Freedman-Diaconis when unset)
    pub histogram_bins: Option<usize>,

    /// Samples per engine batch
    pub batch_size: Option<usize>,

    /// Worker threads
    pub workers: Option<usize>,

    /// Minimum mass a truncation window must enclose
    pub truncation_epsilon: Option<f64>,

    /// Rejection rounds before truncated sampling fails
    pub max_rejection_rounds: Option<u32>,

    /// Default author for new stacks
    pub author: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let mut paths = Vec::new();
        if let Some(global) = Self::global_config_path() {
            paths.push(global);
        }
        paths.push(PathBuf::from(LOCAL_CONFIG_FILE));

        let mut config = Self::from_files(&paths);
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Merge the given files in order, skipping missing ones
    pub fn from_files(paths: &[PathBuf]) -> Self {
        let mut config = Config::default();
        for path in paths {
            if let Some(layer) = Self::read_layer(path) {
                config.merge(layer);
            }
        }
        config
    }

    fn read_layer(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read config file");
                return None;
            }
        };
        match serde_yml::from_str::<Config>(&contents) {
            Ok(layer) => {
                tracing::debug!(path = %path.display(), "loaded config layer");
                Some(layer)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config file");
                None
            }
        }
    }

    /// Apply `TOLSTACK_SAMPLES`, `TOLSTACK_SEED` and `TOLSTACK_AUTHOR`
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(samples) = var("TOLSTACK_SAMPLES") {
            match samples.trim().parse() {
                Ok(n) => self.samples = Some(n),
                Err(_) => tracing::warn!(value = %samples, "ignoring invalid TOLSTACK_SAMPLES"),
            }
        }
        if let Some(seed) = var("TOLSTACK_SEED") {
            match seed.trim().parse() {
                Ok(s) => self.seed = Some(s),
                Err(_) => tracing::warn!(value = %seed, "ignoring invalid TOLSTACK_SEED"),
            }
        }
        if let Some(author) = var("TOLSTACK_AUTHOR") {
            self.author = Some(author);
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "tolstack")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.samples.is_some() {
            self.samples = other.samples;
        }
        if other.seed.is_some() {
            self.seed = other.seed;
        }
        if other.percentiles.is_some() {
            self.percentiles = other.percentiles;
        }
        if other.histogram_bins.is_some() {
            self.histogram_bins = other.histogram_bins;
        }
        if other.batch_size.is_some() {
            self.batch_size = other.batch_size;
        }
        if other.workers.is_some() {
            self.workers = other.workers;
        }
        if other.truncation_epsilon.is_some() {
            self.truncation_epsilon = other.truncation_epsilon;
        }
        if other.max_rejection_rounds.is_some() {
            self.max_rejection_rounds = other.max_rejection_rounds;
        }
        if other.author.is_some() {
            self.author = other.author;
        }
    }

    pub fn samples(&self) -> usize {
        self.samples.unwrap_or(DEFAULT_SAMPLES)
    }

    pub fn percentiles(&self) -> Vec<f64> {
        self.percentiles
            .clone()
            .unwrap_or_else(|| DEFAULT_PERCENTILES.to_vec())
    }

    pub fn bin_rule(&self) -> BinRule {
        self.histogram_bins.map_or(BinRule::FreedmanDiaconis, BinRule::Fixed)
    }

    pub fn run_config(&self) -> RunConfig {
        let defaults = RunConfig::default();
        RunConfig {
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            workers: self.workers.unwrap_or(defaults.workers),
        }
    }

    pub fn truncation_policy(&self) -> TruncationPolicy {
        let defaults = TruncationPolicy::default();
        TruncationPolicy {
            epsilon: self.truncation_epsilon.unwrap_or(defaults.epsilon),
            max_rejection_rounds: self
                .max_rejection_rounds
                .unwrap_or(defaults.max_rejection_rounds),
        }
    }

    /// Get the author name, falling back to git config or username
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }
}
