//! Monte Carlo engine - batched, seeded, cancellable sampling
//!
//! A run of `n` samples is cut into fixed-size batches. Batch `k` owns an
//! RNG seeded from `seed + k * GOLDEN`, so the population depends only on
//! (chain, n, seed, batch size) and never on how batches are spread over
//! worker threads.

use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::core::chain::{Chain, ChainKind, ComposedOutcome, WorstCase};
use crate::core::error::{ChainError, SimulationError, ValidationError};

/// Default number of samples per batch
pub const DEFAULT_BATCH_SIZE: usize = 16_384;

/// Stream spacing for per-batch seeds (2^64 / φ)
const GOLDEN: u64 = 0x9E37_79B9_7F4A_7C15;

/// Seed of the RNG owned by batch `batch`
pub fn batch_seed(seed: u64, batch: u64) -> u64 {
    seed.wrapping_add(batch.wrapping_mul(GOLDEN))
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZero::get)
        .unwrap_or(4)
}

/// Engine tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Samples per batch (affects the exact population drawn for a seed)
    pub batch_size: usize,
    /// Worker threads (does not affect results)
    pub workers: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            workers: default_workers(),
        }
    }
}

/// Shared flag used to abort a run between batches
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Outcomes of one simulation run
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePopulation {
    /// Seed the run used (drawn from the OS when none was given)
    pub seed: u64,
    pub batch_size: usize,
    pub kind: ChainKind,
    pub outcome: ComposedOutcome,
    /// Extremes implied by the contributors' supports
    pub worst_case: Option<WorstCase>,
}

impl SamplePopulation {
    pub fn len(&self) -> usize {
        self.outcome.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcome.is_empty()
    }

    /// Values statistics are computed on: the linear result, or the
    /// magnitude (eccentricity) of radial outcomes
    pub fn values(&self) -> Cow<'_, [f64]> {
        match &self.outcome {
            ComposedOutcome::Linear(v) => Cow::Borrowed(v),
            ComposedOutcome::Radial(points) => Cow::Owned(points.iter().map(|p| p.norm()).collect()),
        }
    }

    /// Component form of radial outcomes
    pub fn points(&self) -> Option<&[Vector2<f64>]> {
        match &self.outcome {
            ComposedOutcome::Radial(points) => Some(points),
            ComposedOutcome::Linear(_) => None,
        }
    }

    /// Angles of radial outcomes in degrees, (-180, 180]
    pub fn angles_deg(&self) -> Option<Vec<f64>> {
        self.points()
            .map(|points| points.iter().map(|p| p.y.atan2(p.x).to_degrees()).collect())
    }
}

/// Stateless Monte Carlo runner
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: RunConfig,
}

impl Engine {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Simulate `n_samples` outcomes of `chain`
    pub fn run(
        &self,
        chain: &Chain,
        n_samples: usize,
        seed: Option<u64>,
    ) -> Result<SamplePopulation, SimulationError> {
        self.run_with_cancel(chain, n_samples, seed, &CancelToken::new())
    }

    /// Like [`Engine::run`], checking `cancel` before every batch
    pub fn run_with_cancel(
        &self,
        chain: &Chain,
        n_samples: usize,
        seed: Option<u64>,
        cancel: &CancelToken,
    ) -> Result<SamplePopulation, SimulationError> {
        if n_samples == 0 {
            return Err(ValidationError::ZeroSamples.into());
        }
        let batch_size = self.config.batch_size;
        if batch_size == 0 {
            return Err(ValidationError::ZeroBatchSize.into());
        }
        chain.validate()?;

        let seed = seed.unwrap_or_else(|| rand::rng().random());
        let n_batches = n_samples.div_ceil(batch_size);
        let workers = self.config.workers.clamp(1, n_batches);

        let span = tracing::info_span!("simulation", seed, kind = %chain.kind());
        let _enter = span.enter();
        info!(
            samples = n_samples,
            contributors = chain.len(),
            batches = n_batches,
            workers,
            "starting Monte Carlo run"
        );
        let start = Instant::now();

        // Set when any worker fails so the others stop early
        let abort = AtomicBool::new(false);

        let run_batch = |k: usize| -> Result<ComposedOutcome, SimulationError> {
            let len = batch_size.min(n_samples - k * batch_size);
            let mut rng = StdRng::seed_from_u64(batch_seed(seed, k as u64));
            let draws = chain
                .contributors()
                .iter()
                .map(|c| {
                    c.draw(len, &mut rng).map_err(|source| ChainError::Distribution {
                        label: c.label().to_string(),
                        source,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(chain.combine(&draws)?)
        };

        let worker = |w: usize| -> Result<Vec<(usize, ComposedOutcome)>, SimulationError> {
            let mut done = Vec::new();
            for k in (w..n_batches).step_by(workers) {
                if cancel.is_cancelled() {
                    return Err(SimulationError::Cancelled);
                }
                if abort.load(Ordering::Relaxed) {
                    break;
                }
                match run_batch(k) {
                    Ok(outcome) => done.push((k, outcome)),
                    Err(e) => {
                        abort.store(true, Ordering::Relaxed);
                        return Err(e);
                    }
                }
            }
            debug!(worker = w, batches = done.len(), "worker finished");
            Ok(done)
        };

        let results: Vec<_> = if workers == 1 {
            vec![worker(0)]
        } else {
            std::thread::scope(|s| {
                let handles: Vec<_> = (0..workers)
                    .map(|w| {
                        let worker = &worker;
                        s.spawn(move || worker(w))
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                    .collect()
            })
        };

        let mut batches = Vec::with_capacity(n_batches);
        let mut cancelled = false;
        for result in results {
            match result {
                Ok(done) => batches.extend(done),
                Err(SimulationError::Cancelled) => cancelled = true,
                Err(e) => {
                    info!(error = %e, "Monte Carlo run failed");
                    return Err(e);
                }
            }
        }
        if cancelled {
            info!("Monte Carlo run cancelled");
            return Err(SimulationError::Cancelled);
        }

        batches.sort_unstable_by_key(|(k, _)| *k);
        let mut outcome = ComposedOutcome::empty(chain.kind());
        for (_, batch) in batches {
            outcome.append(batch);
        }

        info!(
            samples = outcome.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Monte Carlo run finished"
        );

        Ok(SamplePopulation {
            seed,
            batch_size,
            kind: chain.kind(),
            outcome,
            worst_case: chain.worst_case_bounds(),
        })
    }
}
