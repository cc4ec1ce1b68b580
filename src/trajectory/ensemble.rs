// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Independent trajectory ensembles.
//!
//! Every trajectory gets its own Hamiltonian schedule, feedback controller
//! and jump stream, seeded from (base seed, trajectory index, attempt). The
//! ensemble is therefore reproducible for a given base seed whether it runs
//! serially or on the rayon pool, and averages are always formed in index
//! order. In [`FeedbackMode::Accumulating`] the feedback record is drawn
//! once per run instead, and every trajectory evolves under the same
//! pre-summed Hamiltonian.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::engine::{Trajectory, TrajectoryConfig, TrajectoryEngine};
use crate::error::{Error, IntegrationError, Result, ValidationError};
use crate::feedback::FeedbackController;
use crate::hamiltonian::{FeedbackMode, HamiltonianAssembler, HamiltonianSchedule};
use crate::lindblad::CollapseSet;
use crate::timegrid::TimeGrid;

/// Cooperative stop flag shared between a caller and a running ensemble.
///
/// Checked before each trajectory starts; trajectories already in flight
/// run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Ensemble-level solver settings.
#[derive(Debug, Clone)]
pub struct EnsembleConfig {
    pub num_trajectories: usize,
    /// Base seed; per-trajectory streams are derived from it.
    pub seed: u64,
    /// Extra attempts allowed per trajectory after a numerical failure.
    pub max_retries: usize,
    /// Run trajectories on the rayon thread pool.
    pub parallel: bool,
    pub trajectory: TrajectoryConfig,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            num_trajectories: 100,
            seed: 42,
            max_retries: 2,
            parallel: true,
            trajectory: TrajectoryConfig::default(),
        }
    }
}

/// Random streams consumed by one trajectory attempt.
#[derive(Debug, Clone, Copy)]
enum Stream {
    Jumps = 1,
    Feedback = 2,
}

/// SplitMix64 finalizer over the stream coordinates.
fn stream_seed(base: u64, trajectory: usize, attempt: usize, stream: Stream) -> u64 {
    let mut z = base
        ^ (trajectory as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (attempt as u64).wrapping_mul(0xD1B5_4A32_D192_ED03)
        ^ (stream as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed of the feedback stream for `trajectory` on its first attempt.
///
/// The master-equation mode draws its single feedback record from this
/// stream so that it lines up with trajectory 0.
pub fn feedback_seed(base: u64, trajectory: usize) -> u64 {
    stream_seed(base, trajectory, 0, Stream::Feedback)
}

/// Completed trajectories in index order.
#[derive(Debug, Clone)]
pub struct TrajectoryEnsemble {
    pub trajectories: Vec<Trajectory>,
    /// Attempts that failed and were replaced by a fresh stream.
    pub retries: usize,
}

impl TrajectoryEnsemble {
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    /// Arithmetic mean of observable `index` over trajectories, per grid point.
    pub fn mean_expectation(&self, index: usize) -> Vec<f64> {
        let Some(first) = self.trajectories.first() else {
            return Vec::new();
        };
        let n_points = first.expectations.get(index).map_or(0, Vec::len);
        let mut mean = vec![0.0; n_points];
        for traj in &self.trajectories {
            if let Some(series) = traj.expectations.get(index) {
                for (m, v) in mean.iter_mut().zip(series) {
                    *m += v;
                }
            }
        }
        let count = self.trajectories.len() as f64;
        mean.iter_mut().for_each(|m| *m /= count);
        mean
    }

    /// Standard error of the mean of observable `index`, per grid point.
    pub fn standard_error(&self, index: usize) -> Vec<f64> {
        let mean = self.mean_expectation(index);
        let count = self.trajectories.len();
        if count < 2 {
            return vec![0.0; mean.len()];
        }
        let mut var = vec![0.0; mean.len()];
        for traj in &self.trajectories {
            if let Some(series) = traj.expectations.get(index) {
                for ((v, m), x) in var.iter_mut().zip(&mean).zip(series) {
                    *v += (x - m).powi(2);
                }
            }
        }
        var.iter()
            .map(|v| (v / (count - 1) as f64 / count as f64).sqrt())
            .collect()
    }

    /// Total number of jumps per channel across the ensemble.
    pub fn jump_counts(&self, channels: usize) -> Vec<usize> {
        let mut counts = vec![0; channels];
        for jump in self.trajectories.iter().flat_map(|t| &t.jumps) {
            if let Some(c) = counts.get_mut(jump.channel) {
                *c += 1;
            }
        }
        counts
    }
}

/// Where a feedback-driven trajectory takes its Hamiltonian from.
#[derive(Debug)]
enum FeedbackSource {
    /// A private controller per trajectory attempt.
    PerInterval,
    /// One static Hamiltonian shared by the whole ensemble.
    Presummed(Array2<Complex64>),
}

/// Runs an ensemble of quantum-jump trajectories over shared, read-only inputs.
pub struct EnsembleRunner<'a> {
    assembler: &'a HamiltonianAssembler,
    collapse_ops: &'a CollapseSet,
    grid: &'a TimeGrid,
    observables: &'a [Array2<Complex64>],
    initial: &'a Array1<Complex64>,
    feedback: Option<FeedbackSource>,
    config: EnsembleConfig,
    cancel: CancellationToken,
}

impl<'a> EnsembleRunner<'a> {
    pub fn new(
        assembler: &'a HamiltonianAssembler,
        collapse_ops: &'a CollapseSet,
        grid: &'a TimeGrid,
        observables: &'a [Array2<Complex64>],
        initial: &'a Array1<Complex64>,
        config: EnsembleConfig,
    ) -> Result<Self> {
        if config.num_trajectories == 0 {
            return Err(ValidationError::field("num_trajectories", "must be > 0").into());
        }
        let d = assembler.base().nrows();
        if initial.len() != d {
            return Err(Error::Dimension(format!(
                "initial ket has dimension {}, Hamiltonian is {} × {}",
                initial.len(),
                d,
                d
            )));
        }
        Ok(Self {
            assembler,
            collapse_ops,
            grid,
            observables,
            initial,
            feedback: None,
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Drive every trajectory with a measurement-feedback term.
    ///
    /// The accumulating record has one draw per grid point from
    /// `feedback_seed(seed, 0)`, the stream the master-equation run uses.
    pub fn with_feedback(mut self, mode: FeedbackMode) -> Self {
        self.feedback = Some(match mode {
            FeedbackMode::Recomputed => FeedbackSource::PerInterval,
            FeedbackMode::Accumulating => {
                let mut controller = FeedbackController::new(feedback_seed(self.config.seed, 0));
                FeedbackSource::Presummed(
                    self.assembler
                        .accumulated_hamiltonian(&mut controller, self.grid.len()),
                )
            }
        });
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Run all trajectories.
    pub fn run(&self) -> Result<TrajectoryEnsemble> {
        let n = self.config.num_trajectories;
        info!(
            trajectories = n,
            seed = self.config.seed,
            parallel = self.config.parallel,
            feedback = self.feedback.is_some(),
            "Starting trajectory ensemble"
        );

        let outcomes: Vec<(Trajectory, usize)> = if self.config.parallel {
            (0..n)
                .into_par_iter()
                .map(|i| self.run_one(i))
                .collect::<Result<Vec<_>>>()?
        } else {
            (0..n).map(|i| self.run_one(i)).collect::<Result<Vec<_>>>()?
        };

        let retries: usize = outcomes.iter().map(|(_, r)| r).sum();
        let trajectories: Vec<Trajectory> = outcomes.into_iter().map(|(t, _)| t).collect();
        let jumps: usize = trajectories.iter().map(|t| t.jumps.len()).sum();
        info!(trajectories = n, jumps, retries, "Trajectory ensemble complete");

        Ok(TrajectoryEnsemble {
            trajectories,
            retries,
        })
    }

    /// One trajectory with its retry budget. Returns the trajectory and the
    /// number of failed attempts before it.
    fn run_one(&self, index: usize) -> Result<(Trajectory, usize)> {
        let mut last = None;
        for attempt in 0..=self.config.max_retries {
            if self.cancel.is_cancelled() {
                debug!(trajectory = index, "Cancellation observed");
                return Err(Error::Cancelled);
            }
            match self.attempt(index, attempt) {
                Ok(traj) => return Ok((traj, attempt)),
                Err(Error::Integration(e)) if e.is_retryable() => {
                    warn!(
                        trajectory = index,
                        attempt,
                        error = %e,
                        "Trajectory failed, retrying with a fresh stream"
                    );
                    last = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        let last = last.unwrap_or(IntegrationError::NonFinite { time: self.grid.start() });
        Err(IntegrationError::RetriesExhausted {
            trajectory: index,
            attempts: self.config.max_retries + 1,
            last: Box::new(last),
        }
        .into())
    }

    fn attempt(&self, index: usize, attempt: usize) -> Result<Trajectory> {
        let schedule = match &self.feedback {
            Some(FeedbackSource::PerInterval) => HamiltonianSchedule::with_feedback(
                self.assembler,
                FeedbackController::new(stream_seed(
                    self.config.seed,
                    index,
                    attempt,
                    Stream::Feedback,
                )),
            ),
            Some(FeedbackSource::Presummed(h)) => HamiltonianSchedule::shared(self.assembler, h),
            None => HamiltonianSchedule::fixed(self.assembler),
        };
        let engine = TrajectoryEngine::new(
            self.initial,
            schedule,
            self.collapse_ops,
            self.grid,
            self.observables,
            self.config.trajectory,
            stream_seed(self.config.seed, index, attempt, Stream::Jumps),
        )?;
        Ok(engine.run()?)
    }
}
