// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Single quantum-jump trajectory.
//!
//! Between jumps the unnormalized ket evolves under the non-Hermitian
//! generator
//!
//!   H_eff = H(t) − (i/2) Σ_k L_k†L_k
//!
//! using the exact propagator exp(−i H_eff δt) of each piecewise-constant
//! substep. At every substep a jump through channel k happens with
//! probability p_k = δt ⟨ψ|L_k†L_k|ψ⟩ (first order in δt), in which case
//! ψ ← L_k ψ. The ket is renormalized after every substep, so the norm is
//! 1 at every recorded grid point.
//!
//! Ref: Dalibard, Castin & Mølmer (1992), Phys. Rev. Lett. 68, 580.
//! Ref: Plenio & Knight (1998), Rev. Mod. Phys. 70, 101.

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, IntegrationError, Result, ValidationError};
use crate::hamiltonian::HamiltonianSchedule;
use crate::lindblad::CollapseSet;
use crate::linalg::{all_finite, ket_expectation, ket_norm, matrix_exp};
use crate::timegrid::TimeGrid;
use crate::validation::validate_ket;

/// Norms below this are treated as a collapsed state.
const NORM_FLOOR: f64 = 1e-150;

/// Per-trajectory integration settings.
#[derive(Debug, Clone, Copy)]
pub struct TrajectoryConfig {
    /// Jump/no-jump decisions per grid interval.
    pub substeps: usize,
    /// Keep the ket at every grid point.
    pub store_states: bool,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            substeps: 2,
            store_states: false,
        }
    }
}

/// Lifecycle of a [`TrajectoryEngine`].
#[derive(Debug, Clone)]
pub enum EngineState {
    /// Inputs bound, nothing integrated yet.
    Ready,
    /// `completed` of the grid intervals have been traversed.
    Evolving { completed: usize },
    /// The whole grid has been traversed.
    Completed,
    /// A step broke down; the trajectory must be discarded.
    Failed(IntegrationError),
}

/// A quantum jump.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpRecord {
    /// End of the substep in which the jump happened.
    pub time: f64,
    /// Index into the collapse set.
    pub channel: usize,
}

/// One stochastic realization, sampled on the time grid.
#[derive(Debug, Clone)]
pub struct Trajectory {
    /// `expectations[j][k]` = ⟨ψ(t_k)|O_j|ψ(t_k)⟩.
    pub expectations: Vec<Vec<f64>>,
    /// ‖ψ(t_k)‖ at each grid point.
    pub norms: Vec<f64>,
    /// ψ(t_k), when state storage is on.
    pub states: Option<Vec<Array1<Complex64>>>,
    /// Jumps in time order.
    pub jumps: Vec<JumpRecord>,
    /// Feedback measurement applied on each interval, if feedback was on.
    pub measurements: Vec<f64>,
    /// Seed of the jump stream that produced this trajectory.
    pub seed: u64,
}

/// Quantum-jump integrator for one trajectory.
pub struct TrajectoryEngine<'a> {
    state: EngineState,
    psi: Array1<Complex64>,
    schedule: HamiltonianSchedule<'a>,
    collapse_ops: &'a CollapseSet,
    grid: &'a TimeGrid,
    observables: &'a [Array2<Complex64>],
    config: TrajectoryConfig,
    rng: StdRng,
    cached_propagator: Option<Array2<Complex64>>,
    record: Trajectory,
}

impl<'a> TrajectoryEngine<'a> {
    /// Bind inputs. `seed` drives the jump decisions only; feedback draws
    /// come from the controller inside `schedule`.
    pub fn new(
        initial: &Array1<Complex64>,
        schedule: HamiltonianSchedule<'a>,
        collapse_ops: &'a CollapseSet,
        grid: &'a TimeGrid,
        observables: &'a [Array2<Complex64>],
        config: TrajectoryConfig,
        seed: u64,
    ) -> Result<Self> {
        let d = initial.len();
        if let Some(op) = collapse_ops.iter().find(|op| op.matrix.nrows() != d) {
            return Err(Error::Dimension(format!(
                "collapse operator '{}' acts on dimension {}, state has {}",
                op.label,
                op.matrix.nrows(),
                d
            )));
        }
        if observables.iter().any(|op| op.nrows() != d || op.ncols() != d) {
            return Err(Error::Dimension(format!(
                "observables must be {} × {}",
                d, d
            )));
        }
        if config.substeps == 0 {
            return Err(ValidationError::field("substeps", "must be > 0").into());
        }
        validate_ket(initial)?;

        let n_points = grid.len();
        let record = Trajectory {
            expectations: observables
                .iter()
                .map(|_| Vec::with_capacity(n_points))
                .collect(),
            norms: Vec::with_capacity(n_points),
            states: config.store_states.then(|| Vec::with_capacity(n_points)),
            jumps: Vec::new(),
            measurements: Vec::new(),
            seed,
        };

        Ok(Self {
            state: EngineState::Ready,
            psi: initial.clone(),
            schedule,
            collapse_ops,
            grid,
            observables,
            config,
            rng: StdRng::seed_from_u64(seed),
            cached_propagator: None,
            record,
        })
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Current working ket.
    pub fn ket(&self) -> &Array1<Complex64> {
        &self.psi
    }

    /// Advance across the next grid interval and record the state at its end.
    ///
    /// The first call also records the initial state. Calling after
    /// completion is a no-op; calling after a failure returns the failure.
    pub fn advance(&mut self) -> std::result::Result<(), IntegrationError> {
        let completed = match self.state {
            EngineState::Ready => 0,
            EngineState::Evolving { completed } => completed,
            EngineState::Completed => return Ok(()),
            EngineState::Failed(ref e) => return Err(e.clone()),
        };
        if matches!(self.state, EngineState::Ready) {
            self.record_point();
        }

        let n_intervals = self.grid.len() - 1;
        if completed == n_intervals {
            self.state = EngineState::Completed;
            return Ok(());
        }

        let t0 = self.grid.times()[completed];
        let t1 = self.grid.times()[completed + 1];
        if let Err(e) = self.integrate_interval(t0, t1) {
            self.state = EngineState::Failed(e.clone());
            return Err(e);
        }
        self.record_point();

        self.state = if completed + 1 == n_intervals {
            EngineState::Completed
        } else {
            EngineState::Evolving {
                completed: completed + 1,
            }
        };
        Ok(())
    }

    /// Run to completion and hand back the recorded trajectory.
    pub fn run(mut self) -> std::result::Result<Trajectory, IntegrationError> {
        loop {
            self.advance()?;
            if matches!(self.state, EngineState::Completed) {
                return Ok(self.record);
            }
        }
    }

    fn integrate_interval(
        &mut self,
        t0: f64,
        t1: f64,
    ) -> std::result::Result<(), IntegrationError> {
        let dt = (t1 - t0) / self.config.substeps as f64;
        let propagator = self.interval_propagator(dt, t0)?;

        for s in 1..=self.config.substeps {
            let t = t0 + dt * s as f64;
            self.substep(&propagator, dt, t)?;
        }
        Ok(())
    }

    /// exp(−i H_eff δt) for the interval, reusing the cached one when H is static.
    fn interval_propagator(
        &mut self,
        dt: f64,
        t0: f64,
    ) -> std::result::Result<Array2<Complex64>, IntegrationError> {
        let is_static = self.schedule.is_static();
        if is_static {
            if let Some(u) = &self.cached_propagator {
                return Ok(u.clone());
            }
        }

        let interval = self.schedule.advance();
        if let Some(x) = interval.measurement {
            self.record.measurements.push(x);
        }
        let u = effective_propagator(&interval.hamiltonian, self.collapse_ops, dt)
            .ok_or(IntegrationError::SingularPropagator { time: t0 })?;

        if is_static {
            self.cached_propagator = Some(u.clone());
        }
        Ok(u)
    }

    fn substep(
        &mut self,
        propagator: &Array2<Complex64>,
        dt: f64,
        t: f64,
    ) -> std::result::Result<(), IntegrationError> {
        let probabilities: Vec<f64> = self
            .collapse_ops
            .iter()
            .map(|op| dt * ket_expectation(&op.decay, &self.psi).max(0.0))
            .collect();
        let total: f64 = probabilities.iter().sum();

        let r: f64 = self.rng.gen();
        let candidate = if r < total {
            let channel = choose_channel(&probabilities, self.rng.gen::<f64>() * total);
            self.record.jumps.push(JumpRecord { time: t, channel });
            let op = self
                .collapse_ops
                .iter()
                .nth(channel)
                .map(|op| &op.matrix)
                .ok_or(IntegrationError::NonFinite { time: t })?;
            op.dot(&self.psi)
        } else {
            propagator.dot(&self.psi)
        };

        if !all_finite(candidate.iter()) {
            return Err(IntegrationError::NonFinite { time: t });
        }
        let norm = ket_norm(&candidate);
        if norm < NORM_FLOOR {
            return Err(IntegrationError::NormCollapse { time: t, norm });
        }
        self.psi = candidate / Complex64::new(norm, 0.0);
        Ok(())
    }

    fn record_point(&mut self) {
        for (series, op) in self.record.expectations.iter_mut().zip(self.observables) {
            series.push(ket_expectation(op, &self.psi));
        }
        self.record.norms.push(ket_norm(&self.psi));
        if let Some(states) = self.record.states.as_mut() {
            states.push(self.psi.clone());
        }
    }
}

/// H_eff = H − (i/2) Σ L†L.
pub fn effective_hamiltonian(
    hamiltonian: &Array2<Complex64>,
    collapse_ops: &CollapseSet,
) -> Array2<Complex64> {
    hamiltonian - &(collapse_ops.decay_sum() * Complex64::new(0.0, 0.5))
}

/// exp(−i H_eff δt), or `None` if the exponential cannot be formed.
pub fn effective_propagator(
    hamiltonian: &Array2<Complex64>,
    collapse_ops: &CollapseSet,
    dt: f64,
) -> Option<Array2<Complex64>> {
    let generator = effective_hamiltonian(hamiltonian, collapse_ops) * Complex64::new(0.0, -dt);
    matrix_exp(&generator)
}

/// Pick the channel whose cumulative weight first exceeds `target`.
fn choose_channel(weights: &[f64], target: f64) -> usize {
    let mut acc = 0.0;
    for (k, w) in weights.iter().enumerate() {
        acc += w;
        if target < acc {
            return k;
        }
    }
    // rounding can leave target == total; fall back to the last live channel
    weights.iter().rposition(|w| *w > 0.0).unwrap_or(0)
}
