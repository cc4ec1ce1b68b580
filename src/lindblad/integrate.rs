// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! RK4 integrator for the Lindblad master equation.
//!
//! Integrates dρ/dt = -i[H(t), ρ] + Σ D[L](ρ) using classical 4th-order
//! Runge–Kutta over a time grid. The Hamiltonian is piecewise constant on
//! grid intervals and is taken from a [`HamiltonianSchedule`], so the same
//! feedback machinery drives both solvers.
//!
//! Ref: Press et al., "Numerical Recipes" (2007), §17.1.

use ndarray::Array2;
use num_complex::Complex64;
use tracing::debug;

use super::dissipator::lindblad_rhs;
use super::types::{CollapseSet, LindbladConfig, LindbladResult};
use crate::error::{Error, IntegrationError, Result};
use crate::hamiltonian::HamiltonianSchedule;
use crate::linalg::{all_finite, density_expectation, trace};
use crate::timegrid::TimeGrid;
use crate::validation::validate_density_matrix;

/// Solve the master equation from `initial_rho` across `grid`.
///
/// # Arguments
/// * `initial_rho` — Initial density matrix (d × d, positive semidefinite, trace 1).
/// * `schedule` — Hamiltonian source, advanced once per grid interval.
/// * `collapse_ops` — Dissipation channels.
/// * `grid` — Output times; ρ is reported at each of them.
/// * `observables` — Operators whose expectation values are recorded.
/// * `config` — Substep count and state storage.
pub fn solve_lindblad(
    initial_rho: &Array2<Complex64>,
    schedule: &mut HamiltonianSchedule<'_>,
    collapse_ops: &CollapseSet,
    grid: &TimeGrid,
    observables: &[Array2<Complex64>],
    config: &LindbladConfig,
) -> Result<LindbladResult> {
    config.validate()?;

    let d = initial_rho.nrows();
    if d != initial_rho.ncols() {
        return Err(Error::Dimension(format!(
            "Initial density matrix must be square, got {} × {}",
            initial_rho.nrows(),
            initial_rho.ncols()
        )));
    }
    if let Some(op) = collapse_ops.iter().find(|op| op.matrix.nrows() != d) {
        return Err(Error::Dimension(format!(
            "collapse operator '{}' is {} × {}, state is {} × {}",
            op.label,
            op.matrix.nrows(),
            op.matrix.ncols(),
            d,
            d
        )));
    }
    if let Some(op) = observables.iter().find(|op| op.nrows() != d || op.ncols() != d) {
        return Err(Error::Dimension(format!(
            "observable is {} × {}, state is {} × {}",
            op.nrows(),
            op.ncols(),
            d,
            d
        )));
    }

    validate_density_matrix(initial_rho)?;

    let n_points = grid.len();
    let mut rho = initial_rho.clone();
    let mut expectations: Vec<Vec<f64>> = observables
        .iter()
        .map(|_| Vec::with_capacity(n_points))
        .collect();
    let mut traces = Vec::with_capacity(n_points);
    let mut states = config.store_states.then(|| Vec::with_capacity(n_points));
    let mut measurements = Vec::new();
    let mut steps = 0;

    let mut record = |rho: &Array2<Complex64>| {
        for (series, op) in expectations.iter_mut().zip(observables) {
            series.push(density_expectation(op, rho));
        }
        traces.push(trace(rho).re);
        if let Some(states) = states.as_mut() {
            states.push(rho.clone());
        }
    };

    record(&rho);

    for (t0, t1) in grid.intervals() {
        let interval = schedule.advance();
        if let Some(x) = interval.measurement {
            measurements.push(x);
        }
        let h = interval.hamiltonian;
        let dt = (t1 - t0) / config.substeps as f64;

        for _ in 0..config.substeps {
            rho = rk4_step(&rho, &h, collapse_ops, dt);
            steps += 1;
        }

        if !all_finite(rho.iter()) {
            return Err(IntegrationError::NonFinite { time: t1 }.into());
        }
        record(&rho);
    }

    let final_purity = purity(&rho);
    debug!(
        steps,
        final_trace = trace(&rho).re,
        final_purity,
        "Master equation integrated"
    );

    Ok(LindbladResult {
        states,
        expectations,
        traces,
        final_density_matrix: rho,
        final_purity,
        measurements,
        steps,
    })
}

/// Single RK4 step with the Hamiltonian held constant across the four stages.
fn rk4_step(
    rho: &Array2<Complex64>,
    hamiltonian: &Array2<Complex64>,
    collapse_ops: &CollapseSet,
    dt: f64,
) -> Array2<Complex64> {
    let dt_c = Complex64::new(dt, 0.0);
    let half = Complex64::new(0.5, 0.0);
    let sixth = Complex64::new(1.0 / 6.0, 0.0);
    let two = Complex64::new(2.0, 0.0);

    let k1 = lindblad_rhs(hamiltonian, collapse_ops, rho);
    let k2 = lindblad_rhs(hamiltonian, collapse_ops, &(rho + &(&k1 * (half * dt_c))));
    let k3 = lindblad_rhs(hamiltonian, collapse_ops, &(rho + &(&k2 * (half * dt_c))));
    let k4 = lindblad_rhs(hamiltonian, collapse_ops, &(rho + &(&k3 * dt_c)));

    rho + &((k1 + k2 * two + k3 * two + k4) * (sixth * dt_c))
}

/// Purity Tr(ρ²).
pub fn purity(rho: &Array2<Complex64>) -> f64 {
    // Tr(ρ²) = Σ_ij ρ_ij ρ_ji
    density_expectation(rho, rho)
}
