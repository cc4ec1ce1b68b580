// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Observable extraction shared by both evolution modes.

use crate::config::Method;
use crate::lindblad::LindbladResult;
use crate::trajectory::TrajectoryEnsemble;

/// Index of a†a in the recorded observable list.
pub const PHOTON_NUMBER: usize = 0;
/// Index of σ⁺σ⁻ in the recorded observable list.
pub const ATOMIC_EXCITATION: usize = 1;

/// Share of the grid, counted from the end, used for the long-time average.
pub const LONG_TIME_FRACTION: f64 = 0.25;

/// Output of one evolution, in whichever mode produced it.
#[derive(Debug, Clone)]
pub enum EnsembleResult {
    /// Quantum-jump trajectories.
    Trajectories(TrajectoryEnsemble),
    /// Deterministic density-matrix evolution.
    Density(LindbladResult),
}

impl EnsembleResult {
    pub fn method(&self) -> Method {
        match self {
            EnsembleResult::Trajectories(_) => Method::MonteCarlo,
            EnsembleResult::Density(_) => Method::MasterEquation,
        }
    }

    /// Expectation series of recorded observable `index`.
    ///
    /// Trajectory ensembles give the arithmetic mean of ⟨ψ_i|O|ψ_i⟩ over
    /// trajectories; the density mode gives Tr(O ρ).
    pub fn expectation(&self, index: usize) -> Vec<f64> {
        match self {
            EnsembleResult::Trajectories(ens) => ens.mean_expectation(index),
            EnsembleResult::Density(res) => {
                res.expectations.get(index).cloned().unwrap_or_default()
            }
        }
    }

    /// Mean photon number ⟨a†a⟩ at each grid point.
    pub fn mean_photon_number(&self) -> Vec<f64> {
        self.expectation(PHOTON_NUMBER)
    }

    /// Number of trajectories, or 1 for the density mode.
    pub fn realizations(&self) -> usize {
        match self {
            EnsembleResult::Trajectories(ens) => ens.len(),
            EnsembleResult::Density(_) => 1,
        }
    }
}

/// Value at the last grid point.
pub fn final_metric(series: &[f64]) -> Option<f64> {
    series.last().copied()
}

/// Largest value of a series and the time it occurs (first occurrence).
pub fn peak(times: &[f64], series: &[f64]) -> Option<(f64, f64)> {
    times
        .iter()
        .zip(series)
        .fold(None, |best: Option<(f64, f64)>, (&t, &v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((t, v)),
        })
}

/// Mean over the trailing `fraction` of the series (at least one point).
pub fn long_time_average(series: &[f64], fraction: f64) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    let tail = ((series.len() as f64 * fraction).ceil() as usize).clamp(1, series.len());
    let window = &series[series.len() - tail..];
    Some(window.iter().sum::<f64>() / window.len() as f64)
}

/// max_k |a_k − b_k|.
pub fn max_abs_deviation(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
}

/// max_k |a_k − b_k| relative to the peak magnitude of the reference `b`.
pub fn max_relative_deviation(a: &[f64], b: &[f64]) -> f64 {
    let scale = b.iter().map(|v| v.abs()).fold(0.0, f64::max);
    let abs = max_abs_deviation(a, b);
    if scale > 0.0 {
        abs / scale
    } else {
        abs
    }
}
