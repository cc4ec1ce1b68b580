// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Collapse operators and master-equation solver types.
//!
//! Ref: Lindblad (1976), Commun. Math. Phys. 48, 119.

use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::linalg::dagger;
use crate::operators::OperatorSpace;

/// A Lindblad collapse (jump) operator with its rate absorbed.
///
/// Represents a single dissipation channel:
///   D[L](ρ) = L ρ L† − ½{L†L, ρ},  L = √γ · J
///
/// where J is the bare jump operator (e.g. `a` for cavity photon loss).
#[derive(Debug, Clone)]
pub struct CollapseOperator {
    /// Scaled operator √γ · J on the full composite space.
    pub matrix: Array2<Complex64>,
    /// Cached L†L.
    pub decay: Array2<Complex64>,
    /// Decay rate γ.
    pub rate: f64,
    /// Human-readable label (e.g., "cavity_decay").
    pub label: String,
}

impl CollapseOperator {
    /// Scale a bare jump operator by √rate.
    pub fn new(bare: &Array2<Complex64>, rate: f64, label: &str) -> Result<Self> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(ValidationError::PhysicsConstraint(format!(
                "collapse operator '{}' has invalid rate {}",
                label, rate
            ))
            .into());
        }
        let matrix = bare * Complex64::new(rate.sqrt(), 0.0);
        let decay = dagger(&matrix).dot(&matrix);
        Ok(Self {
            matrix,
            decay,
            rate,
            label: label.to_string(),
        })
    }

    /// Cavity photon loss: L = √κ · a.
    pub fn cavity_decay(ops: &OperatorSpace, kappa: f64) -> Result<Self> {
        Self::new(ops.a(), kappa, "cavity_decay")
    }

    /// Atomic spontaneous emission: L = √γ · σ⁻.
    pub fn atomic_decay(ops: &OperatorSpace, gamma: f64) -> Result<Self> {
        Self::new(ops.sigma_minus(), gamma, "atomic_decay")
    }
}

/// Loss channels selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayChannel {
    /// Photon leakage through the cavity mirrors (rate κ).
    CavityDecay,
    /// Spontaneous emission of the atom into free space (rate γ_atom).
    AtomicDecay,
}

/// Ordered, immutable set of collapse operators.
///
/// Adding a channel means building a new set.
#[derive(Debug, Clone)]
pub struct CollapseSet {
    operators: Vec<CollapseOperator>,
    decay_sum: Array2<Complex64>,
}

impl CollapseSet {
    /// Build a set, checking every operator against the composite dimension.
    pub fn new(ops: &OperatorSpace, operators: Vec<CollapseOperator>) -> Result<Self> {
        for op in &operators {
            ops.space().check_operator(&op.matrix, &format!("collapse operator '{}'", op.label))?;
        }
        let d = ops.dim();
        let decay_sum = operators
            .iter()
            .fold(Array2::zeros((d, d)), |acc, op| acc + &op.decay);
        Ok(Self {
            operators,
            decay_sum,
        })
    }

    /// Build a set from configured channel names and rates.
    pub fn from_channels(
        ops: &OperatorSpace,
        channels: &[DecayChannel],
        kappa: f64,
        gamma_atom: f64,
    ) -> Result<Self> {
        let operators = channels
            .iter()
            .map(|channel| match channel {
                DecayChannel::CavityDecay => CollapseOperator::cavity_decay(ops, kappa),
                DecayChannel::AtomicDecay => CollapseOperator::atomic_decay(ops, gamma_atom),
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(ops, operators)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CollapseOperator> {
        self.operators.iter()
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.operators.iter().map(|op| op.label.as_str()).collect()
    }

    /// Σ_k L_k†L_k.
    pub fn decay_sum(&self) -> &Array2<Complex64> {
        &self.decay_sum
    }
}

impl<'a> IntoIterator for &'a CollapseSet {
    type Item = &'a CollapseOperator;
    type IntoIter = std::slice::Iter<'a, CollapseOperator>;

    fn into_iter(self) -> Self::IntoIter {
        self.operators.iter()
    }
}

/// Configuration for the master-equation solver.
#[derive(Debug, Clone)]
pub struct LindbladConfig {
    /// RK4 steps per grid interval.
    pub substeps: usize,
    /// Whether to keep the density matrix at every grid point.
    pub store_states: bool,
}

impl Default for LindbladConfig {
    fn default() -> Self {
        Self {
            substeps: 4,
            store_states: true,
        }
    }
}

impl LindbladConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.substeps == 0 {
            return Err(ValidationError::field("substeps", "must be > 0").into());
        }
        Ok(())
    }
}

/// Result of a master-equation evolution over a time grid.
#[derive(Debug, Clone)]
pub struct LindbladResult {
    /// Density matrix at each grid point (if `store_states` was set).
    pub states: Option<Vec<Array2<Complex64>>>,
    /// `expectations[j][k]` = Tr(O_j ρ(t_k)).
    pub expectations: Vec<Vec<f64>>,
    /// Tr ρ at each grid point.
    pub traces: Vec<f64>,
    /// Final density matrix.
    pub final_density_matrix: Array2<Complex64>,
    /// Purity Tr(ρ²) of the final state.
    pub final_purity: f64,
    /// Feedback measurement applied on each interval, if feedback was on.
    pub measurements: Vec<f64>,
    /// Number of RK4 steps taken.
    pub steps: usize,
}
