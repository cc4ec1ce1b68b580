// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Lindblad dissipator computation.
//!
//! Computes D[L](ρ) = L ρ L† − ½{L†L, ρ} for each collapse operator, with
//! the rate already absorbed into L.
//!
//! Ref: Breuer & Petruccione, "The Theory of Open Quantum Systems" (2002), Ch. 3.

use ndarray::Array2;
use num_complex::Complex64;

use super::types::{CollapseOperator, CollapseSet};
use crate::linalg::dagger;

/// Dissipator contribution of a single channel.
pub fn dissipator(op: &CollapseOperator, rho: &Array2<Complex64>) -> Array2<Complex64> {
    if op.rate == 0.0 {
        return Array2::zeros(rho.raw_dim());
    }

    let l = &op.matrix;
    let half = Complex64::new(0.5, 0.0);

    // L ρ L†
    let jump = l.dot(rho).dot(&dagger(l));
    // ½ (L†L ρ + ρ L†L)
    let anticommutator = (op.decay.dot(rho) + rho.dot(&op.decay)) * half;

    jump - anticommutator
}

/// Σ_k D[L_k](ρ).
pub fn total_dissipator(collapse_ops: &CollapseSet, rho: &Array2<Complex64>) -> Array2<Complex64> {
    collapse_ops
        .iter()
        .fold(Array2::zeros(rho.raw_dim()), |acc, op| acc + dissipator(op, rho))
}

/// Full Lindblad right-hand side: dρ/dt = −i[H, ρ] + Σ_k D[L_k](ρ).
pub fn lindblad_rhs(
    hamiltonian: &Array2<Complex64>,
    collapse_ops: &CollapseSet,
    rho: &Array2<Complex64>,
) -> Array2<Complex64> {
    let minus_i = Complex64::new(0.0, -1.0);
    let commutator = (hamiltonian.dot(rho) - rho.dot(hamiltonian)) * minus_i;
    commutator + total_dissipator(collapse_ops, rho)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lindblad::types::DecayChannel;
    use crate::linalg::{outer, trace};
    use crate::operators::OperatorSpace;
    use approx::assert_relative_eq;

    fn cavity_set(ops: &OperatorSpace, kappa: f64) -> CollapseSet {
        CollapseSet::from_channels(ops, &[DecayChannel::CavityDecay], kappa, 0.0).unwrap()
    }

    #[test]
    fn test_vacuum_is_fixed_point_of_cavity_loss() {
        // a|0⟩ = 0, so nothing leaks from the vacuum
        let ops = OperatorSpace::new(4, 2).unwrap();
        let set = cavity_set(&ops, 0.5);
        let rho = ops.basis_density(0, 1).unwrap();
        let d = total_dissipator(&set, &rho);
        assert!(d.iter().all(|z| z.norm() < 1e-15));
    }

    #[test]
    fn test_single_photon_decays_at_kappa() {
        let ops = OperatorSpace::new(4, 2).unwrap();
        let kappa = 0.5;
        let set = cavity_set(&ops, kappa);
        let rho = ops.basis_density(1, 0).unwrap();
        let d = total_dissipator(&set, &rho);
        // |1,g⟩ sits at index 2, |0,g⟩ at index 0
        assert_relative_eq!(d[[2, 2]].re, -kappa, epsilon = 1e-14);
        assert_relative_eq!(d[[0, 0]].re, kappa, epsilon = 1e-14);
    }

    #[test]
    fn test_dissipator_preserves_trace() {
        let ops = OperatorSpace::new(3, 2).unwrap();
        let set = CollapseSet::from_channels(
            &ops,
            &[DecayChannel::CavityDecay, DecayChannel::AtomicDecay],
            0.7,
            0.3,
        )
        .unwrap();
        let psi = (ops.basis_ket(2, 1).unwrap() + ops.basis_ket(1, 0).unwrap())
            * Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
        let d = total_dissipator(&set, &outer(&psi));
        let tr = trace(&d);
        assert_relative_eq!(tr.re, 0.0, epsilon = 1e-12);
        assert_relative_eq!(tr.im, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_rate_gives_zero_dissipator() {
        let ops = OperatorSpace::new(3, 2).unwrap();
        let op = CollapseOperator::cavity_decay(&ops, 0.0).unwrap();
        let d = dissipator(&op, &ops.basis_density(2, 0).unwrap());
        assert!(d.iter().all(|z| z.norm() == 0.0));
    }

    #[test]
    fn test_rhs_unitary_part_vanishes_on_eigenstate() {
        // |0,g⟩ is an eigenstate of the Jaynes–Cummings Hamiltonian
        let ops = OperatorSpace::new(3, 2).unwrap();
        let set = CollapseSet::new(&ops, vec![]).unwrap();
        let h = ops.number().clone();
        let drho = lindblad_rhs(&h, &set, &ops.basis_density(0, 0).unwrap());
        assert!(drho.iter().all(|z| z.norm() < 1e-15));
    }
}
