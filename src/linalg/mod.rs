// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Dense complex linear-algebra helpers shared by the solvers.
//!
//! Products, sums and tensor products come from `ndarray`; this module only
//! adds the handful of quantum-mechanics conveniences built on top of them.

pub mod expm;

use ndarray::{Array1, Array2};
use num_complex::Complex64;

pub use expm::matrix_exp;

/// Conjugate transpose (dagger) of a matrix.
pub fn dagger(m: &Array2<Complex64>) -> Array2<Complex64> {
    m.t().mapv(|z| z.conj())
}

/// Kronecker (tensor) product A ⊗ B.
pub fn kron(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64> {
    ndarray::linalg::kron(a, b)
}

/// d × d identity.
pub fn identity(d: usize) -> Array2<Complex64> {
    Array2::from_diag_elem(d, Complex64::new(1.0, 0.0))
}

/// Commutator [A, B] = AB − BA.
pub fn commutator(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64> {
    a.dot(b) - b.dot(a)
}

/// Trace of a square matrix.
pub fn trace(m: &Array2<Complex64>) -> Complex64 {
    m.diag().sum()
}

/// Euclidean norm ‖ψ‖.
pub fn ket_norm(psi: &Array1<Complex64>) -> f64 {
    psi.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt()
}

/// ⟨ψ|O|ψ⟩ (real part; O is assumed Hermitian and ψ normalized).
pub fn ket_expectation(op: &Array2<Complex64>, psi: &Array1<Complex64>) -> f64 {
    let o_psi = op.dot(psi);
    psi.iter()
        .zip(o_psi.iter())
        .map(|(a, b)| a.conj() * b)
        .sum::<Complex64>()
        .re
}

/// Tr(O ρ) (real part).
pub fn density_expectation(op: &Array2<Complex64>, rho: &Array2<Complex64>) -> f64 {
    // Tr(Oρ) = Σ_ij O_ij ρ_ji, avoiding the full product
    let mut acc = Complex64::new(0.0, 0.0);
    for ((i, j), o) in op.indexed_iter() {
        acc += o * rho[[j, i]];
    }
    acc.re
}

/// |ψ⟩⟨ψ|.
pub fn outer(psi: &Array1<Complex64>) -> Array2<Complex64> {
    let d = psi.len();
    Array2::from_shape_fn((d, d), |(i, j)| psi[i] * psi[j].conj())
}

/// max |M − M†| over all elements.
pub fn hermiticity_deviation(m: &Array2<Complex64>) -> f64 {
    m.indexed_iter()
        .map(|((i, j), z)| (z - m[[j, i]].conj()).norm())
        .fold(0.0, f64::max)
}

/// True if every element is finite.
pub fn all_finite<'a, I>(values: I) -> bool
where
    I: IntoIterator<Item = &'a Complex64>,
{
    values.into_iter().all(|z| z.is_finite())
}
