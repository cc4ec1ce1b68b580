// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Matrix exponential via scaling-and-squaring with Padé(13) approximation.
//!
//! Used to build the between-jump propagator exp(−i H_eff δt) for a
//! piecewise-constant, non-Hermitian generator. The generator is not
//! anti-Hermitian, so the result is a contraction rather than a unitary.
//!
//! Ref: Higham (2005), "The Scaling and Squaring Method for the Matrix
//! Exponential Revisited", SIAM J. Matrix Anal. Appl. 26(4), 1179.

use ndarray::{s, Array2};
use num_complex::Complex64;

/// Largest 1-norm for which Padé(13) is accurate to double precision
/// (Higham Table 10.2).
const THETA_13: f64 = 5.371_920_351_148_152;

/// Padé(13,13) numerator coefficients b_0..b_13, Higham (2005) eq. (10.33).
const PADE_COEFFS: [f64; 14] = [
    64_764_752_532_480_000.0,
    32_382_376_266_240_000.0,
    7_771_770_303_897_600.0,
    1_187_353_796_428_800.0,
    129_060_195_264_000.0,
    10_559_470_521_600.0,
    670_442_572_800.0,
    33_522_128_640.0,
    1_323_241_920.0,
    40_840_800.0,
    960_960.0,
    16_380.0,
    182.0,
    1.0,
];

/// Compute exp(A) for a square complex matrix.
///
/// Returns `None` if the Padé denominator is numerically singular, which only
/// happens for non-finite input.
pub fn matrix_exp(a: &Array2<Complex64>) -> Option<Array2<Complex64>> {
    let n = a.nrows();
    if n != a.ncols() {
        return None;
    }
    match n {
        0 => return Some(Array2::zeros((0, 0))),
        1 => return Some(Array2::from_elem((1, 1), a[[0, 0]].exp())),
        _ => {}
    }

    let norm = one_norm(a);
    if !norm.is_finite() {
        return None;
    }
    let squarings = if norm > THETA_13 {
        (norm / THETA_13).log2().ceil() as i32
    } else {
        0
    };

    let scaled = a * Complex64::new(2f64.powi(-squarings), 0.0);
    let mut result = pade13(&scaled)?;
    for _ in 0..squarings {
        result = result.dot(&result);
    }
    Some(result)
}

/// Padé(13,13) approximant r(A) = (V − U)⁻¹ (V + U).
fn pade13(a: &Array2<Complex64>) -> Option<Array2<Complex64>> {
    let b = |k: usize| Complex64::new(PADE_COEFFS[k], 0.0);
    let eye = Array2::from_diag_elem(a.nrows(), Complex64::new(1.0, 0.0));

    let a2 = a.dot(a);
    let a4 = a2.dot(&a2);
    let a6 = a2.dot(&a4);

    let u_inner = (&a6 * b(13) + &a4 * b(11) + &a2 * b(9)).dot(&a6)
        + &a6 * b(7)
        + &a4 * b(5)
        + &a2 * b(3)
        + &eye * b(1);
    let u = a.dot(&u_inner);

    let v = (&a6 * b(12) + &a4 * b(10) + &a2 * b(8)).dot(&a6)
        + &a6 * b(6)
        + &a4 * b(4)
        + &a2 * b(2)
        + &eye * b(0);

    lu_solve(&v - &u, &v + &u)
}

/// Solve A·X = B by Gaussian elimination with partial pivoting.
fn lu_solve(a: Array2<Complex64>, b: Array2<Complex64>) -> Option<Array2<Complex64>> {
    let n = a.nrows();
    let m = b.ncols();

    let mut aug = Array2::zeros((n, n + m));
    aug.slice_mut(s![.., ..n]).assign(&a);
    aug.slice_mut(s![.., n..]).assign(&b);

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| aug[[i, col]].norm().total_cmp(&aug[[j, col]].norm()))
            .unwrap_or(col);
        if pivot_row != col {
            for j in 0..(n + m) {
                aug.swap([col, j], [pivot_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        if pivot.norm() < 1e-300 || !pivot.is_finite() {
            return None;
        }

        for row in (col + 1)..n {
            let factor = aug[[row, col]] / pivot;
            if factor == Complex64::new(0.0, 0.0) {
                continue;
            }
            for j in col..(n + m) {
                let upper = aug[[col, j]];
                aug[[row, j]] -= factor * upper;
            }
        }
    }

    let mut x = Array2::<Complex64>::zeros((n, m));
    for row in (0..n).rev() {
        let pivot = aug[[row, row]];
        for j in 0..m {
            let mut acc = aug[[row, n + j]];
            for k in (row + 1)..n {
                acc -= aug[[row, k]] * x[[k, j]];
            }
            x[[row, j]] = acc / pivot;
        }
    }
    Some(x)
}

/// Max absolute column sum.
fn one_norm(a: &Array2<Complex64>) -> f64 {
    a.columns()
        .into_iter()
        .map(|col| col.iter().map(|z| z.norm()).sum::<f64>())
        .fold(0.0, f64::max)
}
