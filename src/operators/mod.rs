// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Composite cavity ⊗ atom operator space.
//!
//! The Hilbert space is ordered as (cavity, atom), so the basis ket
//! |n⟩_cav ⊗ |m⟩_atom sits at index `n * M + m`. Atomic level 0 is the
//! ground state; level `M − 1` is the most excited.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use crate::error::{Error, Result};
use crate::linalg::{dagger, identity, kron, outer};

/// Per-subsystem dimensions of the composite space. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HilbertSpace {
    cavity_levels: usize,
    atom_levels: usize,
}

impl HilbertSpace {
    /// Create a space with `cavity_levels` Fock states and `atom_levels` atomic levels.
    pub fn new(cavity_levels: usize, atom_levels: usize) -> Result<Self> {
        if cavity_levels < 1 {
            return Err(Error::Dimension(format!(
                "cavity levels must be >= 1, got {}",
                cavity_levels
            )));
        }
        if atom_levels < 1 {
            return Err(Error::Dimension(format!(
                "atom levels must be >= 1, got {}",
                atom_levels
            )));
        }
        Ok(Self {
            cavity_levels,
            atom_levels,
        })
    }

    pub fn cavity_levels(&self) -> usize {
        self.cavity_levels
    }

    pub fn atom_levels(&self) -> usize {
        self.atom_levels
    }

    /// Subsystem dimensions in tensor order.
    pub fn dims(&self) -> [usize; 2] {
        [self.cavity_levels, self.atom_levels]
    }

    /// Total dimension N·M.
    pub fn dim(&self) -> usize {
        self.cavity_levels * self.atom_levels
    }

    /// Fail with a dimension error unless `op` is a square operator on this space.
    pub fn check_operator(&self, op: &Array2<Complex64>, what: &str) -> Result<()> {
        let d = self.dim();
        if op.nrows() != d || op.ncols() != d {
            return Err(Error::Dimension(format!(
                "{} is {} × {}, expected {} × {}",
                what,
                op.nrows(),
                op.ncols(),
                d,
                d
            )));
        }
        Ok(())
    }
}

/// Ladder operator on a single `n`-level subsystem: a|k⟩ = √k |k−1⟩.
pub fn destroy(n: usize) -> Array2<Complex64> {
    let mut a = Array2::zeros((n, n));
    for k in 1..n {
        a[[k - 1, k]] = Complex64::new((k as f64).sqrt(), 0.0);
    }
    a
}

/// Fixed operators of the cavity-atom system.
///
/// Built once per run configuration and then shared read-only by the
/// Hamiltonian assembler, the collapse set and the observables.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorSpace {
    space: HilbertSpace,
    a: Array2<Complex64>,
    a_dag: Array2<Complex64>,
    sigma_minus: Array2<Complex64>,
    sigma_plus: Array2<Complex64>,
    number: Array2<Complex64>,
}

impl OperatorSpace {
    /// Build `a = a_N ⊗ I_M` and `σ⁻ = I_N ⊗ a_M` with their adjoints.
    pub fn new(cavity_levels: usize, atom_levels: usize) -> Result<Self> {
        let space = HilbertSpace::new(cavity_levels, atom_levels)?;

        let a = kron(&destroy(cavity_levels), &identity(atom_levels));
        let sigma_minus = kron(&identity(cavity_levels), &destroy(atom_levels));
        let a_dag = dagger(&a);
        let sigma_plus = dagger(&sigma_minus);
        let number = a_dag.dot(&a);

        Ok(Self {
            space,
            a,
            a_dag,
            sigma_minus,
            sigma_plus,
            number,
        })
    }

    pub fn space(&self) -> &HilbertSpace {
        &self.space
    }

    pub fn dim(&self) -> usize {
        self.space.dim()
    }

    /// Cavity annihilation operator `a`.
    pub fn a(&self) -> &Array2<Complex64> {
        &self.a
    }

    /// Cavity creation operator `a†`.
    pub fn a_dag(&self) -> &Array2<Complex64> {
        &self.a_dag
    }

    /// Atomic lowering operator `σ⁻`.
    pub fn sigma_minus(&self) -> &Array2<Complex64> {
        &self.sigma_minus
    }

    /// Atomic raising operator `σ⁺`.
    pub fn sigma_plus(&self) -> &Array2<Complex64> {
        &self.sigma_plus
    }

    /// Photon number `a†a`.
    pub fn number(&self) -> &Array2<Complex64> {
        &self.number
    }

    /// Atomic excitation `σ⁺σ⁻`.
    pub fn atomic_excitation(&self) -> Array2<Complex64> {
        self.sigma_plus.dot(&self.sigma_minus)
    }

    /// Product ket |fock⟩_cav ⊗ |level⟩_atom.
    pub fn basis_ket(&self, fock: usize, level: usize) -> Result<Array1<Complex64>> {
        if fock >= self.space.cavity_levels {
            return Err(Error::Dimension(format!(
                "Fock level {} outside cavity space of {} levels",
                fock, self.space.cavity_levels
            )));
        }
        if level >= self.space.atom_levels {
            return Err(Error::Dimension(format!(
                "atomic level {} outside atom space of {} levels",
                level, self.space.atom_levels
            )));
        }
        let mut psi = Array1::zeros(self.dim());
        psi[fock * self.space.atom_levels + level] = Complex64::new(1.0, 0.0);
        Ok(psi)
    }

    /// Density matrix of the product state |fock, level⟩.
    pub fn basis_density(&self, fock: usize, level: usize) -> Result<Array2<Complex64>> {
        Ok(outer(&self.basis_ket(fock, level)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{commutator, hermiticity_deviation, ket_expectation};
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(OperatorSpace::new(0, 2), Err(Error::Dimension(_))));
        assert!(matches!(OperatorSpace::new(10, 0), Err(Error::Dimension(_))));
    }

    #[test]
    fn test_shapes() {
        let ops = OperatorSpace::new(10, 2).unwrap();
        assert_eq!(ops.dim(), 20);
        assert_eq!(ops.space().dims(), [10, 2]);
        for op in [ops.a(), ops.a_dag(), ops.sigma_minus(), ops.sigma_plus(), ops.number()] {
            assert_eq!(op.shape(), &[20, 20]);
        }
    }

    #[test]
    fn test_construction_is_idempotent() {
        let first = OperatorSpace::new(6, 2).unwrap();
        let second = OperatorSpace::new(6, 2).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_number_operator_is_positive_semidefinite() {
        for (n, m) in [(1, 1), (3, 2), (10, 2), (4, 3)] {
            let ops = OperatorSpace::new(n, m).unwrap();
            let number = ops.number();
            assert!(hermiticity_deviation(number) < 1e-14);
            // a†a is diagonal in the Fock basis with eigenvalues 0..N-1
            for ((i, j), z) in number.indexed_iter() {
                if i == j {
                    assert!(z.re >= 0.0);
                    assert_relative_eq!(z.re, (i / m) as f64, epsilon = 1e-12);
                } else {
                    assert_eq!(z.norm(), 0.0);
                }
            }
            // and ⟨v|a†a|v⟩ ≥ 0 for an arbitrary (normalized) vector
            let d = ops.dim();
            let v = Array1::from_shape_fn(d, |k| {
                Complex64::new((k as f64 * 0.7).sin(), (k as f64 * 1.3).cos())
            });
            let v = &v / Complex64::new(crate::linalg::ket_norm(&v), 0.0);
            assert!(ket_expectation(number, &v) >= -1e-12);
        }
    }

    #[test]
    fn test_two_level_commutator() {
        // [σ⁻, σ⁺] = |g⟩⟨g| − |e⟩⟨e| on the atom, identity on the cavity
        let ops = OperatorSpace::new(4, 2).unwrap();
        let c = commutator(ops.sigma_minus(), ops.sigma_plus());
        for ((i, j), z) in c.indexed_iter() {
            let expected = if i != j {
                0.0
            } else if i % 2 == 0 {
                1.0
            } else {
                -1.0
            };
            assert_relative_eq!(z.re, expected, epsilon = 1e-14);
            assert_relative_eq!(z.im, 0.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_ladder_action_on_basis() {
        let ops = OperatorSpace::new(5, 2).unwrap();
        // a†|0, e⟩ = |1, e⟩
        let psi = ops.basis_ket(0, 1).unwrap();
        let raised = ops.a_dag().dot(&psi);
        assert_eq!(raised, ops.basis_ket(1, 1).unwrap());
        // σ⁻|1, e⟩ = |1, g⟩
        let lowered = ops.sigma_minus().dot(&raised);
        assert_eq!(lowered, ops.basis_ket(1, 0).unwrap());
        // a|2, g⟩ = √2 |1, g⟩
        let two = ops.basis_ket(2, 0).unwrap();
        let down = ops.a().dot(&two);
        assert_relative_eq!(down[2].re, 2f64.sqrt(), epsilon = 1e-14);
    }

    #[test]
    fn test_basis_ket_out_of_range() {
        let ops = OperatorSpace::new(3, 2).unwrap();
        assert!(ops.basis_ket(3, 0).is_err());
        assert!(ops.basis_ket(0, 2).is_err());
    }

    #[test]
    fn test_check_operator_dimension() {
        let ops = OperatorSpace::new(3, 2).unwrap();
        assert!(ops.space().check_operator(ops.a(), "a").is_ok());
        let wrong = Array2::<Complex64>::zeros((4, 4));
        assert!(matches!(
            ops.space().check_operator(&wrong, "L"),
            Err(Error::Dimension(_))
        ));
    }
}
