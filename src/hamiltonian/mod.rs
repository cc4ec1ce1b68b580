// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Jaynes–Cummings Hamiltonian with an optional feedback term.
//!
//!   H₀ = Δ a†a + g (a†σ⁻ + a σ⁺)
//!   H_fb(x) = γ_fb · x · a†a
//!
//! The static part is built once. The feedback part depends on the latest
//! measurement outcome x and is added to a fresh copy of H₀ for every
//! grid interval; H₀ itself is never modified.

use std::borrow::Cow;

use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::feedback::FeedbackController;
use crate::operators::OperatorSpace;

/// Scalar couplings of the cavity-atom Hamiltonian (ħ = 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CouplingParams {
    /// Cavity detuning Δ.
    pub detuning: f64,
    /// Atom-cavity coupling g.
    pub coupling: f64,
    /// Feedback gain γ_fb.
    pub feedback_gain: f64,
}

/// How measurement outcomes enter the Hamiltonian of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackMode {
    /// H(t_k) = H₀ + H_fb(x_k); each interval sees only its own measurement.
    #[default]
    Recomputed,
    /// One static H₀ + γ_fb · (Σ_j x_j) · a†a, summed over one draw per grid
    /// point before evolution starts. Every trajectory of a run and the
    /// master-equation run share the same record, so the two modes agree.
    /// Reproduces the numbers of older scripts.
    Accumulating,
}

/// Builds H₀ and feedback terms from a shared operator space.
#[derive(Debug, Clone)]
pub struct HamiltonianAssembler {
    base: Array2<Complex64>,
    number: Array2<Complex64>,
    feedback_gain: f64,
}

impl HamiltonianAssembler {
    pub fn new(ops: &OperatorSpace, params: &CouplingParams) -> Self {
        let detuning = Complex64::new(params.detuning, 0.0);
        let coupling = Complex64::new(params.coupling, 0.0);

        // a†σ⁻ and aσ⁺ are mutual adjoints, so H₀ is Hermitian by construction
        let exchange = ops.a_dag().dot(ops.sigma_minus()) + ops.a().dot(ops.sigma_plus());
        let base = ops.number() * detuning + exchange * coupling;

        Self {
            base,
            number: ops.number().clone(),
            feedback_gain: params.feedback_gain,
        }
    }

    /// The static Hamiltonian H₀.
    pub fn base(&self) -> &Array2<Complex64> {
        &self.base
    }

    pub fn feedback_gain(&self) -> f64 {
        self.feedback_gain
    }

    /// H_fb(x) = γ_fb · x · a†a.
    pub fn feedback_term(&self, x: f64) -> Array2<Complex64> {
        &self.number * Complex64::new(self.feedback_gain * x, 0.0)
    }

    /// H₀ when feedback is disabled, otherwise H₀ + H_fb(x).
    pub fn current_hamiltonian(&self, x: f64, feedback_enabled: bool) -> Array2<Complex64> {
        if feedback_enabled {
            &self.base + &self.feedback_term(x)
        } else {
            self.base.clone()
        }
    }

    /// H₀ + Σ_j H_fb(x_j) over `draws` outcomes taken from `controller`.
    pub fn accumulated_hamiltonian(
        &self,
        controller: &mut FeedbackController,
        draws: usize,
    ) -> Array2<Complex64> {
        let total: f64 = (0..draws).map(|_| controller.sample()).sum();
        self.current_hamiltonian(total, true)
    }
}

/// Hamiltonian in force over one grid interval.
#[derive(Debug)]
pub struct IntervalHamiltonian<'s> {
    pub hamiltonian: Cow<'s, Array2<Complex64>>,
    /// Measurement outcome that produced the feedback term, if any.
    pub measurement: Option<f64>,
}

#[derive(Debug)]
enum Source<'a> {
    Base,
    Shared(&'a Array2<Complex64>),
    Feedback(FeedbackController),
}

/// Per-run Hamiltonian source.
///
/// A schedule is created fresh for each trajectory (or master-equation run)
/// and owns the feedback controller's random stream, so no state survives
/// from one run into the next.
#[derive(Debug)]
pub struct HamiltonianSchedule<'a> {
    assembler: &'a HamiltonianAssembler,
    source: Source<'a>,
}

impl<'a> HamiltonianSchedule<'a> {
    /// Time-independent H₀.
    pub fn fixed(assembler: &'a HamiltonianAssembler) -> Self {
        Self {
            assembler,
            source: Source::Base,
        }
    }

    /// Time-independent `hamiltonian` shared by several runs, such as the
    /// output of [`HamiltonianAssembler::accumulated_hamiltonian`].
    pub fn shared(
        assembler: &'a HamiltonianAssembler,
        hamiltonian: &'a Array2<Complex64>,
    ) -> Self {
        Self {
            assembler,
            source: Source::Shared(hamiltonian),
        }
    }

    /// H₀ plus a feedback term recomputed from `controller`, one draw per
    /// interval.
    pub fn with_feedback(
        assembler: &'a HamiltonianAssembler,
        controller: FeedbackController,
    ) -> Self {
        Self {
            assembler,
            source: Source::Feedback(controller),
        }
    }

    /// True when every interval sees the same Hamiltonian.
    pub fn is_static(&self) -> bool {
        !matches!(self.source, Source::Feedback(_))
    }

    /// Advance to the next grid interval and return its Hamiltonian.
    pub fn advance(&mut self) -> IntervalHamiltonian<'_> {
        match &mut self.source {
            Source::Base => IntervalHamiltonian {
                hamiltonian: Cow::Borrowed(self.assembler.base()),
                measurement: None,
            },
            Source::Shared(h) => IntervalHamiltonian {
                hamiltonian: Cow::Borrowed(*h),
                measurement: None,
            },
            Source::Feedback(controller) => {
                let x = controller.sample();
                IntervalHamiltonian {
                    hamiltonian: Cow::Owned(self.assembler.current_hamiltonian(x, true)),
                    measurement: Some(x),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::hermiticity_deviation;
    use approx::assert_relative_eq;

    fn setup() -> (OperatorSpace, HamiltonianAssembler) {
        let ops = OperatorSpace::new(5, 2).unwrap();
        let params = CouplingParams {
            detuning: 1.0,
            coupling: 1.0,
            feedback_gain: 0.2,
        };
        let asm = HamiltonianAssembler::new(&ops, &params);
        (ops, asm)
    }

    fn max_diff(a: &Array2<Complex64>, b: &Array2<Complex64>) -> f64 {
        (a - b).iter().map(|z| z.norm()).fold(0.0, f64::max)
    }

    #[test]
    fn test_base_is_hermitian() {
        let (_, asm) = setup();
        assert!(hermiticity_deviation(asm.base()) < 1e-14);
    }

    #[test]
    fn test_base_matrix_elements() {
        let (ops, asm) = setup();
        // ⟨1,g|H₀|0,e⟩ = g, ⟨1,g|H₀|1,g⟩ = Δ
        let e0 = ops.basis_ket(0, 1).unwrap();
        let g1 = ops.basis_ket(1, 0).unwrap();
        let h_e0 = asm.base().dot(&e0);
        let h_g1 = asm.base().dot(&g1);
        let coupling: Complex64 = g1.iter().zip(h_e0.iter()).map(|(a, b)| a.conj() * b).sum();
        let energy: Complex64 = g1.iter().zip(h_g1.iter()).map(|(a, b)| a.conj() * b).sum();
        assert_relative_eq!(coupling.re, 1.0, epsilon = 1e-14);
        assert_relative_eq!(energy.re, 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_disabled_feedback_returns_base() {
        let (_, asm) = setup();
        let h = asm.current_hamiltonian(3.7, false);
        assert_eq!(&h, asm.base());
    }

    #[test]
    fn test_feedback_term_is_scaled_number_operator() {
        let (ops, asm) = setup();
        let h = asm.current_hamiltonian(-1.5, true);
        let expected = asm.base() + &(ops.number() * Complex64::new(0.2 * -1.5, 0.0));
        assert!(max_diff(&h, &expected) < 1e-14);
        assert!(hermiticity_deviation(&h) < 1e-14);
    }

    #[test]
    fn test_recomputed_schedule_does_not_accumulate() {
        let (_, asm) = setup();
        let mut schedule = HamiltonianSchedule::with_feedback(&asm, FeedbackController::new(3));
        let mut replay = FeedbackController::new(3);
        for _ in 0..50 {
            let step = schedule.advance();
            let x = replay.sample();
            assert_eq!(step.measurement, Some(x));
            let deviation = max_diff(&step.hamiltonian, asm.base());
            // only this step's term: |γ x| · (N−1) at most
            assert!(deviation <= 0.2 * x.abs() * 4.0 + 1e-12);
        }
        // H₀ untouched after many steps
        let (_, fresh) = setup();
        assert_eq!(asm.base(), fresh.base());
    }

    #[test]
    fn test_accumulated_hamiltonian_sums_every_draw() {
        let (_, asm) = setup();
        let h = asm.accumulated_hamiltonian(&mut FeedbackController::new(9), 10);
        let mut replay = FeedbackController::new(9);
        let total: f64 = (0..10).map(|_| replay.sample()).sum();
        assert!(max_diff(&h, &asm.current_hamiltonian(total, true)) < 1e-12);
        assert!(hermiticity_deviation(&h) < 1e-14);

        // the same seed gives the same record
        let again = asm.accumulated_hamiltonian(&mut FeedbackController::new(9), 10);
        assert_eq!(h, again);
        assert_eq!(asm.accumulated_hamiltonian(&mut FeedbackController::new(9), 0), *asm.base());
    }

    #[test]
    fn test_shared_schedule_is_static() {
        let (_, asm) = setup();
        let h = asm.accumulated_hamiltonian(&mut FeedbackController::new(4), 25);
        let mut schedule = HamiltonianSchedule::shared(&asm, &h);
        assert!(schedule.is_static());
        for _ in 0..5 {
            let step = schedule.advance();
            assert!(step.measurement.is_none());
            assert_eq!(&*step.hamiltonian, &h);
        }
    }

    #[test]
    fn test_fixed_schedule_is_static() {
        let (_, asm) = setup();
        let mut schedule = HamiltonianSchedule::fixed(&asm);
        assert!(schedule.is_static());
        let step = schedule.advance();
        assert!(step.measurement.is_none());
        assert_eq!(&*step.hamiltonian, asm.base());
    }
}
