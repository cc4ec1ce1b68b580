// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Lindblad master equation solver for open quantum systems.
//!
//! Implements the Gorini–Kossakowski–Sudarshan–Lindblad (GKSL) master equation:
//!
//!   dρ/dt = -i[H(t), ρ] + Σ_k (L_k ρ L_k† − ½{L_k†L_k, ρ})
//!
//! This is the deterministic reference mode of the simulator. The
//! quantum-jump ensemble in [`crate::trajectory`] converges to the same
//! photon-number curve, so the two are used to cross-check each other.
//!
//! This module provides:
//! - Collapse operators and the immutable [`CollapseSet`]
//! - The dissipator and full Lindblad right-hand side
//! - An RK4 integrator over a [`crate::timegrid::TimeGrid`]
//!
//! # References
//!
//! - Lindblad, G. (1976). Commun. Math. Phys. 48, 119.
//!   DOI: 10.1007/BF01608499
//! - Gorini, V., Kossakowski, A., & Sudarshan, E. C. G. (1976). J. Math. Phys. 17, 821.
//!   DOI: 10.1063/1.522979
//! - Breuer, H.-P. & Petruccione, F. (2002). "The Theory of Open Quantum Systems." Oxford.

pub mod dissipator;
pub mod integrate;
pub mod types;

pub use integrate::{purity, solve_lindblad};
pub use types::{CollapseOperator, CollapseSet, DecayChannel, LindbladConfig, LindbladResult};
