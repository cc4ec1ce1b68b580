// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Quantum-jump (Monte Carlo wave-function) solver.
//!
//! [`TrajectoryEngine`] evolves one stochastic ket; [`EnsembleRunner`]
//! fans independent trajectories out over rayon and averages them. The
//! ensemble mean of any observable converges to the Lindblad solution in
//! [`crate::lindblad`].

pub mod engine;
pub mod ensemble;

pub use engine::{
    effective_hamiltonian, effective_propagator, EngineState, JumpRecord, Trajectory,
    TrajectoryConfig, TrajectoryEngine,
};
pub use ensemble::{
    feedback_seed, CancellationToken, EnsembleConfig, EnsembleRunner, TrajectoryEnsemble,
};
