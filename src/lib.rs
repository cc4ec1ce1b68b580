// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Cavity and feedback cooling of an open cavity-QED system.
//!
//! A single atom (M levels) coupled to a lossy cavity mode (N Fock levels)
//! is evolved under the Jaynes–Cummings Hamiltonian, optionally perturbed by
//! a measurement-feedback term, and the mean cavity photon number is
//! compared across three cooling scenarios.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Orchestrator (scenario)          │
//! ├──────────────────┬──────────────────────┤
//! │ Trajectory       │  Master equation     │
//! │ ensemble (rayon) │  (lindblad, RK4)     │
//! ├──────────────────┴──────────────────────┤
//! │  Hamiltonian schedule ← Feedback        │
//! │  CollapseSet                            │
//! ├─────────────────────────────────────────┤
//! │  OperatorSpace · TimeGrid · linalg      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`operators`]: Composite Hilbert space and ladder operators
//! - [`hamiltonian`]: Static Hamiltonian and per-interval feedback schedule
//! - [`lindblad`]: Collapse operators and the master-equation solver
//! - [`trajectory`]: Quantum-jump trajectories and ensembles
//! - [`feedback`]: Seeded measurement-outcome source
//! - [`scenario`]: Cooling scenarios, reports and cross-checks
//! - [`config`]: Configuration management
//! - [`validation`]: Input validation utilities
//! - [`error`]: Error types

pub mod config;
pub mod error;
pub mod feedback;
pub mod hamiltonian;
pub mod lindblad;
pub mod linalg;
pub mod operators;
pub mod scenario;
pub mod timegrid;
pub mod trajectory;
pub mod validation;

pub use config::Config;
pub use error::{Error, Result};
pub use scenario::{CoolingComparison, Orchestrator, Scenario, ScenarioReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
