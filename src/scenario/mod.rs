// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Cooling-scenario orchestration.
//!
//! The [`Orchestrator`] owns the operator space, time grid and initial state
//! for one configuration and drives three named comparison runs:
//!
//! | Scenario          | Channels (default)           | Feedback |
//! |-------------------|------------------------------|----------|
//! | Cavity Cooling    | cavity decay                 | off      |
//! | Feedback Cooling  | cavity decay                 | on       |
//! | Combined Cooling  | cavity decay + atomic decay  | on       |
//!
//! Each run builds its own Hamiltonian schedule and collapse set, so nothing
//! leaks from one scenario into the next. A failing scenario is reported
//! without stopping the others.

pub mod observables;

use std::fmt;

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{Config, Method, ScenarioConfig};
use crate::error::{Error, Result};
use crate::feedback::FeedbackController;
use crate::hamiltonian::{FeedbackMode, HamiltonianAssembler, HamiltonianSchedule};
use crate::lindblad::{solve_lindblad, CollapseSet, LindbladConfig};
use crate::linalg::outer;
use crate::operators::OperatorSpace;
use crate::timegrid::TimeGrid;
use crate::trajectory::{
    feedback_seed, CancellationToken, EnsembleConfig, EnsembleRunner, TrajectoryConfig,
};

pub use observables::{
    final_metric, long_time_average, max_abs_deviation, max_relative_deviation, peak,
    EnsembleResult, ATOMIC_EXCITATION, LONG_TIME_FRACTION, PHOTON_NUMBER,
};

/// Above this per-substep jump probability the first-order jump rule is coarse.
const JUMP_PROBABILITY_WARN: f64 = 0.1;

/// The three comparison runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Scenario {
    #[serde(rename = "Cavity Cooling")]
    CavityCooling,
    #[serde(rename = "Feedback Cooling")]
    FeedbackCooling,
    #[serde(rename = "Combined Cooling")]
    CombinedCooling,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [
        Scenario::CavityCooling,
        Scenario::FeedbackCooling,
        Scenario::CombinedCooling,
    ];

    /// Report label.
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::CavityCooling => "Cavity Cooling",
            Scenario::FeedbackCooling => "Feedback Cooling",
            Scenario::CombinedCooling => "Combined Cooling",
        }
    }

    /// Parse a label or its short form (`cavity`, `feedback`, `combined`).
    pub fn from_name(name: &str) -> Option<Self> {
        let key = name.trim().to_lowercase();
        let key = key.trim_end_matches(" cooling").trim_end_matches("-cooling");
        match key {
            "cavity" => Some(Scenario::CavityCooling),
            "feedback" => Some(Scenario::FeedbackCooling),
            "combined" => Some(Scenario::CombinedCooling),
            _ => None,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Observable series and summary metrics of one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub method: Method,
    pub feedback: bool,
    pub channels: Vec<String>,
    /// Trajectories averaged, or 1 for the master equation.
    pub realizations: usize,
    pub times: Vec<f64>,
    /// ⟨a†a⟩ at each grid point.
    pub mean_photon_number: Vec<f64>,
    /// ⟨σ⁺σ⁻⟩ at each grid point.
    pub atomic_excitation: Vec<f64>,
    /// ⟨a†a⟩ at the last grid point.
    pub final_metric: f64,
    pub peak_value: f64,
    pub peak_time: f64,
    /// Mean of ⟨a†a⟩ over the trailing quarter of the grid.
    pub long_time_average: f64,
    /// Total quantum jumps across the ensemble (trajectory mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_jumps: Option<usize>,
    /// Failed trajectory attempts replaced by fresh streams.
    pub retries: usize,
}

impl ScenarioReport {
    fn from_result(
        scenario: Scenario,
        settings: &ScenarioConfig,
        collapse_ops: &CollapseSet,
        grid: &TimeGrid,
        result: &EnsembleResult,
    ) -> Self {
        let times = grid.times().to_vec();
        let mean_photon_number = result.mean_photon_number();
        let atomic_excitation = result.expectation(ATOMIC_EXCITATION);
        let (peak_time, peak_value) =
            peak(&times, &mean_photon_number).unwrap_or((grid.start(), 0.0));
        let (total_jumps, retries) = match result {
            EnsembleResult::Trajectories(ens) => (
                Some(ens.trajectories.iter().map(|t| t.jumps.len()).sum::<usize>()),
                ens.retries,
            ),
            EnsembleResult::Density(_) => (None, 0),
        };

        Self {
            scenario,
            method: result.method(),
            feedback: settings.feedback,
            channels: collapse_ops.labels().into_iter().map(String::from).collect(),
            realizations: result.realizations(),
            final_metric: final_metric(&mean_photon_number).unwrap_or(0.0),
            long_time_average: long_time_average(&mean_photon_number, LONG_TIME_FRACTION)
                .unwrap_or(0.0),
            peak_value,
            peak_time,
            times,
            mean_photon_number,
            atomic_excitation,
            total_jumps,
            retries,
        }
    }

    /// True when the late-time photon number sits below the transient peak.
    pub fn cooled(&self) -> bool {
        self.long_time_average < self.peak_value
    }
}

/// A scenario that did not produce a report.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioFailure {
    pub scenario: Scenario,
    pub error: String,
}

/// Reports for every scenario that completed, plus the ones that failed.
#[derive(Debug, Serialize)]
pub struct CoolingComparison {
    pub reports: Vec<ScenarioReport>,
    pub failures: Vec<ScenarioFailure>,
    #[serde(skip)]
    first_error: Option<Error>,
}

impl CoolingComparison {
    pub fn report(&self, scenario: Scenario) -> Option<&ScenarioReport> {
        self.reports.iter().find(|r| r.scenario == scenario)
    }

    /// The first unrecoverable error, in scenario order.
    pub fn first_error(&self) -> Option<&Error> {
        self.first_error.as_ref()
    }

    pub fn into_result(self) -> Result<Vec<ScenarioReport>> {
        match self.first_error {
            Some(e) => Err(e),
            None => Ok(self.reports),
        }
    }
}

/// Agreement between the two evolution modes for one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct CrossCheck {
    pub scenario: Scenario,
    pub trajectories: usize,
    pub times: Vec<f64>,
    pub monte_carlo: Vec<f64>,
    pub master_equation: Vec<f64>,
    pub max_abs_deviation: f64,
    /// Max absolute deviation over the master-equation peak.
    pub max_relative_deviation: f64,
}

/// Drives the cooling scenarios for one validated configuration.
pub struct Orchestrator {
    config: Config,
    ops: OperatorSpace,
    grid: TimeGrid,
    initial: Array1<Complex64>,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Validate `config` and build the shared operator space, grid and state.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let ops = OperatorSpace::new(config.system.cavity_levels, config.system.atom_levels)?;
        let grid = TimeGrid::linspace(
            config.time_grid.start,
            config.time_grid.end,
            config.time_grid.points,
        )?;
        let initial = ops.basis_ket(
            config.initial_state.cavity_fock,
            config.initial_state.atom_level,
        )?;
        Ok(Self {
            config,
            ops,
            grid,
            initial,
            cancel: CancellationToken::new(),
        })
    }

    /// Share a stop flag with a caller; checked between trajectories.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn operators(&self) -> &OperatorSpace {
        &self.ops
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn scenario_config(&self, scenario: Scenario) -> &ScenarioConfig {
        let s = &self.config.scenarios;
        match scenario {
            Scenario::CavityCooling => &s.cavity,
            Scenario::FeedbackCooling => &s.feedback,
            Scenario::CombinedCooling => &s.combined,
        }
    }

    /// Run all three scenarios with the configured method.
    pub fn run_all(&self) -> CoolingComparison {
        let mut reports = Vec::with_capacity(Scenario::ALL.len());
        let mut failures = Vec::new();
        let mut first_error = None;

        for scenario in Scenario::ALL {
            match self.run_scenario(scenario) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(scenario = %scenario, error = %e, "Scenario failed");
                    failures.push(ScenarioFailure {
                        scenario,
                        error: e.to_string(),
                    });
                    first_error.get_or_insert(e);
                }
            }
        }

        CoolingComparison {
            reports,
            failures,
            first_error,
        }
    }

    /// Run one scenario with the configured method.
    pub fn run_scenario(&self, scenario: Scenario) -> Result<ScenarioReport> {
        self.run_scenario_with(scenario, self.config.solver.method)
    }

    /// Run one scenario with an explicit method.
    pub fn run_scenario_with(&self, scenario: Scenario, method: Method) -> Result<ScenarioReport> {
        let settings = self.scenario_config(scenario);
        let collapse_ops = self.collapse_set(settings)?;
        let result = self.simulate(scenario, method, &collapse_ops)?;
        let report =
            ScenarioReport::from_result(scenario, settings, &collapse_ops, &self.grid, &result);

        info!(
            scenario = %scenario,
            method = method.as_str(),
            final_photon_number = report.final_metric,
            peak = report.peak_value,
            peak_time = report.peak_time,
            "Scenario complete"
        );
        Ok(report)
    }

    /// Raw evolution output of one scenario.
    pub fn simulate(
        &self,
        scenario: Scenario,
        method: Method,
        collapse_ops: &CollapseSet,
    ) -> Result<EnsembleResult> {
        let settings = self.scenario_config(scenario);
        let solver = &self.config.solver;
        let assembler = HamiltonianAssembler::new(&self.ops, &self.config.system.coupling_params());
        let observables = self.observables();
        self.check_jump_probability(scenario, collapse_ops);

        info!(
            scenario = %scenario,
            method = method.as_str(),
            feedback = settings.feedback,
            channels = ?collapse_ops.labels(),
            "Running scenario"
        );

        match method {
            Method::MonteCarlo => {
                let config = EnsembleConfig {
                    num_trajectories: solver.num_trajectories,
                    seed: solver.seed,
                    max_retries: solver.max_retries,
                    parallel: solver.parallel,
                    trajectory: TrajectoryConfig {
                        substeps: solver.substeps,
                        store_states: solver.store_states,
                    },
                };
                let mut runner = EnsembleRunner::new(
                    &assembler,
                    collapse_ops,
                    &self.grid,
                    &observables,
                    &self.initial,
                    config,
                )?
                .with_cancellation(self.cancel.clone());
                if settings.feedback {
                    runner = runner.with_feedback(solver.feedback_mode);
                }
                Ok(EnsembleResult::Trajectories(runner.run()?))
            }
            Method::MasterEquation => {
                if self.cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                let mut controller = FeedbackController::new(feedback_seed(solver.seed, 0));
                let presummed;
                let mut schedule = match (settings.feedback, solver.feedback_mode) {
                    (false, _) => HamiltonianSchedule::fixed(&assembler),
                    (true, FeedbackMode::Recomputed) => {
                        HamiltonianSchedule::with_feedback(&assembler, controller)
                    }
                    (true, FeedbackMode::Accumulating) => {
                        presummed =
                            assembler.accumulated_hamiltonian(&mut controller, self.grid.len());
                        HamiltonianSchedule::shared(&assembler, &presummed)
                    }
                };
                let result = solve_lindblad(
                    &outer(&self.initial),
                    &mut schedule,
                    collapse_ops,
                    &self.grid,
                    &observables,
                    &LindbladConfig {
                        substeps: solver.substeps,
                        store_states: solver.store_states,
                    },
                )?;
                Ok(EnsembleResult::Density(result))
            }
        }
    }

    /// Run a scenario in both modes and compare ⟨a†a⟩.
    pub fn cross_check(&self, scenario: Scenario) -> Result<CrossCheck> {
        let mc = self.run_scenario_with(scenario, Method::MonteCarlo)?;
        let me = self.run_scenario_with(scenario, Method::MasterEquation)?;

        let max_abs = max_abs_deviation(&mc.mean_photon_number, &me.mean_photon_number);
        let max_rel = max_relative_deviation(&mc.mean_photon_number, &me.mean_photon_number);
        info!(
            scenario = %scenario,
            trajectories = mc.realizations,
            max_abs_deviation = max_abs,
            max_relative_deviation = max_rel,
            "Cross-check complete"
        );

        Ok(CrossCheck {
            scenario,
            trajectories: mc.realizations,
            times: mc.times,
            monte_carlo: mc.mean_photon_number,
            master_equation: me.mean_photon_number,
            max_abs_deviation: max_abs,
            max_relative_deviation: max_rel,
        })
    }

    fn collapse_set(&self, settings: &ScenarioConfig) -> Result<CollapseSet> {
        CollapseSet::from_channels(
            &self.ops,
            &settings.channels,
            self.config.system.kappa,
            self.config.system.gamma_atom,
        )
    }

    /// a†a and σ⁺σ⁻, in the order of [`PHOTON_NUMBER`] and [`ATOMIC_EXCITATION`].
    fn observables(&self) -> Vec<Array2<Complex64>> {
        vec![self.ops.number().clone(), self.ops.atomic_excitation()]
    }

    /// Warn when δt · max diag(Σ L†L) is large enough to bias jump sampling.
    fn check_jump_probability(&self, scenario: Scenario, collapse_ops: &CollapseSet) {
        let widest = self
            .grid
            .intervals()
            .map(|(t0, t1)| t1 - t0)
            .fold(0.0, f64::max);
        let dt = widest / self.config.solver.substeps as f64;
        let max_rate = collapse_ops
            .decay_sum()
            .diag()
            .iter()
            .map(|z| z.re)
            .fold(0.0, f64::max);
        let bound = dt * max_rate;
        if bound > JUMP_PROBABILITY_WARN {
            warn!(
                scenario = %scenario,
                bound,
                substeps = self.config.solver.substeps,
                "Per-substep jump probability is large; increase solver.substeps"
            );
        }
    }
}
