// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration management for the cooling simulator.
//!
//! Configuration is loaded from multiple sources with the following priority
//! (later sources override earlier ones):
//!
//! 1. Built-in defaults
//! 2. cavity-cooling.yaml file
//! 3. Environment variables (CAVITY_SIM_*)
//! 4. CLI arguments

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::error::Result;
use crate::hamiltonian::{CouplingParams, FeedbackMode};
use crate::lindblad::DecayChannel;
use crate::validation::{
    validate_count, validate_finite, validate_level_index, validate_levels, validate_rate,
    validate_time_grid,
};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Physical parameters of the cavity-atom system
    #[serde(default)]
    pub system: SystemConfig,

    /// Output time grid
    #[serde(default)]
    pub time_grid: TimeGridConfig,

    /// Product basis state the system starts in
    #[serde(default)]
    pub initial_state: InitialStateConfig,

    /// Evolution method and its numerical settings
    #[serde(default)]
    pub solver: SolverConfig,

    /// Per-scenario channel and feedback selection
    #[serde(default)]
    pub scenarios: ScenariosConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(path) = config_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                config = serde_yaml::from_str(&content)?;
            } else {
                tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            }
        } else {
            for path in &["cavity-cooling.yaml", "cavity-cooling.yml"] {
                let path = Path::new(path);
                if path.exists() {
                    let content = std::fs::read_to_string(path)?;
                    config = serde_yaml::from_str(&content)?;
                    break;
                }
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Some(val) = env_parse("CAVITY_SIM_CAVITY_LEVELS") {
            self.system.cavity_levels = val;
        }
        if let Some(val) = env_parse("CAVITY_SIM_KAPPA") {
            self.system.kappa = val;
        }
        if let Some(val) = env_parse("CAVITY_SIM_FEEDBACK_GAIN") {
            self.system.feedback_gain = val;
        }
        if let Some(val) = env_parse("CAVITY_SIM_GAMMA_ATOM") {
            self.system.gamma_atom = val;
        }
        if let Some(val) = env_parse("CAVITY_SIM_TRAJECTORIES") {
            self.solver.num_trajectories = val;
        }
        if let Some(val) = env_parse("CAVITY_SIM_SEED") {
            self.solver.seed = val;
        }
        if let Ok(val) = env::var("CAVITY_SIM_METHOD") {
            if let Some(method) = Method::from_name(&val) {
                self.solver.method = method;
            }
        }
        if let Ok(val) = env::var("CAVITY_SIM_PARALLEL") {
            self.solver.parallel = val.to_lowercase() == "true" || val == "1";
        }
        if let Ok(val) = env::var("CAVITY_SIM_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("CAVITY_SIM_LOG_FORMAT") {
            self.logging.format = val;
        }
    }

    /// Validate configuration before any simulation work.
    pub fn validate(&self) -> Result<()> {
        let s = &self.system;
        validate_levels("system.cavity_levels", s.cavity_levels)?;
        validate_levels("system.atom_levels", s.atom_levels)?;
        validate_finite("system.detuning", s.detuning)?;
        validate_finite("system.coupling", s.coupling)?;
        validate_finite("system.feedback_gain", s.feedback_gain)?;
        validate_rate("system.kappa", s.kappa)?;
        validate_rate("system.gamma_atom", s.gamma_atom)?;

        let g = &self.time_grid;
        validate_time_grid(g.start, g.end, g.points)?;

        validate_level_index(
            "initial_state.cavity_fock",
            self.initial_state.cavity_fock,
            s.cavity_levels,
        )?;
        validate_level_index(
            "initial_state.atom_level",
            self.initial_state.atom_level,
            s.atom_levels,
        )?;

        validate_count("solver.num_trajectories", self.solver.num_trajectories)?;
        validate_count("solver.substeps", self.solver.substeps)?;
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.trim().parse().ok())
}

/// Physical parameters (ħ = 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Cavity Fock levels N
    #[serde(default = "default_cavity_levels")]
    pub cavity_levels: usize,

    /// Atomic levels M
    #[serde(default = "default_atom_levels")]
    pub atom_levels: usize,

    /// Cavity detuning Δ
    #[serde(default = "default_one")]
    pub detuning: f64,

    /// Atom-cavity coupling g
    #[serde(default = "default_one")]
    pub coupling: f64,

    /// Cavity decay rate κ
    #[serde(default = "default_kappa")]
    pub kappa: f64,

    /// Atomic spontaneous-emission rate, used by the `atomic_decay` channel
    #[serde(default)]
    pub gamma_atom: f64,

    /// Feedback gain γ_fb
    #[serde(default = "default_feedback_gain")]
    pub feedback_gain: f64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            cavity_levels: default_cavity_levels(),
            atom_levels: default_atom_levels(),
            detuning: default_one(),
            coupling: default_one(),
            kappa: default_kappa(),
            gamma_atom: 0.0,
            feedback_gain: default_feedback_gain(),
        }
    }
}

impl SystemConfig {
    pub fn coupling_params(&self) -> CouplingParams {
        CouplingParams {
            detuning: self.detuning,
            coupling: self.coupling,
            feedback_gain: self.feedback_gain,
        }
    }
}

fn default_cavity_levels() -> usize {
    10
}

fn default_atom_levels() -> usize {
    2
}

fn default_one() -> f64 {
    1.0
}

fn default_kappa() -> f64 {
    0.5
}

fn default_feedback_gain() -> f64 {
    0.2
}

/// Evenly spaced output grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeGridConfig {
    #[serde(default)]
    pub start: f64,

    #[serde(default = "default_end")]
    pub end: f64,

    /// Number of sample times, endpoints included
    #[serde(default = "default_points")]
    pub points: usize,
}

impl Default for TimeGridConfig {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: default_end(),
            points: default_points(),
        }
    }
}

fn default_end() -> f64 {
    20.0
}

fn default_points() -> usize {
    1000
}

/// Initial product state |n⟩_cavity ⊗ |m⟩_atom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialStateConfig {
    /// Cavity Fock number n
    #[serde(default)]
    pub cavity_fock: usize,

    /// Atomic level m (0 = ground)
    #[serde(default = "default_atom_level")]
    pub atom_level: usize,
}

impl Default for InitialStateConfig {
    fn default() -> Self {
        Self {
            cavity_fock: 0,
            atom_level: default_atom_level(),
        }
    }
}

fn default_atom_level() -> usize {
    1
}

/// Evolution method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Quantum-jump trajectory ensemble
    #[default]
    MonteCarlo,
    /// Deterministic Lindblad master equation
    MasterEquation,
}

impl Method {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "monte_carlo" | "mc" | "mcwf" => Some(Method::MonteCarlo),
            "master_equation" | "me" | "lindblad" => Some(Method::MasterEquation),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::MonteCarlo => "monte_carlo",
            Method::MasterEquation => "master_equation",
        }
    }
}

/// Solver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default)]
    pub method: Method,

    /// Trajectories per ensemble
    #[serde(default = "default_num_trajectories")]
    pub num_trajectories: usize,

    /// Integration substeps per grid interval
    #[serde(default = "default_substeps")]
    pub substeps: usize,

    /// Base seed for every random stream
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Extra attempts per trajectory after a numerical failure
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Spread trajectories over the rayon thread pool
    #[serde(default = "default_true")]
    pub parallel: bool,

    #[serde(default)]
    pub feedback_mode: FeedbackMode,

    /// Keep every state (ket or density matrix) at each grid point
    #[serde(default)]
    pub store_states: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: Method::default(),
            num_trajectories: default_num_trajectories(),
            substeps: default_substeps(),
            seed: default_seed(),
            max_retries: default_max_retries(),
            parallel: true,
            feedback_mode: FeedbackMode::default(),
            store_states: false,
        }
    }
}

fn default_num_trajectories() -> usize {
    500
}

fn default_substeps() -> usize {
    2
}

fn default_seed() -> u64 {
    42
}

fn default_max_retries() -> usize {
    3
}

fn default_true() -> bool {
    true
}

/// One named comparison run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Loss channels, in collapse-set order
    #[serde(default = "default_channels")]
    pub channels: Vec<DecayChannel>,

    /// Add the measurement-feedback term to the Hamiltonian
    #[serde(default)]
    pub feedback: bool,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            channels: default_channels(),
            feedback: false,
        }
    }
}

fn default_channels() -> Vec<DecayChannel> {
    vec![DecayChannel::CavityDecay]
}

/// The three comparison runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenariosConfig {
    #[serde(default = "default_cavity_scenario")]
    pub cavity: ScenarioConfig,

    #[serde(default = "default_feedback_scenario")]
    pub feedback: ScenarioConfig,

    #[serde(default = "default_combined_scenario")]
    pub combined: ScenarioConfig,
}

impl Default for ScenariosConfig {
    fn default() -> Self {
        Self {
            cavity: default_cavity_scenario(),
            feedback: default_feedback_scenario(),
            combined: default_combined_scenario(),
        }
    }
}

fn default_cavity_scenario() -> ScenarioConfig {
    ScenarioConfig::default()
}

fn default_feedback_scenario() -> ScenarioConfig {
    ScenarioConfig {
        channels: default_channels(),
        feedback: true,
    }
}

fn default_combined_scenario() -> ScenarioConfig {
    ScenarioConfig {
        channels: vec![DecayChannel::CavityDecay, DecayChannel::AtomicDecay],
        feedback: true,
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ValidationError};
    use std::io::Write as _;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.system.cavity_levels, 10);
        assert_eq!(config.system.atom_levels, 2);
        assert_eq!(config.system.kappa, 0.5);
        assert_eq!(config.system.feedback_gain, 0.2);
        assert_eq!(config.time_grid.points, 1000);
        assert_eq!(config.time_grid.end, 20.0);
        assert_eq!(config.initial_state.atom_level, 1);
        assert_eq!(config.solver.method, Method::MonteCarlo);
        assert_eq!(config.solver.feedback_mode, FeedbackMode::Recomputed);
    }

    #[test]
    fn test_default_scenarios() {
        let s = ScenariosConfig::default();
        assert!(!s.cavity.feedback);
        assert_eq!(s.cavity.channels, vec![DecayChannel::CavityDecay]);
        assert!(s.feedback.feedback);
        assert_eq!(
            s.combined.channels,
            vec![DecayChannel::CavityDecay, DecayChannel::AtomicDecay]
        );
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        let mut bad_config = Config::default();
        bad_config.system.kappa = -0.5;
        assert!(matches!(
            bad_config.validate(),
            Err(Error::Configuration(ValidationError::PhysicsConstraint(_)))
        ));
    }

    #[test]
    fn test_validate_zero_dimension() {
        let mut config = Config::default();
        config.system.atom_levels = 0;
        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("system.atom_levels"));
    }

    #[test]
    fn test_validate_empty_grid() {
        let mut config = Config::default();
        config.time_grid.points = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_initial_level_in_range() {
        let mut config = Config::default();
        config.initial_state.cavity_fock = 10;
        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("initial_state.cavity_fock"));
    }

    #[test]
    fn test_validate_zero_trajectories() {
        let mut config = Config::default();
        config.solver.num_trajectories = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_load_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
system:
  cavity_levels: 6
  kappa: 0.8
solver:
  method: master_equation
  feedback_mode: accumulating
scenarios:
  combined:
    channels: [cavity_decay]
    feedback: true
"#
        )
        .unwrap();

        let config = Config::load(Some(f.path())).unwrap();
        assert_eq!(config.system.cavity_levels, 6);
        assert_eq!(config.system.kappa, 0.8);
        // unspecified fields keep their defaults
        assert_eq!(config.system.coupling, 1.0);
        assert_eq!(config.solver.method, Method::MasterEquation);
        assert_eq!(config.solver.feedback_mode, FeedbackMode::Accumulating);
        assert_eq!(config.scenarios.combined.channels, vec![DecayChannel::CavityDecay]);
        assert!(!config.scenarios.cavity.feedback);
    }

    #[test]
    fn test_config_load_nonexistent_file() {
        let path = std::path::Path::new("/tmp/does_not_exist_cavity_cooling_test.yaml");
        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.system.cavity_levels, 10);
    }

    #[test]
    fn test_config_load_invalid_yaml() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "{{{{not: valid: yaml::::").unwrap();

        let result = Config::load(Some(f.path()));
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_config_round_trips_through_yaml() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.scenarios.combined, config.scenarios.combined);
        assert_eq!(back.solver.seed, config.solver.seed);
    }

    #[test]
    fn test_env_override_trajectories() {
        let mut config = Config::default();
        std::env::set_var("CAVITY_SIM_TRAJECTORIES", "64");
        config.apply_env_overrides();
        assert_eq!(config.solver.num_trajectories, 64);
        std::env::remove_var("CAVITY_SIM_TRAJECTORIES");
    }

    #[test]
    fn test_env_override_method() {
        let mut config = Config::default();
        std::env::set_var("CAVITY_SIM_METHOD", "master-equation");
        config.apply_env_overrides();
        assert_eq!(config.solver.method, Method::MasterEquation);
        std::env::remove_var("CAVITY_SIM_METHOD");
    }

    #[test]
    fn test_env_override_ignores_unparseable() {
        let mut config = Config::default();
        std::env::set_var("CAVITY_SIM_KAPPA", "fast");
        config.apply_env_overrides();
        assert_eq!(config.system.kappa, 0.5);
        std::env::remove_var("CAVITY_SIM_KAPPA");
    }

    #[test]
    fn test_env_override_parallel() {
        let mut config = Config::default();
        std::env::set_var("CAVITY_SIM_PARALLEL", "false");
        config.apply_env_overrides();
        assert!(!config.solver.parallel);
        std::env::remove_var("CAVITY_SIM_PARALLEL");
    }

    #[test]
    fn test_method_names() {
        assert_eq!(Method::from_name("mc"), Some(Method::MonteCarlo));
        assert_eq!(Method::from_name("Lindblad"), Some(Method::MasterEquation));
        assert_eq!(Method::from_name("euler"), None);
        assert_eq!(Method::MasterEquation.as_str(), "master_equation");
    }
}
