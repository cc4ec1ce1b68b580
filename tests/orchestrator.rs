// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end runs of the public orchestrator API.

use std::io::Write as _;

use cavity_cooling_sim::config::{Config, Method};
use cavity_cooling_sim::hamiltonian::FeedbackMode;
use cavity_cooling_sim::scenario::ATOMIC_EXCITATION;
use cavity_cooling_sim::trajectory::CancellationToken;
use cavity_cooling_sim::{Error, Orchestrator, Scenario};

fn load(yaml: &str) -> Config {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(f, "{}", yaml).unwrap();
    Config::load(Some(f.path())).unwrap()
}

const SMALL: &str = r#"
system:
  cavity_levels: 4
time_grid:
  end: 8.0
  points: 161
solver:
  num_trajectories: 80
  seed: 7
"#;

#[test]
fn test_comparison_from_yaml_config() {
    let orchestrator = Orchestrator::new(load(SMALL)).unwrap();
    let comparison = orchestrator.run_all();

    assert!(comparison.failures.is_empty());
    for scenario in Scenario::ALL {
        let report = comparison.report(scenario).unwrap();
        assert_eq!(report.times.len(), 161);
        assert_eq!(report.method, Method::MonteCarlo);
        assert!(report.mean_photon_number.iter().all(|n| (0.0..=3.0).contains(n)));
    }

    let json = serde_json::to_value(&comparison).unwrap();
    let names: Vec<&str> = json["reports"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["scenario"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Cavity Cooling", "Feedback Cooling", "Combined Cooling"]);
}

#[test]
fn test_master_equation_reference_scenario() {
    // N=10, M=2, Δ=1, g=1, κ=0.5, vacuum ⊗ excited, 1000 points over [0, 20]
    let mut config = Config::default();
    config.solver.method = Method::MasterEquation;
    let orchestrator = Orchestrator::new(config).unwrap();
    let report = orchestrator.run_scenario(Scenario::CavityCooling).unwrap();

    assert_eq!(report.times.len(), 1000);
    assert!(report.final_metric > 0.0);
    assert!(report.final_metric < report.peak_value);
    assert!(report.peak_time < std::f64::consts::PI);
    assert!(report.cooled());
    // the excitation starts in the atom
    assert!((report.atomic_excitation[0] - 1.0).abs() < 1e-12);
    assert_eq!(ATOMIC_EXCITATION, 1);
}

#[test]
fn test_accumulating_feedback_is_configurable() {
    let yaml = format!("{}  feedback_mode: accumulating\n  method: master_equation\n", SMALL);
    let config = load(&yaml);
    assert_eq!(config.solver.feedback_mode, FeedbackMode::Accumulating);

    let orchestrator = Orchestrator::new(config).unwrap();
    let accumulating = orchestrator.run_scenario(Scenario::FeedbackCooling).unwrap();

    let mut recomputed_config = load(SMALL);
    recomputed_config.solver.method = Method::MasterEquation;
    let recomputed = Orchestrator::new(recomputed_config)
        .unwrap()
        .run_scenario(Scenario::FeedbackCooling)
        .unwrap();

    assert_ne!(accumulating.mean_photon_number, recomputed.mean_photon_number);
    // the cavity-only run never sees the feedback mode
    let cavity_a = orchestrator.run_scenario(Scenario::CavityCooling).unwrap();
    let cavity_r = Orchestrator::new(load(SMALL))
        .unwrap()
        .run_scenario_with(Scenario::CavityCooling, Method::MasterEquation)
        .unwrap();
    assert_eq!(cavity_a.mean_photon_number, cavity_r.mean_photon_number);
}

#[test]
fn test_invalid_yaml_values_fail_before_simulation() {
    let config = load("system:\n  kappa: -0.5\n");
    match Orchestrator::new(config) {
        Err(Error::Configuration(e)) => assert!(e.to_string().contains("kappa")),
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("negative kappa accepted"),
    }
}

#[test]
fn test_cancellation_stops_every_scenario() {
    let token = CancellationToken::new();
    let orchestrator = Orchestrator::new(load(SMALL))
        .unwrap()
        .with_cancellation(token.clone());
    token.cancel();
    let comparison = orchestrator.run_all();
    assert_eq!(comparison.failures.len(), 3);
    assert!(matches!(comparison.into_result(), Err(Error::Cancelled)));
}

#[test]
fn test_default_cross_check_within_five_percent() {
    // N=10, 1000 points, 500 trajectories
    let config = Config::default();
    assert_eq!(config.solver.num_trajectories, 500);
    let check = Orchestrator::new(config)
        .unwrap()
        .cross_check(Scenario::CavityCooling)
        .unwrap();
    assert_eq!(check.trajectories, 500);
    assert!(
        check.max_relative_deviation < 0.05,
        "relative deviation {}",
        check.max_relative_deviation
    );
}

#[test]
fn test_accumulating_feedback_modes_agree() {
    let mut config = Config::default();
    config.system.feedback_gain = 0.02;
    config.solver.feedback_mode = FeedbackMode::Accumulating;
    let orchestrator = Orchestrator::new(config).unwrap();
    let check = orchestrator.cross_check(Scenario::FeedbackCooling).unwrap();
    assert!(
        check.max_relative_deviation < 0.08,
        "relative deviation {}",
        check.max_relative_deviation
    );

    // the pre-summed record moves the dynamics away from the cavity-only run
    let cavity = orchestrator
        .run_scenario_with(Scenario::CavityCooling, Method::MasterEquation)
        .unwrap();
    assert_ne!(cavity.mean_photon_number, check.master_equation);
}
