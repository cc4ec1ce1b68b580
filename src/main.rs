// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Cavity cooling simulator
//!
//! Runs the cavity, feedback and combined cooling scenarios and reports the
//! mean photon number of each.
//!
//! # Usage
//!
//! ```bash
//! # All three scenarios with default configuration
//! cavity-cooling run
//!
//! # One scenario, deterministic master equation, JSON output
//! cavity-cooling run --scenario feedback --method master_equation --json
//!
//! # Compare the trajectory ensemble against the master equation
//! cavity-cooling cross-check --trajectories 1000
//!
//! # Show effective configuration
//! cavity-cooling config --config cavity-cooling.yaml
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cavity_cooling_sim::config::{Config, Method};
use cavity_cooling_sim::error::ValidationError;
use cavity_cooling_sim::{Error, Orchestrator, Result, Scenario, ScenarioReport, VERSION};

/// Cavity and feedback cooling simulator
#[derive(Parser)]
#[command(name = "cavity-cooling")]
#[command(author = "QubitOS Contributors")]
#[command(version = VERSION)]
#[command(about = "Compare cavity, feedback and combined cooling of an atom-cavity system")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Trajectories per ensemble
    #[arg(long, global = true, env = "CAVITY_SIM_TRAJECTORIES")]
    trajectories: Option<usize>,

    /// Base random seed
    #[arg(long, global = true, env = "CAVITY_SIM_SEED")]
    seed: Option<u64>,

    /// Evolution method (monte_carlo, master_equation)
    #[arg(long, global = true)]
    method: Option<String>,

    /// Print machine-readable JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the cooling scenarios
    Run {
        /// Run only this scenario (cavity, feedback, combined)
        #[arg(short, long)]
        scenario: Option<String>,
    },

    /// Run both evolution methods and compare the photon number
    CrossCheck {
        /// Check only this scenario (cavity, feedback, combined)
        #[arg(short, long)]
        scenario: Option<String>,
    },

    /// Show effective configuration
    Config,

    /// Validate configuration file
    Validate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(cli.config.as_deref())?;

    // Override config with CLI args
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(n) = cli.trajectories {
        config.solver.num_trajectories = n;
    }
    if let Some(seed) = cli.seed {
        config.solver.seed = seed;
    }
    if let Some(name) = &cli.method {
        config.solver.method = Method::from_name(name).ok_or_else(|| {
            Error::from(ValidationError::Field {
                field: "method".into(),
                message: format!("unknown method '{}'", name),
            })
        })?;
    }

    init_logging(&config.logging.level, &config.logging.format);

    match cli.command {
        Commands::Run { scenario } => {
            let scenarios = select_scenarios(scenario.as_deref())?;
            info!(
                version = VERSION,
                method = config.solver.method.as_str(),
                trajectories = config.solver.num_trajectories,
                seed = config.solver.seed,
                "Starting cooling comparison"
            );
            let orchestrator = Orchestrator::new(config)?;

            let comparison = if scenarios.len() == Scenario::ALL.len() {
                orchestrator.run_all()
            } else {
                let mut reports = Vec::new();
                for s in scenarios {
                    reports.push(orchestrator.run_scenario(s)?);
                }
                print_reports(&reports, cli.json)?;
                return Ok(());
            };

            if cli.json {
                print_json(&comparison)?;
            } else {
                print_table(&comparison.reports);
                for failure in &comparison.failures {
                    eprintln!("{}: Error - {}", failure.scenario, failure.error);
                }
            }

            if let Some(e) = comparison.first_error() {
                error!(error = %e, "Cooling comparison incomplete");
                std::process::exit(1);
            }
        }

        Commands::CrossCheck { scenario } => {
            let scenarios = select_scenarios(scenario.as_deref())?;
            let orchestrator = Orchestrator::new(config)?;

            let mut checks = Vec::new();
            for s in scenarios {
                checks.push(orchestrator.cross_check(s)?);
            }

            if cli.json {
                print_json(&checks)?;
            } else {
                println!(
                    "{:<18} {:>12} {:>14} {:>14}",
                    "Scenario", "Trajectories", "Max |Δn|", "Max rel. dev."
                );
                for c in &checks {
                    println!(
                        "{:<18} {:>12} {:>14.6} {:>14.4}",
                        c.scenario.name(),
                        c.trajectories,
                        c.max_abs_deviation,
                        c.max_relative_deviation
                    );
                }
            }
        }

        Commands::Config => {
            println!("{}", serde_yaml::to_string(&config)?);
        }

        Commands::Validate => match config.validate() {
            Ok(()) => {
                println!("Configuration is valid");
            }
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

/// Initialize logging with tracing. Logs go to stderr so stdout stays clean
/// for reports.
fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn select_scenarios(name: Option<&str>) -> Result<Vec<Scenario>> {
    match name {
        None => Ok(Scenario::ALL.to_vec()),
        Some(name) => Scenario::from_name(name).map(|s| vec![s]).ok_or_else(|| {
            ValidationError::Field {
                field: "scenario".into(),
                message: format!("unknown scenario '{}' (cavity, feedback, combined)", name),
            }
            .into()
        }),
    }
}

fn print_reports(reports: &[ScenarioReport], json: bool) -> Result<()> {
    if json {
        print_json(&reports)
    } else {
        print_table(reports);
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_table(reports: &[ScenarioReport]) {
    println!(
        "{:<18} {:<16} {:>12} {:>12} {:>8} {:>12}",
        "Scenario", "Method", "Final ⟨n⟩", "Peak ⟨n⟩", "t_peak", "Late ⟨n⟩"
    );
    for r in reports {
        println!(
            "{:<18} {:<16} {:>12.6} {:>12.6} {:>8.3} {:>12.6}",
            r.scenario.name(),
            r.method.as_str(),
            r.final_metric,
            r.peak_value,
            r.peak_time,
            r.long_time_average
        );
    }
}
