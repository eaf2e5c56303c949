//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - installs the tracing subscriber
//! - layers defaults, the run file and CLI flags into a `RunConfig`
//! - runs every context and prints reports
//! - writes the optional JSON export

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, RunArgs};
use crate::domain::ObjectiveSpec;
use crate::error::{AppError, Error};
use crate::io::{ContextFailure, ExportDocument, ObjectiveEntry, RunConfig};
use crate::models::LpbfModel;

pub mod pipeline;

/// Entry point for the `augmecon` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run(args) => handle_run(&args),
        Command::Payoff(args) => handle_payoff(&args),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when embedded; keep the existing one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

fn handle_run(args: &RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(args)?;
    let model = LpbfModel::new();
    let runs = pipeline::run_contexts(&model, &config)?;

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for run in runs {
        match run.result {
            Ok(report) => {
                println!("{}", crate::report::format_payoff_table(&report.context, &report.payoff));
                println!("{}", crate::report::format_run_summary(&report));
                reports.push(report);
            }
            Err(err) => {
                eprint!("{}", crate::report::format_context_failure(&run.context, &err));
                failures.push(ContextFailure {
                    layer_thickness_um: run.context.layer_thickness_um,
                    error: err.to_string(),
                });
            }
        }
    }

    let (succeeded, failed) = (reports.len(), failures.len());
    if let Some(path) = &args.export {
        let doc = ExportDocument::new(config, reports, failures);
        crate::io::write_export_json(path, &doc)?;
    }

    all_failed_check(succeeded, failed)
}

fn handle_payoff(args: &RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(args)?;
    let runs = pipeline::payoff_contexts(&LpbfModel::new(), &config)?;

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    for run in &runs {
        match &run.result {
            Ok(table) => {
                succeeded += 1;
                println!("{}", crate::report::format_payoff_table(&run.context, table));
            }
            Err(err) => {
                failed += 1;
                eprint!("{}", crate::report::format_context_failure(&run.context, err));
            }
        }
    }
    all_failed_check(succeeded, failed)
}

fn all_failed_check(succeeded: usize, failed: usize) -> Result<(), AppError> {
    if succeeded == 0 && failed > 0 {
        return Err(AppError::new(3, format!("all {failed} context(s) failed")));
    }
    Ok(())
}

/// Layer defaults, the optional run file and CLI flags (last wins).
pub fn run_config_from_args(args: &RunArgs) -> Result<RunConfig, Error> {
    let mut config = match &args.config {
        Some(path) => crate::io::load_run_file(path)?,
        None => RunConfig::default(),
    };

    if let Some(gp) = args.grid_points {
        config.grid_points = gp;
    }
    if !args.layer_thickness.is_empty() {
        config.layer_thicknesses_um = args.layer_thickness.clone();
    }
    if !args.objective.is_empty() {
        config.objectives = args
            .objective
            .iter()
            .map(|pair| {
                let spec = ObjectiveSpec::parse_pair(pair)?;
                Ok(ObjectiveEntry::new(spec.metric.name(), spec.direction.label()))
            })
            .collect::<Result<Vec<_>, Error>>()?;
    }
    if args.no_slack_jump {
        config.pruning.slack_jump = false;
    }
    if args.no_early_exit {
        config.pruning.early_exit = false;
    }
    if let Some(window) = &args.energy_density_window {
        if let [lo, hi] = window.as_slice() {
            config.solver.floor.energy_density_window = Some((*lo, *hi));
        }
    }
    if let Some(seed) = args.seed {
        config.solver.global.seed = seed;
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = RunArgs {
            grid_points: Some(3),
            layer_thickness: vec![100.0],
            objective: vec!["Carbon:min".into(), "Cost:min".into()],
            no_early_exit: true,
            energy_density_window: Some(vec![30.0, 80.0]),
            seed: Some(9),
            ..RunArgs::default()
        };
        let cfg = run_config_from_args(&args).unwrap();
        assert_eq!(cfg.grid_points, 3);
        assert_eq!(cfg.layer_thicknesses_um, vec![100.0]);
        assert_eq!(cfg.objectives[0], ObjectiveEntry::new("Carbon", "min"));
        assert!(cfg.pruning.slack_jump);
        assert!(!cfg.pruning.early_exit);
        assert_eq!(cfg.solver.floor.energy_density_window, Some((30.0, 80.0)));
        assert_eq!(cfg.solver.global.seed, 9);
    }

    #[test]
    fn malformed_objective_pair_is_a_config_error() {
        let args = RunArgs {
            objective: vec!["Cost".into(), "Carbon:min".into()],
            ..RunArgs::default()
        };
        let err = run_config_from_args(&args).unwrap_err();
        assert_eq!(AppError::from(err).exit_code(), 2);
    }

    #[test]
    fn unknown_objective_name_fails_fast() {
        let args = RunArgs {
            objective: vec!["Cost:min".into(), "Noise:min".into()],
            ..RunArgs::default()
        };
        assert_eq!(
            run_config_from_args(&args),
            Err(Error::UnknownObjective("Noise".into()))
        );
    }

    #[test]
    fn only_total_failure_is_fatal() {
        assert!(all_failed_check(1, 2).is_ok());
        assert_eq!(all_failed_check(0, 2).unwrap_err().exit_code(), 3);
        assert!(all_failed_check(0, 0).is_ok());
    }
}
