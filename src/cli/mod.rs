//! Command-line parsing for the AUGMECON-R runner.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! solver and controller code; `app` turns these arguments into a `RunConfig`.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "augmecon",
    version,
    about = "Augmented epsilon-constraint (AUGMECON-R) optimization of LPBF process parameters"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build payoff tables and walk the epsilon grid for every layer thickness.
    Run(RunArgs),
    /// Build and print payoff tables only.
    Payoff(RunArgs),
}

/// Options shared by `run` and `payoff`. Unset flags keep the run-file value.
#[derive(Debug, Args, Clone, Default)]
pub struct RunArgs {
    /// TOML run file (defaults are used for anything it omits).
    #[arg(short, long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Grid intervals per constrained objective (cells per axis = N + 1).
    #[arg(short = 'g', long)]
    pub grid_points: Option<usize>,

    /// Layer thickness context in µm; repeat for several contexts.
    #[arg(short = 'l', long = "layer-thickness", value_name = "UM")]
    pub layer_thickness: Vec<f64>,

    /// Objective as NAME:DIR (e.g. Cost:min); repeat, first is primary.
    #[arg(short = 'o', long = "objective", value_name = "NAME:DIR")]
    pub objective: Vec<String>,

    /// Disable the slack-jump shortcut.
    #[arg(long)]
    pub no_slack_jump: bool,

    /// Disable early exit after an infeasible cell.
    #[arg(long)]
    pub no_early_exit: bool,

    /// Require the energy density to stay within [MIN, MAX] J/mm³.
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    pub energy_density_window: Option<Vec<f64>>,

    /// Seed of the global search.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write all reports as JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}
