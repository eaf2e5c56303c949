//! Constrained single-objective subproblem solver.
//!
//! Responsibilities:
//!
//! - turn a physical floor + epsilon map into penalty / inequality form (`constraints`)
//! - global population search on the penalised score (`global`)
//! - exact-constraint local refinement (`local`)
//! - validation and fallback between the two phases (`hybrid`)

pub mod constraints;
pub mod global;
pub mod hybrid;
pub mod local;

pub use constraints::*;
pub use global::*;
pub use hybrid::*;
pub use local::*;

use serde::{Deserialize, Serialize};

use crate::domain::{EpsilonMap, ObjectiveSpec, Solution, Tolerance};

/// Result of one subproblem.
///
/// Infeasibility is an expected outcome (the cell is physically unreachable),
/// not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Feasible(Solution),
    Infeasible,
}

impl SolveOutcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            SolveOutcome::Feasible(s) => Some(s),
            SolveOutcome::Infeasible => None,
        }
    }

    pub fn is_feasible(&self) -> bool {
        matches!(self, SolveOutcome::Feasible(_))
    }
}

/// Optimize `primary` subject to the physical floor and every bound in `epsilon`.
///
/// An empty `epsilon` map means "optimize alone" (payoff-table rows).
pub trait SubproblemSolver {
    fn solve(&self, primary: ObjectiveSpec, epsilon: &EpsilonMap) -> SolveOutcome;
}

impl<S: SubproblemSolver + ?Sized> SubproblemSolver for &S {
    fn solve(&self, primary: ObjectiveSpec, epsilon: &EpsilonMap) -> SolveOutcome {
        (**self).solve(primary, epsilon)
    }
}

/// Full solver configuration (every field defaulted for TOML run files).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub global: GlobalConfig,
    pub local: LocalConfig,
    pub floor: PhysicalFloor,
    /// Weight on squared constraint excess in the global score.
    pub penalty_weight: f64,
    /// Acceptance tolerance for epsilon bounds during validation.
    pub epsilon_tolerance: Tolerance,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            global: GlobalConfig::default(),
            local: LocalConfig::default(),
            floor: PhysicalFloor::default(),
            penalty_weight: 1e6,
            epsilon_tolerance: Tolerance::default(),
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;

        let g = &self.global;
        if g.popsize_multiplier == 0 {
            return Err(Error::InvalidConfig("solver.global.popsize_multiplier must be > 0".into()));
        }
        if !(0.0 < g.mutation.0 && g.mutation.0 <= g.mutation.1 && g.mutation.1 <= 2.0) {
            return Err(Error::InvalidConfig(format!(
                "solver.global.mutation must satisfy 0 < lo <= hi <= 2, got {:?}",
                g.mutation
            )));
        }
        if !(0.0..=1.0).contains(&g.recombination) {
            return Err(Error::InvalidConfig("solver.global.recombination must be in [0, 1]".into()));
        }
        if self.local.max_inner_iterations == 0 || self.local.max_outer_iterations == 0 {
            return Err(Error::InvalidConfig("solver.local iteration limits must be > 0".into()));
        }
        if !(self.penalty_weight.is_finite() && self.penalty_weight > 0.0) {
            return Err(Error::InvalidConfig("solver.penalty_weight must be positive".into()));
        }
        if let Some((lo, hi)) = self.floor.energy_density_window {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(Error::InvalidConfig(format!(
                    "energy density window must satisfy min < max, got [{lo}, {hi}]"
                )));
            }
        }
        Ok(())
    }
}
