//! Grid controller: payoff table, grids, and the pruned grid walk.
//!
//! One controller owns every per-run table, so independent controllers (one
//! per process context) can run in parallel without sharing state.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::augmecon::{Grid, GridIndex, PayoffTable, RangePolicy, ResultCollector, RunReport};
use crate::domain::{EpsilonMap, ObjectiveSet, ProcessContext};
use crate::error::{Error, Result};
use crate::solver::{SolveOutcome, SubproblemSolver};

/// Which monotonicity-based shortcuts the walk may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruningConfig {
    /// Skip innermost cells the last solution's slack already covers.
    pub slack_jump: bool,
    /// Skip the rest of the innermost sweep after an infeasible cell.
    pub early_exit: bool,
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            slack_jump: true,
            early_exit: true,
        }
    }
}

impl PruningConfig {
    pub fn exhaustive() -> Self {
        Self {
            slack_jump: false,
            early_exit: false,
        }
    }
}

#[derive(Debug, Clone)]
struct Configured {
    objectives: ObjectiveSet,
    grid_points: usize,
}

pub struct GridController<S: SubproblemSolver> {
    solver: S,
    context: ProcessContext,
    pruning: PruningConfig,
    range_policy: RangePolicy,
    configured: Option<Configured>,
}

impl<S: SubproblemSolver> GridController<S> {
    pub fn new(solver: S, context: ProcessContext) -> Self {
        Self {
            solver,
            context,
            pruning: PruningConfig::default(),
            range_policy: RangePolicy::default(),
            configured: None,
        }
    }

    pub fn with_pruning(mut self, pruning: PruningConfig) -> Self {
        self.pruning = pruning;
        self
    }

    pub fn with_range_policy(mut self, policy: RangePolicy) -> Self {
        self.range_policy = policy;
        self
    }

    /// Fix the objective set (first = primary) and the grid resolution.
    pub fn configure(&mut self, objectives: ObjectiveSet, grid_points: usize) -> Result<()> {
        if objectives.constrained().is_empty() {
            return Err(Error::InvalidObjectiveSet(
                "a grid run needs at least one constrained objective".into(),
            ));
        }
        if grid_points == 0 {
            return Err(Error::InvalidConfig("grid_points must be >= 1".into()));
        }
        self.configured = Some(Configured {
            objectives,
            grid_points,
        });
        Ok(())
    }

    fn configuration(&self) -> Result<&Configured> {
        self.configured
            .as_ref()
            .ok_or_else(|| Error::InvalidConfig("controller used before configure()".into()))
    }

    /// Payoff table for the configured objectives (no grid walk).
    pub fn payoff_table(&self) -> Result<PayoffTable> {
        let cfg = self.configuration()?;
        PayoffTable::build(&self.solver, &cfg.objectives, &self.range_policy)
    }

    /// Build the payoff table and grids, then walk every reachable cell.
    pub fn run(&self) -> Result<RunReport> {
        let cfg = self.configuration()?;
        let objectives = &cfg.objectives;
        let primary = objectives.primary();
        let constrained = objectives.constrained();
        info!(context = %self.context.label(), primary = %primary.metric, "run started");

        let payoff = self.payoff_table()?;
        let grids = constrained
            .iter()
            .map(|spec| {
                let range = payoff.range(spec.metric).ok_or_else(|| {
                    Error::InvalidObjectiveSet(format!("no payoff range for '{}'", spec.metric))
                })?;
                Grid::from_range(range, cfg.grid_points)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut index = GridIndex::new(grids.len(), cfg.grid_points);
        let mut collector = ResultCollector::new(index.cell_count());
        let innermost = grids.len() - 1;

        while !index.is_done() {
            let mut epsilon = EpsilonMap::new();
            for (grid, &k) in grids.iter().zip(index.digits()) {
                epsilon.insert(grid.objective, grid.value(k));
            }

            let remaining = index.remaining_innermost();
            let outcome = self.solver.solve(primary, &epsilon);
            let advance = match &outcome {
                SolveOutcome::Feasible(sol) if self.pruning.slack_jump => {
                    let grid = &grids[innermost];
                    let slack = epsilon
                        .get(grid.objective.metric)
                        .map_or(0.0, |c| c.slack(sol.objectives.get(c.metric)));
                    slack_jump(slack, grid.step, remaining)
                }
                SolveOutcome::Infeasible if self.pruning.early_exit => remaining + 1,
                _ => 1,
            };

            debug!(
                index = ?index.digits(),
                epsilon = ?epsilon,
                feasible = outcome.is_feasible(),
                advance,
                "grid cell"
            );

            let digits = index.digits().to_vec();
            match outcome {
                SolveOutcome::Feasible(sol) => collector.record_feasible(&digits, epsilon, sol, advance),
                SolveOutcome::Infeasible => collector.record_infeasible(&digits, epsilon, advance),
            }
            index.advance_innermost(advance);
        }

        let counts = collector.counts();
        info!(
            context = %self.context.label(),
            solved = counts.solved,
            skipped = counts.skipped,
            visited = counts.visited,
            pruned = counts.pruned(),
            "run finished"
        );

        Ok(collector.finish(self.context, objectives.clone(), payoff, grids))
    }
}

/// Innermost advance after a feasible cell: `max(1, floor(slack / step) + 1)`,
/// capped so the index lands at most one past the end of the sweep.
fn slack_jump(slack: f64, step: f64, remaining: usize) -> usize {
    let cap = remaining + 1;
    if !(slack.is_finite() && step > 0.0) {
        return 1;
    }
    let jump = (slack / step).floor();
    if jump >= cap as f64 {
        cap
    } else {
        (jump as usize + 1).clamp(1, cap)
    }
}
