//! Shared multi-context pipeline used by the `run` and `payoff` commands.
//!
//! One controller + solver pair is built per process context. Contexts share
//! nothing mutable, so they run on the rayon pool; a context that fails (e.g.
//! no payoff row at all) is reported without stopping the others.

use rayon::prelude::*;
use tracing::{info, warn};

use crate::augmecon::{GridController, PayoffTable, RunReport};
use crate::domain::ProcessContext;
use crate::error::Result;
use crate::io::RunConfig;
use crate::models::PerformanceModel;
use crate::solver::HybridSolver;

/// Outcome of one context.
#[derive(Debug, Clone)]
pub struct ContextRun<T> {
    pub context: ProcessContext,
    pub result: Result<T>,
}

impl<T> ContextRun<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

fn controller<'m, M: PerformanceModel>(
    model: &'m M,
    context: ProcessContext,
    config: &RunConfig,
) -> Result<GridController<HybridSolver<'m, M>>> {
    let solver = HybridSolver::new(model, context, config.decision_bounds()?, config.solver.clone());
    let mut controller = GridController::new(solver, context)
        .with_pruning(config.pruning)
        .with_range_policy(config.range);
    controller.configure(config.objective_set()?, config.grid_points)?;
    Ok(controller)
}

fn log_failure<T>(run: &ContextRun<T>) {
    if let Err(err) = &run.result {
        warn!(context = %run.context.label(), error = %err, "context failed");
    }
}

/// Full grid run for every configured context, in configuration order.
///
/// Configuration errors are returned before any context starts.
pub fn run_contexts<M: PerformanceModel>(model: &M, config: &RunConfig) -> Result<Vec<ContextRun<RunReport>>> {
    config.validate()?;
    info!(contexts = config.layer_thicknesses_um.len(), grid_points = config.grid_points, "pipeline started");

    let runs: Vec<ContextRun<RunReport>> = config
        .contexts()
        .into_par_iter()
        .map(|context| ContextRun {
            context,
            result: controller(model, context, config).and_then(|c| c.run()),
        })
        .collect();

    runs.iter().for_each(log_failure);
    Ok(runs)
}

/// Payoff tables only.
pub fn payoff_contexts<M: PerformanceModel>(model: &M, config: &RunConfig) -> Result<Vec<ContextRun<PayoffTable>>> {
    config.validate()?;

    let runs: Vec<ContextRun<PayoffTable>> = config
        .contexts()
        .into_par_iter()
        .map(|context| ContextRun {
            context,
            result: controller(model, context, config).and_then(|c| c.payoff_table()),
        })
        .collect();

    runs.iter().for_each(log_failure);
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ObjectiveVector;
    use crate::error::Error;
    use crate::io::ObjectiveEntry;
    use crate::models::{LpbfModel, MetricTuple};

    /// Dense only for thin layers; thick-layer contexts have no feasible point.
    struct ThinLayerOnly;

    impl PerformanceModel for ThinLayerOnly {
        fn evaluate(&self, x: &[f64], context: &ProcessContext) -> MetricTuple {
            let thin = context.layer_thickness_um < 110.0;
            MetricTuple {
                cost: x[0] / 100.0 + x[1] / 1000.0,
                carbon: 1.0 / x[1],
                relative_density: if thin { 99.8 } else { 90.0 },
                energy_density: 50.0,
            }
        }
    }

    fn small_config() -> RunConfig {
        let mut cfg = RunConfig {
            objectives: vec![ObjectiveEntry::new("Cost", "min"), ObjectiveEntry::new("Carbon", "min")],
            grid_points: 2,
            layer_thicknesses_um: vec![80.0, 120.0, 100.0],
            ..RunConfig::default()
        };
        cfg.solver.global.max_generations = 10;
        cfg
    }

    #[test]
    fn failed_context_does_not_stop_others() {
        let runs = run_contexts(&ThinLayerOnly, &small_config()).unwrap();
        let lts: Vec<f64> = runs.iter().map(|r| r.context.layer_thickness_um).collect();
        assert_eq!(lts, vec![80.0, 120.0, 100.0]);

        assert!(runs[0].is_ok());
        assert!(runs[2].is_ok());
        assert_eq!(
            runs[1].result.as_ref().unwrap_err(),
            &Error::UnrecoverablePayoffFailure {
                objective: "Cost".into()
            }
        );
    }

    #[test]
    fn invalid_config_fails_before_any_context() {
        let cfg = RunConfig {
            grid_points: 0,
            ..small_config()
        };
        assert!(run_contexts(&ThinLayerOnly, &cfg).is_err());
        assert!(payoff_contexts(&ThinLayerOnly, &cfg).is_err());
    }

    #[test]
    fn payoff_rows_come_from_the_real_model() {
        let cfg = RunConfig {
            layer_thicknesses_um: vec![100.0],
            ..RunConfig::default()
        };
        let runs = payoff_contexts(&LpbfModel::new(), &cfg).unwrap();
        let table = runs[0].result.as_ref().unwrap();
        assert_eq!(table.rows.len(), 3);
        let row: &ObjectiveVector = &table.row(crate::domain::Metric::Cost).unwrap().vector;
        assert!(row.relative_density >= 99.45);
    }

    #[test]
    fn default_contexts_each_yield_a_mutually_non_dominated_set() {
        let cfg = RunConfig::default();
        let objectives = cfg.objective_set().unwrap();
        let runs = run_contexts(&LpbfModel::new(), &cfg).unwrap();
        let lts: Vec<f64> = runs.iter().map(|r| r.context.layer_thickness_um).collect();
        assert_eq!(lts, vec![80.0, 100.0, 120.0]);

        for run in &runs {
            let report = run.result.as_ref().unwrap();
            assert!(!report.solutions.is_empty(), "{}", run.context.label());
            for a in &report.solutions {
                assert!(a.objectives.relative_density >= 99.45);
                for b in &report.solutions {
                    assert!(
                        !a.strictly_dominates(b, objectives.specs(), 1e-3),
                        "{}: {:?} strictly dominates {:?}",
                        run.context.label(),
                        a.objectives,
                        b.objectives
                    );
                }
            }
        }
    }
}
