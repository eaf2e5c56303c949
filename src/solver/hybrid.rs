//! Phase C: the hybrid solver that chains global search, local refinement and
//! validation for one process context.

use tracing::trace;

use crate::domain::{DecisionBounds, EpsilonMap, ObjectiveSpec, ObjectiveVector, ProcessContext, Solution};
use crate::models::PerformanceModel;
use crate::solver::{
    ConstraintSet, GlobalOutcome, LocalOutcome, SolveOutcome, SolverConfig, SubproblemSolver, augmented_lagrangian,
    differential_evolution,
};

/// Which phase produced the accepted point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptedPhase {
    Local,
    Global,
}

/// Everything the three phases produced for one subproblem.
#[derive(Debug, Clone)]
pub struct HybridReport {
    pub global: GlobalOutcome,
    pub local: LocalOutcome,
    pub accepted: Option<AcceptedPhase>,
    pub outcome: SolveOutcome,
}

/// Two-phase constrained solver bound to one model, context and decision box.
#[derive(Debug, Clone)]
pub struct HybridSolver<'m, M: PerformanceModel> {
    model: &'m M,
    context: ProcessContext,
    bounds: DecisionBounds,
    config: SolverConfig,
}

impl<'m, M: PerformanceModel> HybridSolver<'m, M> {
    pub fn new(model: &'m M, context: ProcessContext, bounds: DecisionBounds, config: SolverConfig) -> Self {
        Self {
            model,
            context,
            bounds,
            config,
        }
    }

    fn objectives(&self, x: &[f64]) -> ObjectiveVector {
        self.model.objectives(x, &self.context)
    }

    /// Keep the validated candidate with the best primary value; earlier
    /// candidates win ties.
    fn validate<'x>(
        &self,
        primary: ObjectiveSpec,
        constraints: &ConstraintSet<'_>,
        candidates: impl IntoIterator<Item = (AcceptedPhase, &'x Vec<f64>)>,
    ) -> (Option<AcceptedPhase>, SolveOutcome) {
        let mut best: Option<(AcceptedPhase, Solution)> = None;
        for (phase, x) in candidates {
            let o = self.objectives(x);
            if !constraints.is_feasible(&o) {
                continue;
            }
            let better = best.as_ref().is_none_or(|(_, b)| {
                primary
                    .direction
                    .is_better(o.get(primary.metric), b.objectives.get(primary.metric))
            });
            if better {
                best = Some((
                    phase,
                    Solution {
                        decision: x.clone(),
                        objectives: o,
                        feasible: true,
                    },
                ));
            }
        }
        match best {
            Some((phase, solution)) => (Some(phase), SolveOutcome::Feasible(solution)),
            None => (None, SolveOutcome::Infeasible),
        }
    }

    /// Run all phases and keep the intermediate outcomes.
    pub fn solve_detailed(&self, primary: ObjectiveSpec, epsilon: &EpsilonMap) -> HybridReport {
        let constraints = ConstraintSet::new(&self.config.floor, epsilon, self.config.epsilon_tolerance);
        let sign = primary.direction.sign();
        let weight = self.config.penalty_weight;

        // Phase A
        let global = differential_evolution(
            |x: &[f64]| {
                let o = self.objectives(x);
                sign * o.get(primary.metric) + weight * constraints.penalty(&o)
            },
            &self.bounds,
            &self.config.global,
        );
        trace!(
            metric = %primary.metric,
            score = global.score,
            generations = global.generations,
            converged = global.converged,
            "global phase finished"
        );

        // Phase B
        let local = augmented_lagrangian(
            |x: &[f64]| {
                let o = self.objectives(x);
                (sign * o.get(primary.metric), constraints.inequalities(&o))
            },
            &self.bounds,
            &global.x,
            &self.config.local,
        );
        trace!(
            metric = %primary.metric,
            objective = local.objective,
            violation = local.max_violation,
            outer_iterations = local.outer_iterations,
            converged = local.converged,
            "local phase finished"
        );

        // Phase C
        let (accepted, outcome) = self.validate(
            primary,
            &constraints,
            [(AcceptedPhase::Local, &local.x), (AcceptedPhase::Global, &global.x)],
        );
        trace!(metric = %primary.metric, accepted = ?accepted, "validation finished");

        HybridReport {
            global,
            local,
            accepted,
            outcome,
        }
    }
}

impl<M: PerformanceModel> SubproblemSolver for HybridSolver<'_, M> {
    fn solve(&self, primary: ObjectiveSpec, epsilon: &EpsilonMap) -> SolveOutcome {
        self.solve_detailed(primary, epsilon).outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, Metric};
    use crate::models::{LpbfModel, MetricTuple};

    /// Dense only up to 420 W and cost keeps falling with power, so the
    /// density edge is a cliff the gradient phase cannot see.
    struct DensityCliff;

    impl PerformanceModel for DensityCliff {
        fn evaluate(&self, x: &[f64], _context: &ProcessContext) -> MetricTuple {
            let p = x[0];
            MetricTuple {
                cost: -(0.3 * (p - 421.0)).exp(),
                carbon: 1.0,
                relative_density: if p <= 420.0 { 99.6 } else { 97.0 },
                energy_density: 50.0,
            }
        }
    }

    fn cliff_solver(model: &DensityCliff) -> HybridSolver<'_, DensityCliff> {
        let mut config = SolverConfig::default();
        config.global.max_generations = 5;
        let bounds = DecisionBounds::new(vec![(385.0, 460.0)]).unwrap();
        HybridSolver::new(model, ProcessContext::new(100.0), bounds, config)
    }

    fn solver(model: &LpbfModel, bounds: DecisionBounds) -> HybridSolver<'_, LpbfModel> {
        HybridSolver::new(model, ProcessContext::new(100.0), bounds, SolverConfig::default())
    }

    #[test]
    fn cost_alone_is_feasible_and_on_density_floor() {
        let model = LpbfModel::new();
        let s = solver(&model, DecisionBounds::lpbf_default());
        let out = s.solve(ObjectiveSpec::new(Metric::Cost, Direction::Min), &EpsilonMap::new());
        let sol = out.solution().expect("cost row should be feasible");
        assert!(sol.objectives.relative_density >= 99.45);
        assert!(sol.objectives.cost < 4.0, "cost={}", sol.objectives.cost);
        assert!(DecisionBounds::lpbf_default().contains(&sol.decision));
    }

    #[test]
    fn unreachable_epsilon_bound_is_infeasible() {
        let model = LpbfModel::new();
        let s = solver(&model, DecisionBounds::lpbf_default());
        let mut eps = EpsilonMap::new();
        eps.insert(ObjectiveSpec::new(Metric::Cost, Direction::Min), 1.0);
        let report = s.solve_detailed(ObjectiveSpec::new(Metric::Carbon, Direction::Min), &eps);
        assert_eq!(report.outcome, SolveOutcome::Infeasible);
        assert_eq!(report.accepted, None);
    }

    #[test]
    fn pinned_bounds_return_the_single_point() {
        let model = LpbfModel::new();
        let bounds = DecisionBounds::new(vec![(460.0, 460.0), (700.0, 700.0), (90.0, 90.0)]).unwrap();
        let s = solver(&model, bounds);
        let out = s.solve(ObjectiveSpec::new(Metric::Efficiency, Direction::Max), &EpsilonMap::new());
        let sol = out.solution().expect("dense corner is feasible");
        assert_eq!(sol.decision, vec![460.0, 700.0, 90.0]);
    }

    #[test]
    fn solving_is_deterministic() {
        let model = LpbfModel::new();
        let s = solver(&model, DecisionBounds::lpbf_default());
        let spec = ObjectiveSpec::new(Metric::Carbon, Direction::Min);
        assert_eq!(s.solve(spec, &EpsilonMap::new()), s.solve(spec, &EpsilonMap::new()));
    }

    #[test]
    fn global_point_is_kept_when_local_point_leaves_the_floor() {
        let model = DensityCliff;
        let s = cliff_solver(&model);
        let report = s.solve_detailed(ObjectiveSpec::new(Metric::Cost, Direction::Min), &EpsilonMap::new());

        assert!(report.local.x[0] > 420.0, "local x={:?}", report.local.x);
        assert_eq!(report.accepted, Some(AcceptedPhase::Global));
        let sol = report.outcome.solution().expect("global point is dense");
        assert!(sol.decision[0] <= 420.0);
        assert_eq!(sol.decision, report.global.x);
    }

    #[test]
    fn validation_prefers_the_better_feasible_candidate() {
        let model = DensityCliff;
        let s = cliff_solver(&model);
        let eps = EpsilonMap::new();
        let constraints = ConstraintSet::new(&s.config.floor, &eps, s.config.epsilon_tolerance);
        let cost = ObjectiveSpec::new(Metric::Cost, Direction::Min);
        let (local, global) = (vec![400.0], vec![415.0]);

        let (accepted, outcome) =
            s.validate(cost, &constraints, [(AcceptedPhase::Local, &local), (AcceptedPhase::Global, &global)]);
        assert_eq!(accepted, Some(AcceptedPhase::Global));
        assert_eq!(outcome.solution().unwrap().decision, global);

        // Ties go to the local point.
        let (accepted, _) =
            s.validate(cost, &constraints, [(AcceptedPhase::Local, &global), (AcceptedPhase::Global, &global)]);
        assert_eq!(accepted, Some(AcceptedPhase::Local));

        let (thin_local, thin_global) = (vec![450.0], vec![440.0]);
        let (accepted, outcome) = s.validate(
            cost,
            &constraints,
            [(AcceptedPhase::Local, &thin_local), (AcceptedPhase::Global, &thin_global)],
        );
        assert_eq!(accepted, None);
        assert_eq!(outcome, SolveOutcome::Infeasible);
    }
}
