//! Payoff table: each objective optimized alone, giving ideal / nadir ranges.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{EpsilonMap, Metric, ObjectiveSet, ObjectiveSpec, ObjectiveVector};
use crate::error::{Error, Result};
use crate::solver::{SolveOutcome, SubproblemSolver};

/// How a zero-length objective range is widened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangePolicy {
    /// `|ideal - nadir|` below this counts as degenerate.
    pub degenerate_tolerance: f64,
    /// Amount the nadir is moved in the unfavorable direction.
    pub widen_by: f64,
}

impl Default for RangePolicy {
    fn default() -> Self {
        Self {
            degenerate_tolerance: 1e-6,
            widen_by: 1e-3,
        }
    }
}

/// One row: the full objective vector obtained when optimizing `objective` alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoffRow {
    pub objective: ObjectiveSpec,
    pub decision: Vec<f64>,
    pub vector: ObjectiveVector,
    /// Set when the direct solve failed and another row was reused.
    pub surrogate_of: Option<Metric>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveRange {
    pub objective: ObjectiveSpec,
    pub ideal: f64,
    pub nadir: f64,
    /// The range was degenerate and the nadir was moved.
    pub widened: bool,
}

impl ObjectiveRange {
    pub fn span(&self) -> f64 {
        (self.nadir - self.ideal).abs()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoffTable {
    pub rows: Vec<PayoffRow>,
    pub ranges: Vec<ObjectiveRange>,
}

impl PayoffTable {
    /// Optimize every objective alone, in configuration order.
    ///
    /// A failed row reuses the completed row that is best for that objective
    /// (first wins on ties). Failing before any row exists is unrecoverable.
    pub fn build<S: SubproblemSolver>(solver: &S, objectives: &ObjectiveSet, policy: &RangePolicy) -> Result<Self> {
        let empty = EpsilonMap::new();
        let mut rows: Vec<PayoffRow> = Vec::with_capacity(objectives.len());

        for spec in objectives.specs() {
            let row = match solver.solve(*spec, &empty) {
                SolveOutcome::Feasible(sol) => PayoffRow {
                    objective: *spec,
                    decision: sol.decision,
                    vector: sol.objectives,
                    surrogate_of: None,
                },
                SolveOutcome::Infeasible => {
                    let source = best_row_for(&rows, *spec).ok_or_else(|| Error::UnrecoverablePayoffFailure {
                        objective: spec.metric.to_string(),
                    })?;
                    warn!(
                        objective = %spec.metric,
                        source = %source.objective.metric,
                        "payoff row infeasible, reusing best existing row"
                    );
                    PayoffRow {
                        objective: *spec,
                        decision: source.decision.clone(),
                        vector: source.vector,
                        surrogate_of: Some(source.objective.metric),
                    }
                }
            };
            debug!(objective = %spec.metric, value = row.vector.get(spec.metric), "payoff row");
            rows.push(row);
        }

        let ranges = objectives
            .specs()
            .iter()
            .map(|spec| range_for(&rows, *spec, policy))
            .collect();

        Ok(Self { rows, ranges })
    }

    pub fn range(&self, metric: Metric) -> Option<&ObjectiveRange> {
        self.ranges.iter().find(|r| r.objective.metric == metric)
    }

    pub fn row(&self, metric: Metric) -> Option<&PayoffRow> {
        self.rows.iter().find(|r| r.objective.metric == metric)
    }

    /// Value of `column` in the row that optimized `row`.
    pub fn value(&self, row: Metric, column: Metric) -> Option<f64> {
        self.row(row).map(|r| r.vector.get(column))
    }
}

fn best_row_for(rows: &[PayoffRow], spec: ObjectiveSpec) -> Option<&PayoffRow> {
    rows.iter().fold(None, |best: Option<&PayoffRow>, r| match best {
        Some(b) if !spec.direction.is_better(r.vector.get(spec.metric), b.vector.get(spec.metric)) => Some(b),
        _ => Some(r),
    })
}

fn range_for(rows: &[PayoffRow], spec: ObjectiveSpec, policy: &RangePolicy) -> ObjectiveRange {
    let column = rows.iter().map(|r| r.vector.get(spec.metric));
    let (ideal, nadir) = column.fold((f64::NAN, f64::NAN), |(ideal, nadir), v| {
        if ideal.is_nan() {
            (v, v)
        } else {
            (spec.direction.best(ideal, v), spec.direction.worst(nadir, v))
        }
    });

    if (ideal - nadir).abs() < policy.degenerate_tolerance {
        // Min: nadir above ideal. Max: nadir below.
        let widened_nadir = ideal + spec.direction.sign() * policy.widen_by;
        warn!(
            objective = %spec.metric,
            ideal,
            nadir = widened_nadir,
            "degenerate objective range widened"
        );
        return ObjectiveRange {
            objective: spec,
            ideal,
            nadir: widened_nadir,
            widened: true,
        };
    }

    ObjectiveRange {
        objective: spec,
        ideal,
        nadir,
        widened: false,
    }
}
