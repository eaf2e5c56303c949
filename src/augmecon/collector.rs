//! Result collection for one grid walk.

use serde::{Deserialize, Serialize};

use crate::augmecon::{Grid, PayoffTable};
use crate::domain::{EpsilonMap, ObjectiveSet, ProcessContext, Solution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellOutcome {
    Feasible,
    Infeasible,
}

/// One visited grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub index: Vec<usize>,
    pub epsilon: EpsilonMap,
    pub outcome: CellOutcome,
    /// Steps the innermost dimension advanced after this cell.
    pub advance: usize,
    /// Position in `RunReport::solutions` for feasible cells.
    pub solution: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub solved: usize,
    pub skipped: usize,
    pub visited: usize,
    /// `(grid_points + 1)^n_constrained`.
    pub total_cells: usize,
}

impl RunCounts {
    /// Cells jumped over without a solver call.
    pub fn pruned(&self) -> usize {
        self.total_cells.saturating_sub(self.visited)
    }
}

/// Accumulates cell outcomes in visit order.
#[derive(Debug, Default)]
pub struct ResultCollector {
    solutions: Vec<Solution>,
    cells: Vec<CellRecord>,
    counts: RunCounts,
}

impl ResultCollector {
    pub fn new(total_cells: usize) -> Self {
        Self {
            counts: RunCounts {
                total_cells,
                ..RunCounts::default()
            },
            ..Self::default()
        }
    }

    pub fn record_feasible(&mut self, index: &[usize], epsilon: EpsilonMap, solution: Solution, advance: usize) {
        self.counts.visited += 1;
        self.counts.solved += 1;
        self.solutions.push(solution);
        self.cells.push(CellRecord {
            index: index.to_vec(),
            epsilon,
            outcome: CellOutcome::Feasible,
            advance,
            solution: Some(self.solutions.len() - 1),
        });
    }

    pub fn record_infeasible(&mut self, index: &[usize], epsilon: EpsilonMap, advance: usize) {
        self.counts.visited += 1;
        self.counts.skipped += 1;
        self.cells.push(CellRecord {
            index: index.to_vec(),
            epsilon,
            outcome: CellOutcome::Infeasible,
            advance,
            solution: None,
        });
    }

    pub fn counts(&self) -> RunCounts {
        self.counts
    }

    pub fn finish(
        self,
        context: ProcessContext,
        objectives: ObjectiveSet,
        payoff: PayoffTable,
        grids: Vec<Grid>,
    ) -> RunReport {
        RunReport {
            context,
            objectives,
            payoff,
            grids,
            solutions: self.solutions,
            cells: self.cells,
            counts: self.counts,
        }
    }
}

/// Everything one context run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub context: ProcessContext,
    pub objectives: ObjectiveSet,
    pub payoff: PayoffTable,
    pub grids: Vec<Grid>,
    /// Feasible solutions in visit order, duplicates included.
    pub solutions: Vec<Solution>,
    pub cells: Vec<CellRecord>,
    pub counts: RunCounts,
}

impl RunReport {
    /// Solutions not dominated by any other solution of this run.
    ///
    /// Exact duplicates are reported once.
    pub fn non_dominated(&self) -> Vec<&Solution> {
        let specs = self.objectives.specs();
        let mut front: Vec<&Solution> = Vec::new();
        for (i, s) in self.solutions.iter().enumerate() {
            let dominated = self
                .solutions
                .iter()
                .enumerate()
                .any(|(j, o)| j != i && o.dominates(s, specs));
            let duplicate = front.iter().any(|f| f.objectives == s.objectives);
            if !dominated && !duplicate {
                front.push(s);
            }
        }
        front
    }
}
