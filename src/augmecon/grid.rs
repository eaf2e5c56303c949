//! Epsilon grids and the odometer index that walks them.
//!
//! Each constrained objective gets `grid_points + 1` thresholds running from
//! its nadir (loosest) to its ideal (tightest). A `GridIndex` holds one digit
//! per constrained objective; the last digit is the innermost dimension.

use serde::{Deserialize, Serialize};

use crate::augmecon::ObjectiveRange;
use crate::domain::ObjectiveSpec;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub objective: ObjectiveSpec,
    /// `values[0] == nadir`, `values[grid_points] == ideal`.
    pub values: Vec<f64>,
    /// Absolute distance between neighbouring thresholds.
    pub step: f64,
}

impl Grid {
    pub fn from_range(range: &ObjectiveRange, grid_points: usize) -> Result<Self> {
        if grid_points == 0 {
            return Err(Error::InvalidConfig("grid_points must be >= 1".into()));
        }
        let span = range.span();
        if !(span.is_finite() && span > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "objective '{}' has an empty range [{}, {}]",
                range.objective.metric, range.nadir, range.ideal
            )));
        }

        let delta = (range.ideal - range.nadir) / grid_points as f64;
        let mut values: Vec<f64> = (0..=grid_points).map(|k| range.nadir + delta * k as f64).collect();
        values[grid_points] = range.ideal;

        Ok(Self {
            objective: range.objective,
            values,
            step: span / grid_points as f64,
        })
    }

    pub fn grid_points(&self) -> usize {
        self.values.len() - 1
    }

    pub fn value(&self, k: usize) -> f64 {
        self.values[k]
    }
}

/// Mixed-radix counter over `dims` digits in `0..=grid_points`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridIndex {
    digits: Vec<usize>,
    grid_points: usize,
    done: bool,
}

impl GridIndex {
    pub fn new(dims: usize, grid_points: usize) -> Self {
        Self {
            digits: vec![0; dims],
            grid_points,
            done: dims == 0,
        }
    }

    pub fn digits(&self) -> &[usize] {
        &self.digits
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Steps left in the innermost dimension before it overflows.
    pub fn remaining_innermost(&self) -> usize {
        self.digits.last().map_or(0, |d| self.grid_points - d)
    }

    /// Total number of cells, `(grid_points + 1)^dims`.
    pub fn cell_count(&self) -> usize {
        (self.grid_points + 1).saturating_pow(self.digits.len() as u32)
    }

    /// Add `steps` to the innermost digit and carry outwards.
    ///
    /// An overflowing digit resets to 0 and increments its outer neighbour by
    /// one; overflow of the outermost digit ends the walk.
    pub fn advance_innermost(&mut self, steps: usize) {
        if self.done {
            return;
        }
        let mut dim = self.digits.len() - 1;
        self.digits[dim] = self.digits[dim].saturating_add(steps);
        while self.digits[dim] > self.grid_points {
            self.digits[dim] = 0;
            if dim == 0 {
                self.done = true;
                return;
            }
            dim -= 1;
            self.digits[dim] += 1;
        }
    }
}
