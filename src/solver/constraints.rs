//! Constraint handling shared by the solver phases.
//!
//! Two tiers are used on purpose:
//!
//! - the global phase sees a penalty against a *relaxed* density floor
//! - the local phase and validation see the true floor as exact inequalities

use serde::{Deserialize, Serialize};

use crate::domain::{EpsilonMap, ObjectiveVector, Tolerance};

/// Intrinsic physical feasibility: minimum relative density and an optional
/// energy-density window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalFloor {
    /// Required relative density (%).
    pub min_relative_density: f64,
    /// Threshold used by the global penalty.
    pub relaxed_relative_density: f64,
    /// Accepted shortfall below `min_relative_density` at validation.
    pub validation_tolerance: f64,
    /// Optional `[min, max]` energy density (J/mm³).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_density_window: Option<(f64, f64)>,
}

impl Default for PhysicalFloor {
    fn default() -> Self {
        Self {
            min_relative_density: 99.5,
            relaxed_relative_density: 99.0,
            validation_tolerance: 0.05,
            energy_density_window: None,
        }
    }
}

/// Normaliser for epsilon excess.
fn limit_scale(limit: f64) -> f64 {
    limit.abs().max(1e-12)
}

/// Physical floor plus the epsilon bounds of one subproblem.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintSet<'a> {
    pub floor: &'a PhysicalFloor,
    pub epsilon: &'a EpsilonMap,
    pub tolerance: Tolerance,
}

impl<'a> ConstraintSet<'a> {
    pub fn new(floor: &'a PhysicalFloor, epsilon: &'a EpsilonMap, tolerance: Tolerance) -> Self {
        Self {
            floor,
            epsilon,
            tolerance,
        }
    }

    /// Squared-excess penalty (unweighted) for the global phase.
    ///
    /// The density floor is measured in percentage points against the relaxed
    /// threshold; epsilon excess is relative to the bound.
    pub fn penalty(&self, o: &ObjectiveVector) -> f64 {
        let mut total = (self.floor.relaxed_relative_density - o.relative_density)
            .max(0.0)
            .powi(2);

        if let Some((lo, hi)) = self.floor.energy_density_window {
            total += (lo - o.energy_density).max(0.0).powi(2);
            total += (o.energy_density - hi).max(0.0).powi(2);
        }

        for c in self.epsilon.iter() {
            let excess = c.excess(o.get(c.metric)) / limit_scale(c.limit);
            total += excess * excess;
        }
        total
    }

    /// Inequalities `g_i >= 0` at the true thresholds, for the local phase.
    pub fn inequalities(&self, o: &ObjectiveVector) -> Vec<f64> {
        let mut g = Vec::with_capacity(3 + self.epsilon.len());
        g.push(o.relative_density - self.floor.min_relative_density);

        if let Some((lo, hi)) = self.floor.energy_density_window {
            g.push(o.energy_density - lo);
            g.push(hi - o.energy_density);
        }

        for c in self.epsilon.iter() {
            g.push(c.margin(o.get(c.metric)) / limit_scale(c.limit));
        }
        g
    }

    /// Validation against the true thresholds within tolerance.
    pub fn is_feasible(&self, o: &ObjectiveVector) -> bool {
        if !o.is_finite() {
            return false;
        }
        if o.relative_density < self.floor.min_relative_density - self.floor.validation_tolerance {
            return false;
        }
        if let Some((lo, hi)) = self.floor.energy_density_window {
            let ed = o.energy_density;
            if ed < lo - self.tolerance.allowance(lo) || ed > hi + self.tolerance.allowance(hi) {
                return false;
            }
        }
        self.epsilon.is_satisfied_by(o, &self.tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, Metric, ObjectiveSpec};

    fn vector(cost: f64, rd: f64, ed: f64) -> ObjectiveVector {
        ObjectiveVector {
            cost,
            carbon: 0.1,
            efficiency: 10.0,
            quality_robustness: 0.0,
            relative_density: rd,
            energy_density: ed,
        }
    }

    #[test]
    fn penalty_uses_relaxed_floor_and_relative_epsilon_excess() {
        let floor = PhysicalFloor::default();
        let mut eps = EpsilonMap::new();
        eps.insert(ObjectiveSpec::new(Metric::Cost, Direction::Min), 4.0);
        let cs = ConstraintSet::new(&floor, &eps, Tolerance::default());

        // 99.2 is above the relaxed floor: no density penalty.
        assert_eq!(cs.penalty(&vector(4.0, 99.2, 50.0)), 0.0);

        // 98.0 -> (1.0)^2; cost 5 vs 4 -> (0.25)^2
        let p = cs.penalty(&vector(5.0, 98.0, 50.0));
        assert!((p - (1.0 + 0.0625)).abs() < 1e-12);
    }

    #[test]
    fn validation_accepts_density_within_tolerance() {
        let floor = PhysicalFloor::default();
        let eps = EpsilonMap::new();
        let cs = ConstraintSet::new(&floor, &eps, Tolerance::default());
        assert!(cs.is_feasible(&vector(4.0, 99.46, 50.0)));
        assert!(!cs.is_feasible(&vector(4.0, 99.44, 50.0)));
    }

    #[test]
    fn energy_window_adds_two_inequalities() {
        let floor = PhysicalFloor {
            energy_density_window: Some((30.0, 80.0)),
            ..PhysicalFloor::default()
        };
        let eps = EpsilonMap::new();
        let cs = ConstraintSet::new(&floor, &eps, Tolerance::default());
        let g = cs.inequalities(&vector(4.0, 99.6, 91.0));
        assert_eq!(g.len(), 3);
        assert!((g[2] + 11.0).abs() < 1e-12);
        assert!(!cs.is_feasible(&vector(4.0, 99.6, 91.0)));
        assert!(cs.is_feasible(&vector(4.0, 99.6, 79.0)));
    }

    #[test]
    fn maximized_epsilon_inequality_is_signed() {
        let floor = PhysicalFloor::default();
        let mut eps = EpsilonMap::new();
        eps.insert(ObjectiveSpec::new(Metric::Efficiency, Direction::Max), 8.0);
        let cs = ConstraintSet::new(&floor, &eps, Tolerance::default());
        let g = cs.inequalities(&vector(4.0, 99.6, 50.0));
        // efficiency 10 vs bound 8 -> +0.25
        assert!((g[1] - 0.25).abs() < 1e-12);
    }
}
