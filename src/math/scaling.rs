//! Mapping between box bounds and the unit cube.
//!
//! Both solver phases work in `u ∈ [0, 1]^n` so that variables with very
//! different physical ranges (hundreds of W vs tens of µm) share one step
//! scale. Pinned variables (`min == max`) map to `u = 0` and never move.

use crate::domain::DecisionBounds;

/// Map a physical point into the unit cube (clamped).
pub fn to_unit(bounds: &DecisionBounds, x: &[f64]) -> Vec<f64> {
    bounds
        .as_slice()
        .iter()
        .zip(x)
        .map(|(&(lo, hi), &v)| {
            let w = hi - lo;
            if w > 0.0 { ((v - lo) / w).clamp(0.0, 1.0) } else { 0.0 }
        })
        .collect()
}

/// Map a unit-cube point back into the box (clamped).
pub fn from_unit(bounds: &DecisionBounds, u: &[f64]) -> Vec<f64> {
    bounds
        .as_slice()
        .iter()
        .zip(u)
        .map(|(&(lo, hi), &t)| lo + t.clamp(0.0, 1.0) * (hi - lo))
        .collect()
}

/// Per-variable "pinned" flags.
pub fn pinned_mask(bounds: &DecisionBounds) -> Vec<bool> {
    (0..bounds.dim()).map(|i| bounds.is_pinned(i)).collect()
}
