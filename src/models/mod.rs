//! Process performance models.
//!
//! Models are pure functions of `(decision vector, context)` so that the solver
//! can stay generic and independent contexts can run in parallel.

pub mod lpbf;

pub use lpbf::*;

use crate::domain::{ObjectiveVector, ProcessContext};

/// Raw physical metrics produced by a performance model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricTuple {
    pub cost: f64,
    pub carbon: f64,
    pub relative_density: f64,
    pub energy_density: f64,
}

/// Evaluator mapping a decision vector and context to physical metrics.
///
/// Implementations must be total over the bounded decision domain: they may
/// return physically poor values, but must not panic.
pub trait PerformanceModel: Sync {
    fn evaluate(&self, x: &[f64], context: &ProcessContext) -> MetricTuple;

    /// Full objective vector: raw metrics plus derived build rate and robustness index.
    ///
    /// The decision vector is read as `[power_w, speed_mm_s, hatch_um]`.
    fn objectives(&self, x: &[f64], context: &ProcessContext) -> ObjectiveVector {
        let m = self.evaluate(x, context);
        let speed = x.get(1).copied().unwrap_or(0.0);
        let hatch = x.get(2).copied().unwrap_or(0.0);
        ObjectiveVector {
            cost: m.cost,
            carbon: m.carbon,
            efficiency: build_rate(speed, hatch, context.layer_thickness_um),
            quality_robustness: robustness_index(m.relative_density, m.energy_density),
            relative_density: m.relative_density,
            energy_density: m.energy_density,
        }
    }
}

/// Volumetric build rate (mm³/s) from speed (mm/s), hatch (µm) and layer thickness (µm).
pub fn build_rate(speed_mm_s: f64, hatch_um: f64, layer_thickness_um: f64) -> f64 {
    speed_mm_s * (hatch_um / 1000.0) * (layer_thickness_um / 1000.0)
}

/// Process robustness index: squared density shortfall plus energy-density drift from 50 J/mm³.
pub fn robustness_index(relative_density: f64, energy_density: f64) -> f64 {
    let quality_loss = (100.0 - relative_density).powi(2);
    let stability = ((energy_density - 50.0) / 20.0).powi(2);
    quality_loss + stability
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_rate_converts_micrometres() {
        // 1000 mm/s * 0.1 mm * 0.1 mm = 10 mm³/s
        assert!((build_rate(1000.0, 100.0, 100.0) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn robustness_index_is_zero_at_reference_point() {
        assert_eq!(robustness_index(100.0, 50.0), 0.0);
        assert!((robustness_index(99.0, 70.0) - 2.0).abs() < 1e-12);
    }
}
