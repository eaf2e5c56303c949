//! Laser powder bed fusion (LPBF) performance model.
//!
//! Decision vector: `[P, V, H]` = laser power (W), scan speed (mm/s),
//! hatch spacing (µm). Context: layer thickness `LT` (µm).
//!
//! - `ED = P / (V·H·LT·1e-6)` (J/mm³)
//! - `RD` from a second-order response surface in `P, V, H, LT, ED`
//! - `Cost = c_time / rate + E[material] + post(LT)·(1 + 1e-4·V) + 0.01·P`
//! - `Carbon = (P + P_base)·EF_elec / rate + E[powder carbon]`

use crate::domain::ProcessContext;
use crate::models::{MetricTuple, PerformanceModel};

/// One powder-supply scenario of the two-stage stochastic cost model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowderScenario {
    pub probability: f64,
    pub loss_rate: f64,
    /// Powder price (CNY/kg).
    pub price: f64,
}

/// Economic and emission constants (SS-CX stainless steel on a 6.5 kW machine).
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessConstants {
    /// Non-laser base power (W).
    pub base_power_w: f64,
    /// Powder density (kg/mm³).
    pub density_kg_mm3: f64,
    /// Electricity emission factor (kgCO2/kJ).
    pub ef_electricity: f64,
    /// Powder emission factor (kgCO2/kg).
    pub ef_powder: f64,
    /// Machine + labour + shielding gas (CNY/s).
    pub time_cost_per_s: f64,
    /// Laser power surcharge (CNY/W).
    pub power_cost_per_w: f64,
    pub scenarios: Vec<PowderScenario>,
    /// Post-processing cost (CNY/mm³) keyed by layer thickness (µm).
    pub post_cost: Vec<(f64, f64)>,
    /// Used when the layer thickness has no entry in `post_cost`.
    pub post_cost_fallback: f64,
}

impl Default for ProcessConstants {
    fn default() -> Self {
        let machine = 154.0 / 3600.0;
        let labour = 60.0 / 3600.0;
        let gas = (3.0 / 60.0) * 0.053;
        Self {
            base_power_w: 6500.0 - 1000.0,
            density_kg_mm3: 7.7e-6,
            ef_electricity: 1.49e-4,
            ef_powder: 1.45,
            time_cost_per_s: machine + labour + gas,
            power_cost_per_w: 0.01,
            scenarios: vec![
                PowderScenario {
                    probability: 0.25,
                    loss_rate: 0.16,
                    price: 110.0,
                },
                PowderScenario {
                    probability: 0.50,
                    loss_rate: 0.13,
                    price: 100.0,
                },
                PowderScenario {
                    probability: 0.25,
                    loss_rate: 0.10,
                    price: 90.0,
                },
            ],
            post_cost: vec![(80.0, 0.020), (100.0, 0.025), (120.0, 0.035)],
            post_cost_fallback: 0.020,
        }
    }
}

impl ProcessConstants {
    fn post_cost_for(&self, layer_thickness_um: f64) -> f64 {
        self.post_cost
            .iter()
            .find(|(lt, _)| (lt - layer_thickness_um).abs() < 1e-9)
            .map(|(_, c)| *c)
            .unwrap_or(self.post_cost_fallback)
    }

    fn expected_material_cost(&self) -> f64 {
        self.scenarios
            .iter()
            .map(|s| s.probability * self.density_kg_mm3 * (1.0 + s.loss_rate) * s.price)
            .sum()
    }

    fn expected_material_carbon(&self) -> f64 {
        self.scenarios
            .iter()
            .map(|s| s.probability * self.density_kg_mm3 * (1.0 + s.loss_rate) * self.ef_powder)
            .sum()
    }
}

/// Response-surface coefficients for relative density (%).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityCoefficients {
    pub intercept: f64,
    pub p: f64,
    pub v: f64,
    pub h: f64,
    pub lt: f64,
    pub ed: f64,
    pub p2: f64,
    pub v2: f64,
    pub h2: f64,
    pub ed2: f64,
    pub pv: f64,
    pub ph: f64,
    pub ped: f64,
    pub vh: f64,
    pub ved: f64,
    pub hed: f64,
}

impl Default for DensityCoefficients {
    fn default() -> Self {
        Self {
            intercept: 136.59848,
            p: 0.094923,
            v: -0.028654,
            h: -0.201185,
            lt: -0.108546,
            ed: -0.524864,
            p2: -0.000051,
            v2: 0.00000883923,
            h2: 0.000575,
            ed2: 0.002459,
            pv: -0.000012,
            ph: -0.000123,
            ped: -0.000122,
            vh: 0.000013,
            ved: 0.000096,
            hed: 0.000450,
        }
    }
}

impl DensityCoefficients {
    pub fn predict(&self, p: f64, v: f64, h: f64, lt: f64, ed: f64) -> f64 {
        self.intercept
            + self.p * p
            + self.v * v
            + self.h * h
            + self.lt * lt
            + self.ed * ed
            + self.p2 * p * p
            + self.v2 * v * v
            + self.h2 * h * h
            + self.ed2 * ed * ed
            + self.pv * p * v
            + self.ph * p * h
            + self.ped * p * ed
            + self.vh * v * h
            + self.ved * v * ed
            + self.hed * h * ed
    }
}

/// LPBF regression model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LpbfModel {
    pub constants: ProcessConstants,
    pub density: DensityCoefficients,
}

impl LpbfModel {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Smallest volumetric rate used in `1/rate`, keeps the model total at zero speed/hatch.
const MIN_VOLUME_RATE: f64 = 1e-12;

impl PerformanceModel for LpbfModel {
    fn evaluate(&self, x: &[f64], context: &ProcessContext) -> MetricTuple {
        let p = x.first().copied().unwrap_or(0.0);
        let v = x.get(1).copied().unwrap_or(0.0);
        let h = x.get(2).copied().unwrap_or(0.0);
        let lt = context.layer_thickness_um;

        // mm/s * µm * µm * 1e-6 = mm³/s
        let volume_rate = (v * h * lt * 1e-6).max(MIN_VOLUME_RATE);
        let inv_rate = 1.0 / volume_rate;
        let energy_density = p * inv_rate;

        let relative_density = self.density.predict(p, v, h, lt, energy_density);

        let c = &self.constants;
        let post = c.post_cost_for(lt) * (1.0 + 1e-4 * v);
        let cost = c.time_cost_per_s * inv_rate + c.expected_material_cost() + post + c.power_cost_per_w * p;

        let process_carbon = (p + c.base_power_w) * c.ef_electricity * inv_rate;
        let carbon = process_carbon + c.expected_material_carbon();

        MetricTuple {
            cost,
            carbon,
            relative_density,
            energy_density,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nominal_point_matches_hand_computation() {
        let model = LpbfModel::new();
        let ctx = ProcessContext::new(100.0);
        let m = model.evaluate(&[400.0, 1000.0, 100.0], &ctx);

        // rate = 10 mm³/s -> ED = 40 J/mm³
        assert!((m.energy_density - 40.0).abs() < 1e-12);

        let time_cost = (154.0 / 3600.0 + 60.0 / 3600.0 + 0.05 * 0.053) * 0.1;
        let material = 7.7e-6 * (0.25 * 1.16 * 110.0 + 0.5 * 1.13 * 100.0 + 0.25 * 1.10 * 90.0);
        let post = 0.025 * 1.1;
        let expected_cost = time_cost + material + post + 4.0;
        assert!((m.cost - expected_cost).abs() < 1e-12);

        let powder_carbon = 7.7e-6 * 1.13 * 1.45;
        let expected_carbon = (400.0 + 5500.0) * 1.49e-4 * 0.1 + powder_carbon;
        assert!((m.carbon - expected_carbon).abs() < 1e-12);
    }

    #[test]
    fn feasible_density_exists_inside_default_bounds() {
        // The high-power / low-speed corner is dense at 100 µm layers.
        let model = LpbfModel::new();
        let m = model.evaluate(&[460.0, 700.0, 90.0], &ProcessContext::new(100.0));
        assert!(m.relative_density > 99.5, "RD={}", m.relative_density);
    }

    #[test]
    fn unknown_layer_thickness_uses_fallback_post_cost() {
        let model = LpbfModel::new();
        let x = [400.0, 1000.0, 100.0];
        let known = model.evaluate(&x, &ProcessContext::new(80.0));
        let unknown = model.evaluate(&x, &ProcessContext::new(80.0 + 1e-3));
        // Same post-processing rate (0.020); only the time term differs slightly.
        assert!((known.cost - unknown.cost).abs() < 1e-4);
    }

    #[test]
    fn model_is_total_at_zero_speed() {
        let model = LpbfModel::new();
        let ctx = ProcessContext::new(100.0);
        let o = model.objectives(&[400.0, 0.0, 100.0], &ctx);
        assert!(o.cost.is_finite());
        assert_eq!(o.efficiency, 0.0);
    }
}
