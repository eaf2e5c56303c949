//! Phase B: augmented-Lagrangian refinement with exact inequalities.
//!
//! Problem form:
//!
//! ```text
//! min f(x)   s.t.  g_i(x) >= 0,   x in bounds
//! ```
//!
//! Outer loop: PHR multiplier / penalty updates. Inner loop: projected BFGS on
//! the unit-cube image of the bounds with central-difference gradients.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::domain::DecisionBounds;
use crate::math::{FD_STEP, bfgs_inverse_update, central_gradient, from_unit, pinned_mask, to_unit};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub max_outer_iterations: usize,
    pub max_inner_iterations: usize,
    /// Relative objective change that counts as stalled.
    pub ftol: f64,
    /// Maximum constraint violation accepted as converged.
    pub constraint_tolerance: f64,
    pub initial_penalty: f64,
    pub penalty_growth: f64,
    pub max_penalty: f64,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            max_outer_iterations: 50,
            max_inner_iterations: 100,
            ftol: 1e-6,
            constraint_tolerance: 1e-9,
            initial_penalty: 10.0,
            penalty_growth: 10.0,
            max_penalty: 1e10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalOutcome {
    pub x: Vec<f64>,
    pub objective: f64,
    /// `max_i max(0, -g_i(x))`.
    pub max_violation: f64,
    pub outer_iterations: usize,
    pub converged: bool,
}

const ARMIJO_C: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 30;
const INITIAL_STEP: f64 = 0.25;
const GRADIENT_TOL: f64 = 1e-9;
const INNER_FTOL: f64 = 1e-12;

fn max_violation(g: &[f64]) -> f64 {
    g.iter().fold(0.0_f64, |acc, gi| {
        if gi.is_finite() { acc.max(-gi) } else { f64::INFINITY }
    })
}

/// Refine from `x0`. `problem(x)` returns `(f(x), g(x))`.
pub fn augmented_lagrangian<P>(problem: P, bounds: &DecisionBounds, x0: &[f64], config: &LocalConfig) -> LocalOutcome
where
    P: Fn(&[f64]) -> (f64, Vec<f64>),
{
    let fixed = pinned_mask(bounds);
    let mut u = to_unit(bounds, x0);
    let mut x = from_unit(bounds, &u);

    let (f0, g0) = problem(&x);
    let f_scale = if f0.is_finite() { f0.abs().max(1e-12) } else { 1.0 };

    let mut lambda = vec![0.0; g0.len()];
    let mut rho = config.initial_penalty;
    let mut f_prev = f0;
    let mut violation_prev = max_violation(&g0);
    let mut outer_iterations = 0usize;
    let mut converged = false;

    if fixed.iter().all(|&p| p) {
        return LocalOutcome {
            x,
            objective: f0,
            max_violation: violation_prev,
            outer_iterations,
            converged: violation_prev <= config.constraint_tolerance,
        };
    }

    let (mut f_cur, mut g_cur) = (f0, g0);

    for _ in 0..config.max_outer_iterations {
        outer_iterations += 1;

        let lagrangian = |uu: &[f64]| {
            let (f, g) = problem(&from_unit(bounds, uu));
            let mut value = f / f_scale;
            for (gi, li) in g.iter().zip(&lambda) {
                let shifted = (li - rho * gi).max(0.0);
                value += (shifted * shifted - li * li) / (2.0 * rho);
            }
            if value.is_finite() { value } else { f64::INFINITY }
        };
        u = projected_bfgs(lagrangian, u, &fixed, config.max_inner_iterations);
        x = from_unit(bounds, &u);

        (f_cur, g_cur) = problem(&x);
        let violation = max_violation(&g_cur);

        for (li, gi) in lambda.iter_mut().zip(&g_cur) {
            *li = (*li - rho * gi).max(0.0);
        }

        let f_change = (f_cur - f_prev).abs() / f_prev.abs().max(1e-12);
        if violation <= config.constraint_tolerance && f_change <= config.ftol {
            converged = true;
            break;
        }
        if violation > 0.25 * violation_prev {
            rho = (rho * config.penalty_growth).min(config.max_penalty);
        }
        f_prev = f_cur;
        violation_prev = violation;
    }

    LocalOutcome {
        x,
        objective: f_cur,
        max_violation: max_violation(&g_cur),
        outer_iterations,
        converged,
    }
}

/// Zero gradient components whose descent step would leave the box.
fn project(g: &mut DVector<f64>, u: &[f64], fixed: &[bool]) {
    for j in 0..u.len() {
        let blocked = fixed[j] || (u[j] <= 0.0 && g[j] > 0.0) || (u[j] >= 1.0 && g[j] < 0.0);
        if blocked {
            g[j] = 0.0;
        }
    }
}

fn projected_bfgs<F>(mut phi: F, mut u: Vec<f64>, fixed: &[bool], max_iter: usize) -> Vec<f64>
where
    F: FnMut(&[f64]) -> f64,
{
    let n = u.len();
    let mut h = DMatrix::<f64>::identity(n, n);
    let mut value = phi(&u);
    let mut grad = central_gradient(&mut phi, &u, fixed, FD_STEP);
    project(&mut grad, &u, fixed);

    for _ in 0..max_iter {
        if !value.is_finite() || grad.amax() <= GRADIENT_TOL {
            break;
        }

        let mut d = -(&h * &grad);
        if d.dot(&grad) >= 0.0 {
            h = DMatrix::identity(n, n);
            d = -grad.clone();
        }
        for j in 0..n {
            if fixed[j] || (u[j] <= 0.0 && d[j] < 0.0) || (u[j] >= 1.0 && d[j] > 0.0) {
                d[j] = 0.0;
            }
        }
        let d_max = d.amax();
        if d_max <= 1e-12 {
            break;
        }

        let mut t = (INITIAL_STEP / d_max).min(1.0);
        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            let candidate: Vec<f64> = u
                .iter()
                .zip(d.iter())
                .map(|(ui, di)| (ui + t * di).clamp(0.0, 1.0))
                .collect();
            let decrease: f64 = candidate
                .iter()
                .zip(&u)
                .zip(grad.iter())
                .map(|((c, ui), gi)| (c - ui) * gi)
                .sum();
            let v = phi(&candidate);
            if v <= value + ARMIJO_C * decrease {
                accepted = Some((candidate, v));
                break;
            }
            t *= 0.5;
        }
        let Some((next, next_value)) = accepted else {
            break;
        };

        let mut next_grad = central_gradient(&mut phi, &next, fixed, FD_STEP);
        project(&mut next_grad, &next, fixed);

        let s = DVector::from_iterator(n, next.iter().zip(&u).map(|(a, b)| a - b));
        let y = &next_grad - &grad;
        bfgs_inverse_update(&mut h, &s, &y);

        let stalled = (value - next_value).abs() <= INNER_FTOL * value.abs().max(1.0);
        u = next;
        value = next_value;
        grad = next_grad;
        if stalled {
            break;
        }
    }
    u
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> DecisionBounds {
        DecisionBounds::new(vec![(0.0, 4.0), (0.0, 4.0)]).unwrap()
    }

    #[test]
    fn unconstrained_minimum_in_interior() {
        let out = augmented_lagrangian(
            |x: &[f64]| ((x[0] - 1.0).powi(2) + (x[1] - 3.0).powi(2) + 1.0, vec![]),
            &square(),
            &[3.5, 0.5],
            &LocalConfig::default(),
        );
        assert!((out.x[0] - 1.0).abs() < 1e-3, "x={:?}", out.x);
        assert!((out.x[1] - 3.0).abs() < 1e-3, "x={:?}", out.x);
        assert_eq!(out.max_violation, 0.0);
    }

    #[test]
    fn active_inequality_lands_on_boundary() {
        // min x0 + x1  s.t.  x0 + 2 x1 >= 4  -> optimum (0, 2)
        let out = augmented_lagrangian(
            |x: &[f64]| (x[0] + x[1], vec![x[0] + 2.0 * x[1] - 4.0]),
            &square(),
            &[3.0, 3.0],
            &LocalConfig::default(),
        );
        assert!(out.max_violation < 1e-4, "violation={}", out.max_violation);
        assert!((out.objective - 2.0).abs() < 1e-2, "f={}", out.objective);
    }

    #[test]
    fn box_bound_is_respected() {
        let out = augmented_lagrangian(
            |x: &[f64]| (x[0] + x[1], vec![]),
            &square(),
            &[2.0, 2.0],
            &LocalConfig::default(),
        );
        assert!(out.x.iter().all(|v| *v >= 0.0 && *v <= 4.0));
        assert!(out.objective < 1e-3);
    }

    #[test]
    fn fully_pinned_bounds_return_start() {
        let bounds = DecisionBounds::new(vec![(1.0, 1.0), (2.0, 2.0)]).unwrap();
        let out = augmented_lagrangian(
            |x: &[f64]| (x[0] * x[1], vec![x[0] - 0.5]),
            &bounds,
            &[1.0, 2.0],
            &LocalConfig::default(),
        );
        assert_eq!(out.x, vec![1.0, 2.0]);
        assert_eq!(out.outer_iterations, 0);
        assert!(out.converged);
    }
}
