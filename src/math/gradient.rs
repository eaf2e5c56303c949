//! Finite-difference gradients on the unit cube.

use nalgebra::DVector;

/// Default step for central differences in unit-cube coordinates.
pub const FD_STEP: f64 = 1e-6;

/// Central-difference gradient of `f` at `u`, restricted to `[0, 1]`.
///
/// At a bound the stencil collapses to a one-sided difference. Entries for
/// `fixed` variables are zero.
pub fn central_gradient<F>(f: &mut F, u: &[f64], fixed: &[bool], h: f64) -> DVector<f64>
where
    F: FnMut(&[f64]) -> f64,
{
    let mut g = DVector::<f64>::zeros(u.len());
    let mut probe = u.to_vec();

    for j in 0..u.len() {
        if fixed.get(j).copied().unwrap_or(false) {
            continue;
        }
        let hi = (u[j] + h).min(1.0);
        let lo = (u[j] - h).max(0.0);
        let span = hi - lo;
        if span <= 0.0 {
            continue;
        }

        probe[j] = hi;
        let f_hi = f(&probe);
        probe[j] = lo;
        let f_lo = f(&probe);
        probe[j] = u[j];

        let d = (f_hi - f_lo) / span;
        g[j] = if d.is_finite() { d } else { 0.0 };
    }

    g
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_of_quadratic_is_accurate() {
        let mut f = |u: &[f64]| (u[0] - 0.3).powi(2) + 2.0 * u[1];
        let g = central_gradient(&mut f, &[0.5, 0.5], &[false, false], FD_STEP);
        assert!((g[0] - 0.4).abs() < 1e-6);
        assert!((g[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn one_sided_at_bounds_and_zero_when_fixed() {
        let mut f = |u: &[f64]| 3.0 * u[0] + 5.0 * u[1];
        let g = central_gradient(&mut f, &[1.0, 0.0], &[false, true], FD_STEP);
        assert!((g[0] - 3.0).abs() < 1e-6);
        assert_eq!(g[1], 0.0);
    }
}
