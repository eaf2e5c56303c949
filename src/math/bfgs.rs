//! BFGS inverse-Hessian update.
//!
//! ```text
//! H+ = (I - ρ s yᵀ) H (I - ρ y sᵀ) + ρ s sᵀ,   ρ = 1 / (yᵀ s)
//! ```

use nalgebra::{DMatrix, DVector};

/// Curvature threshold below which the update is skipped.
const MIN_CURVATURE: f64 = 1e-16;

/// Apply the BFGS update in place. Returns `false` (and leaves `h`
/// untouched) when `yᵀs` is too small to keep `h` positive definite.
pub fn bfgs_inverse_update(h: &mut DMatrix<f64>, s: &DVector<f64>, y: &DVector<f64>) -> bool {
    let sy = s.dot(y);
    if !(sy.is_finite() && sy > MIN_CURVATURE) {
        return false;
    }
    let rho = 1.0 / sy;
    let n = s.len();
    let identity = DMatrix::<f64>::identity(n, n);

    let left = &identity - rho * s * y.transpose();
    let right = &identity - rho * y * s.transpose();
    let updated = &left * &*h * &right + rho * s * s.transpose();

    if updated.iter().all(|v| v.is_finite()) {
        *h = updated;
        true
    } else {
        false
    }
}
