//! Numerical utilities shared by the solver phases.
//!
//! - unit-cube mapping of box bounds (`scaling`)
//! - finite-difference gradients (`gradient`)
//! - quasi-Newton inverse-Hessian updates (`bfgs`)

pub mod bfgs;
pub mod gradient;
pub mod scaling;

pub use bfgs::*;
pub use gradient::*;
pub use scaling::*;
