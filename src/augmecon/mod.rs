//! Augmented epsilon-constraint engine.
//!
//! Responsibilities:
//!
//! - payoff table with surrogate fallback and degenerate-range widening
//! - epsilon grids and the odometer index over them
//! - the pruned grid walk (slack jump + early exit)
//! - collection of solutions and per-cell outcomes

pub mod collector;
pub mod controller;
pub mod grid;
pub mod payoff;

pub use collector::*;
pub use controller::*;
pub use grid::*;
pub use payoff::*;
