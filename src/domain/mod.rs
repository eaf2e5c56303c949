//! Domain types used throughout the engine.
//!
//! This module defines:
//!
//! - objective configuration (`Direction`, `Metric`, `ObjectiveSpec`, `ObjectiveSet`)
//! - the decision space (`DecisionBounds`) and per-run context (`ProcessContext`)
//! - evaluation outputs (`ObjectiveVector`, `Solution`)
//! - epsilon constraints handed from the grid controller to the solver

pub mod types;

pub use types::*;
