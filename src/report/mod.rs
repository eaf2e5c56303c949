//! Reporting utilities: plain-text payoff tables and run summaries.

pub mod format;

pub use format::*;
