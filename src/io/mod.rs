//! Input/output helpers.
//!
//! - run configuration + TOML run files (`config`)
//! - JSON export of run reports (`export`)

pub mod config;
pub mod export;

pub use config::*;
pub use export::*;
