//! `augmecon-r` library crate.
//!
//! The binary (`augmecon`) is a thin wrapper around this library so that:
//!
//! - the grid controller and solver are testable without spawning processes
//! - other front-ends can drive the same engine with their own models
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod augmecon;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod solver;
