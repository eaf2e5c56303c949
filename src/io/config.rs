//! Run configuration and TOML run files.
//!
//! Every field has a default, so a run file only needs the settings it
//! changes:
//!
//! ```toml
//! grid_points = 8
//! layer_thicknesses_um = [100.0]
//!
//! [[objectives]]
//! name = "Cost"
//! direction = "min"
//!
//! [[objectives]]
//! name = "Efficiency"
//! direction = "max"
//!
//! [solver.floor]
//! energy_density_window = [30.0, 80.0]
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::augmecon::{PruningConfig, RangePolicy};
use crate::domain::{DecisionBounds, ObjectiveSet, ProcessContext};
use crate::error::{Error, Result};
use crate::solver::SolverConfig;

/// One `{ name, direction }` objective entry, validated on use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveEntry {
    pub name: String,
    pub direction: String,
}

impl ObjectiveEntry {
    pub fn new(name: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: direction.into(),
        }
    }
}

/// LPBF decision-variable bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundsConfig {
    pub power_w: (f64, f64),
    pub speed_mm_s: (f64, f64),
    pub hatch_um: (f64, f64),
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            power_w: (385.0, 460.0),
            speed_mm_s: (700.0, 1150.0),
            hatch_um: (90.0, 115.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// First entry is the primary objective.
    pub objectives: Vec<ObjectiveEntry>,
    pub grid_points: usize,
    /// One independent run per layer thickness (µm).
    pub layer_thicknesses_um: Vec<f64>,
    pub bounds: BoundsConfig,
    pub solver: SolverConfig,
    pub pruning: PruningConfig,
    pub range: RangePolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            objectives: vec![
                ObjectiveEntry::new("Cost", "min"),
                ObjectiveEntry::new("Carbon", "min"),
                ObjectiveEntry::new("Efficiency", "max"),
            ],
            grid_points: 5,
            layer_thicknesses_um: vec![80.0, 100.0, 120.0],
            bounds: BoundsConfig::default(),
            solver: SolverConfig::default(),
            pruning: PruningConfig::default(),
            range: RangePolicy::default(),
        }
    }
}

impl RunConfig {
    pub fn objective_set(&self) -> Result<ObjectiveSet> {
        let pairs: Vec<(&str, &str)> = self
            .objectives
            .iter()
            .map(|e| (e.name.as_str(), e.direction.as_str()))
            .collect();
        ObjectiveSet::parse(&pairs)
    }

    pub fn decision_bounds(&self) -> Result<DecisionBounds> {
        let b = &self.bounds;
        DecisionBounds::new(vec![b.power_w, b.speed_mm_s, b.hatch_um])
    }

    pub fn contexts(&self) -> Vec<ProcessContext> {
        self.layer_thicknesses_um
            .iter()
            .map(|lt| ProcessContext::new(*lt))
            .collect()
    }

    /// Check everything a run needs before any solver work starts.
    pub fn validate(&self) -> Result<()> {
        let objectives = self.objective_set()?;
        if objectives.constrained().is_empty() {
            return Err(Error::InvalidObjectiveSet(
                "at least two objectives are required (one primary, one constrained)".into(),
            ));
        }
        if self.grid_points == 0 {
            return Err(Error::InvalidConfig("grid_points must be >= 1".into()));
        }
        if self.layer_thicknesses_um.is_empty() {
            return Err(Error::InvalidConfig("no layer thicknesses configured".into()));
        }
        if let Some(lt) = self
            .layer_thicknesses_um
            .iter()
            .find(|lt| !(lt.is_finite() && **lt > 0.0))
        {
            return Err(Error::InvalidConfig(format!("layer thickness must be positive, got {lt}")));
        }
        if !(self.range.widen_by.is_finite() && self.range.widen_by > 0.0) {
            return Err(Error::InvalidConfig("range.widen_by must be positive".into()));
        }
        self.decision_bounds()?;
        self.solver.validate()
    }
}

/// Parse a run file body.
pub fn parse_run_config(text: &str) -> Result<RunConfig> {
    toml::from_str(text).map_err(|e| Error::Parse(format!("invalid run file: {e}")))
}

/// Load a run file from disk (not validated).
pub fn load_run_file(path: &Path) -> Result<RunConfig> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("failed to read run file '{}': {e}", path.display())))?;
    parse_run_config(&text)
}
