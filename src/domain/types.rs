//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during the grid walk
//! - exported to JSON for downstream ranking/plotting tools
//! - compared in tests without any solver in the loop

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Optimization direction of an objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Min,
    Max,
}

impl Direction {
    /// Multiplier that maps the objective into minimization space.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Min => 1.0,
            Direction::Max => -1.0,
        }
    }

    /// `true` if `a` is strictly better than `b`.
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            Direction::Min => a < b,
            Direction::Max => a > b,
        }
    }

    /// The better of two values.
    pub fn best(self, a: f64, b: f64) -> f64 {
        if self.is_better(b, a) { b } else { a }
    }

    /// The worse of two values.
    pub fn worst(self, a: f64, b: f64) -> f64 {
        if self.is_better(b, a) { a } else { b }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Min => "min",
            Direction::Max => "max",
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" | "minimize" => Ok(Direction::Min),
            "max" | "maximize" => Ok(Direction::Max),
            _ => Err(Error::UnknownDirection(s.to_string())),
        }
    }
}

/// The closed set of metrics that can be used as objectives.
///
/// Every evaluation produces all of them, so any subset can be configured
/// as primary/constrained objectives without touching the solver.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Metric {
    /// Total part cost per mm³ (CNY).
    Cost,
    /// Total carbon emission per mm³ (kgCO2).
    Carbon,
    /// Volumetric build rate (mm³/s).
    Efficiency,
    /// Process robustness index: quality loss plus energy-density stability penalty.
    QualityRobustness,
    /// Relative density (%).
    RelativeDensity,
    /// Volumetric energy density (J/mm³).
    EnergyDensity,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Cost,
        Metric::Carbon,
        Metric::Efficiency,
        Metric::QualityRobustness,
        Metric::RelativeDensity,
        Metric::EnergyDensity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Cost => "Cost",
            Metric::Carbon => "Carbon",
            Metric::Efficiency => "Efficiency",
            Metric::QualityRobustness => "QualityRobustness",
            Metric::RelativeDensity => "RelativeDensity",
            Metric::EnergyDensity => "EnergyDensity",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != ' ')
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "cost" => Ok(Metric::Cost),
            "carbon" => Ok(Metric::Carbon),
            "efficiency" | "buildrate" => Ok(Metric::Efficiency),
            "qualityrobustness" | "pri" => Ok(Metric::QualityRobustness),
            "relativedensity" | "rd" => Ok(Metric::RelativeDensity),
            "energydensity" | "ed" => Ok(Metric::EnergyDensity),
            _ => Err(Error::UnknownObjective(s.to_string())),
        }
    }
}

/// One configured objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveSpec {
    pub metric: Metric,
    pub direction: Direction,
}

impl ObjectiveSpec {
    pub fn new(metric: Metric, direction: Direction) -> Self {
        Self { metric, direction }
    }

    /// Parse a `NAME:DIR` pair (e.g. `Carbon:min`).
    pub fn parse_pair(s: &str) -> Result<Self, Error> {
        let (name, dir) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidObjectiveSet(format!("expected NAME:DIR, got '{s}'")))?;
        Ok(Self::new(name.parse()?, dir.parse()?))
    }
}

/// Ordered, validated objective configuration for one run.
///
/// The first entry is the primary objective; the rest are turned into
/// epsilon constraints by the grid controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ObjectiveSpec>", into = "Vec<ObjectiveSpec>")]
pub struct ObjectiveSet {
    specs: Vec<ObjectiveSpec>,
}

impl TryFrom<Vec<ObjectiveSpec>> for ObjectiveSet {
    type Error = Error;

    fn try_from(specs: Vec<ObjectiveSpec>) -> Result<Self, Error> {
        Self::new(specs)
    }
}

impl From<ObjectiveSet> for Vec<ObjectiveSpec> {
    fn from(set: ObjectiveSet) -> Self {
        set.specs
    }
}

impl ObjectiveSet {
    pub fn new(specs: Vec<ObjectiveSpec>) -> Result<Self, Error> {
        if specs.is_empty() {
            return Err(Error::InvalidObjectiveSet("no objectives configured".into()));
        }
        for (i, spec) in specs.iter().enumerate() {
            if specs[..i].iter().any(|s| s.metric == spec.metric) {
                return Err(Error::InvalidObjectiveSet(format!(
                    "objective '{}' configured more than once",
                    spec.metric
                )));
            }
        }
        Ok(Self { specs })
    }

    /// Parse `(name, direction)` string pairs, failing on the first unknown name.
    pub fn parse<N, D>(entries: &[(N, D)]) -> Result<Self, Error>
    where
        N: AsRef<str>,
        D: AsRef<str>,
    {
        let specs = entries
            .iter()
            .map(|(n, d)| Ok(ObjectiveSpec::new(n.as_ref().parse()?, d.as_ref().parse()?)))
            .collect::<Result<Vec<_>, Error>>()?;
        Self::new(specs)
    }

    /// Cost:min, Carbon:min, Efficiency:max.
    pub fn three_objective_default() -> Self {
        Self {
            specs: vec![
                ObjectiveSpec::new(Metric::Cost, Direction::Min),
                ObjectiveSpec::new(Metric::Carbon, Direction::Min),
                ObjectiveSpec::new(Metric::Efficiency, Direction::Max),
            ],
        }
    }

    pub fn primary(&self) -> ObjectiveSpec {
        self.specs[0]
    }

    pub fn constrained(&self) -> &[ObjectiveSpec] {
        &self.specs[1..]
    }

    pub fn specs(&self) -> &[ObjectiveSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn direction_of(&self, metric: Metric) -> Option<Direction> {
        self.specs.iter().find(|s| s.metric == metric).map(|s| s.direction)
    }
}

/// Closed box bounds `[min, max]` for each continuous decision variable.
///
/// `min == max` is allowed and pins the variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionBounds {
    bounds: Vec<(f64, f64)>,
}

impl DecisionBounds {
    pub fn new(bounds: Vec<(f64, f64)>) -> Result<Self, Error> {
        if bounds.is_empty() {
            return Err(Error::InvalidConfig("decision space has no variables".into()));
        }
        for (index, &(low, high)) in bounds.iter().enumerate() {
            if !(low.is_finite() && high.is_finite() && low <= high) {
                return Err(Error::InvalidBounds { index, low, high });
            }
        }
        Ok(Self { bounds })
    }

    /// Laser power (W), scan speed (mm/s), hatch spacing (µm).
    pub fn lpbf_default() -> Self {
        Self {
            bounds: vec![(385.0, 460.0), (700.0, 1150.0), (90.0, 115.0)],
        }
    }

    pub fn dim(&self) -> usize {
        self.bounds.len()
    }

    pub fn as_slice(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    pub fn width(&self, i: usize) -> f64 {
        self.bounds[i].1 - self.bounds[i].0
    }

    pub fn is_pinned(&self, i: usize) -> bool {
        self.width(i) <= 0.0
    }

    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.bounds.len()
            && x.iter().zip(&self.bounds).all(|(v, &(lo, hi))| *v >= lo && *v <= hi)
    }
}

/// Fixed process settings that parameterize one independent run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessContext {
    /// Powder layer thickness (µm).
    pub layer_thickness_um: f64,
}

impl ProcessContext {
    pub fn new(layer_thickness_um: f64) -> Self {
        Self { layer_thickness_um }
    }

    pub fn label(&self) -> String {
        format!("LT={}um", self.layer_thickness_um)
    }
}

/// Full metric vector for one decision vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveVector {
    pub cost: f64,
    pub carbon: f64,
    pub efficiency: f64,
    pub quality_robustness: f64,
    pub relative_density: f64,
    pub energy_density: f64,
}

impl ObjectiveVector {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Cost => self.cost,
            Metric::Carbon => self.carbon,
            Metric::Efficiency => self.efficiency,
            Metric::QualityRobustness => self.quality_robustness,
            Metric::RelativeDensity => self.relative_density,
            Metric::EnergyDensity => self.energy_density,
        }
    }

    pub fn is_finite(&self) -> bool {
        Metric::ALL.iter().all(|m| self.get(*m).is_finite())
    }
}

/// Acceptance tolerance for an inequality `achieved <= limit` (or `>=`).
///
/// The allowed excess is `absolute + relative * |limit|`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub absolute: f64,
    pub relative: f64,
}

impl Tolerance {
    pub fn allowance(&self, limit: f64) -> f64 {
        self.absolute + self.relative * limit.abs()
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            absolute: 1e-9,
            relative: 1e-5,
        }
    }
}

/// An objective converted into a bound for one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpsilonConstraint {
    pub metric: Metric,
    pub direction: Direction,
    pub limit: f64,
}

impl EpsilonConstraint {
    /// Signed margin; `>= 0` when satisfied.
    ///
    /// Minimized objectives: `limit - achieved`; maximized: `achieved - limit`.
    pub fn margin(&self, achieved: f64) -> f64 {
        match self.direction {
            Direction::Min => self.limit - achieved,
            Direction::Max => achieved - self.limit,
        }
    }

    /// Unused margin, clamped at zero.
    pub fn slack(&self, achieved: f64) -> f64 {
        self.margin(achieved).max(0.0)
    }

    /// Amount by which the bound is exceeded, clamped at zero.
    pub fn excess(&self, achieved: f64) -> f64 {
        (-self.margin(achieved)).max(0.0)
    }

    pub fn is_satisfied(&self, achieved: f64, tol: &Tolerance) -> bool {
        self.excess(achieved) <= tol.allowance(self.limit)
    }
}

/// Epsilon thresholds for the constrained objectives of one subproblem.
///
/// Insertion order follows the objective configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpsilonMap {
    constraints: Vec<EpsilonConstraint>,
}

impl EpsilonMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the bound for `spec.metric`.
    pub fn insert(&mut self, spec: ObjectiveSpec, limit: f64) {
        let c = EpsilonConstraint {
            metric: spec.metric,
            direction: spec.direction,
            limit,
        };
        match self.constraints.iter_mut().find(|e| e.metric == spec.metric) {
            Some(existing) => *existing = c,
            None => self.constraints.push(c),
        }
    }

    pub fn get(&self, metric: Metric) -> Option<&EpsilonConstraint> {
        self.constraints.iter().find(|c| c.metric == metric)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EpsilonConstraint> {
        self.constraints.iter()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// `true` if every bound holds for `objectives` within `tol`.
    pub fn is_satisfied_by(&self, objectives: &ObjectiveVector, tol: &Tolerance) -> bool {
        self.constraints
            .iter()
            .all(|c| c.is_satisfied(objectives.get(c.metric), tol))
    }
}

/// A resolved subproblem: decision vector plus its full objective vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub decision: Vec<f64>,
    pub objectives: ObjectiveVector,
    pub feasible: bool,
}

impl Solution {
    /// Pareto dominance over `specs`: no worse in all, strictly better in one.
    pub fn dominates(&self, other: &Solution, specs: &[ObjectiveSpec]) -> bool {
        let mut strictly_better = false;
        for s in specs {
            let a = self.objectives.get(s.metric);
            let b = other.objectives.get(s.metric);
            if s.direction.is_better(b, a) {
                return false;
            }
            if s.direction.is_better(a, b) {
                strictly_better = true;
            }
        }
        strictly_better
    }

    /// Strictly better than `other` on every objective by more than
    /// `rel_margin * max(|a|, |b|, 1e-12)`.
    pub fn strictly_dominates(&self, other: &Solution, specs: &[ObjectiveSpec], rel_margin: f64) -> bool {
        specs.iter().all(|s| {
            let a = self.objectives.get(s.metric);
            let b = other.objectives.get(s.metric);
            let margin = rel_margin * a.abs().max(b.abs()).max(1e-12);
            s.direction.sign() * (b - a) > margin
        })
    }
}
