//! Phase A: differential evolution (best/1/bin) on the unit cube.
//!
//! The search is fully determined by `GlobalConfig::seed`, so repeated runs
//! over the same context and grid produce the same solutions.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::DecisionBounds;
use crate::math::from_unit;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Population size = multiplier × dimension.
    pub popsize_multiplier: usize,
    pub max_generations: usize,
    /// Differential weight is drawn from `[lo, hi)` once per generation.
    pub mutation: (f64, f64),
    pub recombination: f64,
    /// Relative convergence tolerance on the population energy spread.
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            popsize_multiplier: 20,
            max_generations: 50,
            mutation: (0.5, 1.0),
            recombination: 0.7,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

/// Best point found by the global phase.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalOutcome {
    /// Best decision vector (physical units).
    pub x: Vec<f64>,
    pub score: f64,
    pub generations: usize,
    pub evaluations: usize,
    /// Population spread fell below tolerance before the generation cap.
    pub converged: bool,
}

const MIN_POPULATION: usize = 5;

/// Minimise `score` over `bounds`.
///
/// Non-finite scores are treated as `+inf`, so a model that misbehaves in
/// part of the box simply loses every comparison there.
pub fn differential_evolution<F>(mut score: F, bounds: &DecisionBounds, config: &GlobalConfig) -> GlobalOutcome
where
    F: FnMut(&[f64]) -> f64,
{
    let dim = bounds.dim();
    let np = (config.popsize_multiplier * dim).max(MIN_POPULATION);
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut evaluate = |u: &[f64], evaluations: &mut usize| {
        *evaluations += 1;
        let s = score(&from_unit(bounds, u));
        if s.is_finite() { s } else { f64::INFINITY }
    };

    let mut evaluations = 0usize;
    let mut population = latin_hypercube(np, dim, &mut rng);
    let mut energies: Vec<f64> = population.iter().map(|u| evaluate(u, &mut evaluations)).collect();
    let mut best = argmin(&energies);

    let (m_lo, m_hi) = config.mutation;
    let mut generations = 0usize;
    let mut converged = false;

    for _ in 0..config.max_generations {
        generations += 1;
        let scale = if m_hi > m_lo { rng.gen_range(m_lo..m_hi) } else { m_lo };

        for i in 0..np {
            let (r0, r1) = pick_two_others(np, i, &mut rng);
            let fill = rng.gen_range(0..dim);

            let mut trial = population[i].clone();
            for j in 0..dim {
                if j == fill || rng.r#gen::<f64>() < config.recombination {
                    trial[j] = population[best][j] + scale * (population[r0][j] - population[r1][j]);
                }
            }
            for t in trial.iter_mut() {
                if !(0.0..=1.0).contains(t) {
                    *t = rng.r#gen::<f64>();
                }
            }

            let e = evaluate(&trial, &mut evaluations);
            if e <= energies[i] {
                population[i] = trial;
                energies[i] = e;
                if e < energies[best] {
                    best = i;
                }
            }
        }

        if has_converged(&energies, config.tolerance) {
            converged = true;
            break;
        }
    }

    GlobalOutcome {
        x: from_unit(bounds, &population[best]),
        score: energies[best],
        generations,
        evaluations,
        converged,
    }
}

/// One stratified sample per row in each dimension, columns shuffled independently.
fn latin_hypercube(n: usize, dim: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let segment = 1.0 / n as f64;
    let mut samples = vec![vec![0.0; dim]; n];
    let mut order: Vec<usize> = (0..n).collect();
    for j in 0..dim {
        order.shuffle(rng);
        for (row, &stratum) in order.iter().enumerate() {
            samples[row][j] = (stratum as f64 + rng.r#gen::<f64>()) * segment;
        }
    }
    samples
}

fn pick_two_others(n: usize, exclude: usize, rng: &mut StdRng) -> (usize, usize) {
    let mut r0 = rng.gen_range(0..n);
    while r0 == exclude {
        r0 = rng.gen_range(0..n);
    }
    let mut r1 = rng.gen_range(0..n);
    while r1 == exclude || r1 == r0 {
        r1 = rng.gen_range(0..n);
    }
    (r0, r1)
}

fn argmin(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold(0, |best, (i, v)| if *v < values[best] { i } else { best })
}

/// `std(energies) <= tol * |mean(energies)|`.
fn has_converged(energies: &[f64], tol: f64) -> bool {
    if energies.iter().any(|e| !e.is_finite()) {
        return false;
    }
    let n = energies.len() as f64;
    let mean = energies.iter().sum::<f64>() / n;
    let var = energies.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n;
    var.sqrt() <= tol * mean.abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(x: &[f64]) -> f64 {
        (x[0] - 1.0).powi(2) + (x[1] + 2.0).powi(2) + 3.0
    }

    #[test]
    fn finds_minimum_of_shifted_sphere() {
        let bounds = DecisionBounds::new(vec![(-5.0, 5.0), (-5.0, 5.0)]).unwrap();
        let out = differential_evolution(sphere, &bounds, &GlobalConfig::default());
        assert!((out.x[0] - 1.0).abs() < 0.2, "x={:?}", out.x);
        assert!((out.x[1] + 2.0).abs() < 0.2, "x={:?}", out.x);
        assert!(out.score < 3.05);
    }

    #[test]
    fn same_seed_gives_same_result() {
        let bounds = DecisionBounds::new(vec![(-5.0, 5.0), (-5.0, 5.0)]).unwrap();
        let cfg = GlobalConfig::default();
        let a = differential_evolution(sphere, &bounds, &cfg);
        let b = differential_evolution(sphere, &bounds, &cfg);
        assert_eq!(a, b);
    }

    #[test]
    fn respects_bounds_and_evaluation_budget() {
        let bounds = DecisionBounds::new(vec![(2.0, 3.0), (0.0, 1.0)]).unwrap();
        let cfg = GlobalConfig {
            max_generations: 3,
            ..GlobalConfig::default()
        };
        let out = differential_evolution(sphere, &bounds, &cfg);
        assert!(bounds.contains(&out.x));
        let np = 40;
        assert!(out.evaluations <= np * (1 + 3));
        assert!(out.generations <= 3);
    }

    #[test]
    fn latin_hypercube_covers_every_stratum() {
        let mut rng = StdRng::seed_from_u64(7);
        let s = latin_hypercube(10, 2, &mut rng);
        for j in 0..2 {
            let mut strata: Vec<usize> = s.iter().map(|row| (row[j] * 10.0) as usize).collect();
            strata.sort_unstable();
            assert_eq!(strata, (0..10).collect::<Vec<_>>());
        }
    }

    #[test]
    fn non_finite_scores_never_win() {
        let bounds = DecisionBounds::new(vec![(0.0, 1.0)]).unwrap();
        let out = differential_evolution(
            |x: &[f64]| if x[0] < 0.5 { f64::NAN } else { x[0] },
            &bounds,
            &GlobalConfig::default(),
        );
        assert!(out.x[0] >= 0.5);
        assert!(out.score.is_finite());
    }
}
