//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the solver/controller code stays free of presentation details
//! - output changes are localized

use crate::augmecon::{PayoffTable, RunReport};
use crate::domain::{Metric, ProcessContext, Solution};
use crate::error::Error;

/// Payoff matrix: one row per optimized objective, one column per objective.
pub fn format_payoff_table(context: &ProcessContext, table: &PayoffTable) -> String {
    let mut out = String::new();
    out.push_str(&format!("Payoff table ({})\n", context.label()));

    let columns: Vec<Metric> = table.ranges.iter().map(|r| r.objective.metric).collect();
    out.push_str(&format!("{:<22}", "optimized \\ value"));
    for m in &columns {
        out.push_str(&format!("{:>14}", truncate(m.name(), 13)));
    }
    out.push('\n');

    for row in &table.rows {
        let label = format!("{} ({})", row.objective.metric, row.objective.direction.label());
        out.push_str(&format!("{:<22}", truncate(&label, 21)));
        for m in &columns {
            out.push_str(&format!("{:>14}", fmt_value(row.vector.get(*m))));
        }
        if let Some(source) = row.surrogate_of {
            out.push_str(&format!("  (surrogate: {source})"));
        }
        out.push('\n');
    }

    out.push_str(&format!("{:<22}", "ideal"));
    for r in &table.ranges {
        out.push_str(&format!("{:>14}", fmt_value(r.ideal)));
    }
    out.push('\n');
    out.push_str(&format!("{:<22}", "nadir"));
    for r in &table.ranges {
        let mark = if r.widened { "*" } else { "" };
        out.push_str(&format!("{:>14}", format!("{}{mark}", fmt_value(r.nadir))));
    }
    out.push('\n');
    if table.ranges.iter().any(|r| r.widened) {
        out.push_str("  * degenerate range widened\n");
    }
    out
}

/// Run summary: counts plus the non-dominated solutions.
pub fn format_run_summary(report: &RunReport) -> String {
    let mut out = String::new();
    let c = &report.counts;

    out.push_str(&format!("=== AUGMECON-R run ({}) ===\n", report.context.label()));
    let objectives: Vec<String> = report
        .objectives
        .specs()
        .iter()
        .map(|s| format!("{}:{}", s.metric, s.direction.label()))
        .collect();
    out.push_str(&format!("Objectives: {}\n", objectives.join(", ")));
    out.push_str(&format!(
        "Cells: total={} visited={} solved={} infeasible={} pruned={}\n",
        c.total_cells,
        c.visited,
        c.solved,
        c.skipped,
        c.pruned()
    ));

    let front = report.non_dominated();
    out.push_str(&format!(
        "Solutions: {} raw, {} non-dominated\n\n",
        report.solutions.len(),
        front.len()
    ));
    out.push_str(&format_solutions(&front, report));
    out
}

fn format_solutions(solutions: &[&Solution], report: &RunReport) -> String {
    let mut out = String::new();
    let metrics: Vec<Metric> = report.objectives.specs().iter().map(|s| s.metric).collect();

    out.push_str(&format!("{:>4} {:>9} {:>9} {:>8}", "#", "P[W]", "V[mm/s]", "H[um]"));
    for m in &metrics {
        out.push_str(&format!("{:>14}", truncate(m.name(), 13)));
    }
    out.push_str(&format!("{:>9}\n", "RD[%]"));

    for (i, s) in solutions.iter().enumerate() {
        let x = |k: usize| s.decision.get(k).copied().unwrap_or(f64::NAN);
        out.push_str(&format!("{:>4} {:>9.2} {:>9.2} {:>8.2}", i + 1, x(0), x(1), x(2)));
        for m in &metrics {
            out.push_str(&format!("{:>14}", fmt_value(s.objectives.get(*m))));
        }
        out.push_str(&format!("{:>9.3}\n", s.objectives.relative_density));
    }
    out
}

pub fn format_context_failure(context: &ProcessContext, error: &Error) -> String {
    format!("=== {} failed: {error}\n", context.label())
}

fn fmt_value(v: f64) -> String {
    if v != 0.0 && (v.abs() < 1e-2 || v.abs() >= 1e5) {
        format!("{v:.4e}")
    } else {
        format!("{v:.4}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augmecon::{ObjectiveRange, PayoffRow, ResultCollector};
    use crate::domain::{Direction, EpsilonMap, ObjectiveSet, ObjectiveSpec, ObjectiveVector};

    fn vector(cost: f64, carbon: f64, efficiency: f64) -> ObjectiveVector {
        ObjectiveVector {
            cost,
            carbon,
            efficiency,
            quality_robustness: 0.2,
            relative_density: 99.5,
            energy_density: 48.0,
        }
    }

    fn table() -> PayoffTable {
        let cost = ObjectiveSpec::new(Metric::Cost, Direction::Min);
        let eff = ObjectiveSpec::new(Metric::Efficiency, Direction::Max);
        PayoffTable {
            rows: vec![
                PayoffRow {
                    objective: cost,
                    decision: vec![385.0, 700.0, 90.0],
                    vector: vector(3.88, 0.08, 6.3),
                    surrogate_of: None,
                },
                PayoffRow {
                    objective: eff,
                    decision: vec![385.0, 700.0, 90.0],
                    vector: vector(3.88, 0.08, 6.3),
                    surrogate_of: Some(Metric::Cost),
                },
            ],
            ranges: vec![
                ObjectiveRange {
                    objective: cost,
                    ideal: 3.88,
                    nadir: 3.881,
                    widened: true,
                },
                ObjectiveRange {
                    objective: eff,
                    ideal: 6.3,
                    nadir: 6.299,
                    widened: true,
                },
            ],
        }
    }

    #[test]
    fn payoff_table_marks_surrogates_and_widening() {
        let s = format_payoff_table(&ProcessContext::new(100.0), &table());
        assert!(s.contains("LT=100um"));
        assert!(s.contains("(surrogate: Cost)"));
        assert!(s.contains("3.8810*"));
        assert!(s.contains("degenerate range widened"));
    }

    #[test]
    fn run_summary_lists_counts_and_front() {
        let mut c = ResultCollector::new(4);
        let solution = Solution {
            decision: vec![400.0, 900.0, 100.0],
            objectives: vector(4.0, 0.1, 9.0),
            feasible: true,
        };
        c.record_feasible(&[0], EpsilonMap::new(), solution, 2);
        c.record_infeasible(&[2], EpsilonMap::new(), 3);
        let report = c.finish(
            ProcessContext::new(80.0),
            ObjectiveSet::three_objective_default(),
            table(),
            vec![],
        );
        let s = format_run_summary(&report);
        assert!(s.contains("visited=2 solved=1 infeasible=1 pruned=2"));
        assert!(s.contains("Cost:min, Carbon:min, Efficiency:max"));
        assert!(s.contains("1 raw, 1 non-dominated"));
        assert!(s.contains("400.00"));
    }

    #[test]
    fn small_values_use_scientific_notation() {
        assert_eq!(fmt_value(0.0012), "1.2000e-3");
        assert_eq!(fmt_value(4.25), "4.2500");
        assert_eq!(fmt_value(0.0), "0.0000");
    }
}
