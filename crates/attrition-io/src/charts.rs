//! Chart-ready summaries over the cleaned table.
//!
//! The pipeline's only obligation to the presentation layer is exposing
//! the cleaned table; these helpers reduce it to plain serializable data
//! for the three standard charts (target counts, scatter, boxplot).

use serde::Serialize;

use crate::DataError;
use crate::table::CleanTable;

/// Row counts per target class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TargetCounts {
    /// Employees with `Attrition = 0`.
    pub retained: usize,
    /// Employees with `Attrition = 1`.
    pub attrition: usize,
}

/// One point of a two-feature scatter, colored by target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub label: usize,
}

/// Five-number summary of one numeric feature within one target class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoxSummary {
    /// Target class this summary describes.
    pub label: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// Number of rows in the class.
    pub n: usize,
}

/// Count rows per target class.
#[must_use]
pub fn target_counts(table: &CleanTable) -> TargetCounts {
    let attrition = table.target().iter().filter(|&&t| t == 1).count();
    TargetCounts {
        retained: table.n_rows() - attrition,
        attrition,
    }
}

/// Build a scatter of two named features, one point per row, colored by target.
///
/// # Errors
///
/// Returns [`DataError::UnknownColumn`] when either feature name is absent.
pub fn scatter(table: &CleanTable, x: &str, y: &str) -> Result<Vec<ScatterPoint>, DataError> {
    let xs = table.feature_column(x)?;
    let ys = table.feature_column(y)?;
    Ok(xs
        .iter()
        .zip(&ys)
        .zip(table.target())
        .map(|((&x, &y), &label)| ScatterPoint { x, y, label })
        .collect())
}

/// Five-number summaries of a named feature, one per target class present.
///
/// Classes with zero rows produce no summary. Quartiles use linear
/// interpolation between closest ranks.
///
/// # Errors
///
/// Returns [`DataError::UnknownColumn`] when the feature name is absent.
pub fn box_by_target(table: &CleanTable, column: &str) -> Result<Vec<BoxSummary>, DataError> {
    let values = table.feature_column(column)?;
    let mut summaries = Vec::with_capacity(2);
    for label in [0usize, 1] {
        let mut group: Vec<f64> = values
            .iter()
            .zip(table.target())
            .filter(|&(_, &t)| t == label)
            .map(|(&v, _)| v)
            .collect();
        if group.is_empty() {
            continue;
        }
        group.sort_unstable_by(f64::total_cmp);
        summaries.push(BoxSummary {
            label,
            min: group[0],
            q1: quantile(&group, 0.25),
            median: quantile(&group, 0.5),
            q3: quantile(&group, 0.75),
            max: group[group.len() - 1],
            n: group.len(),
        });
    }
    Ok(summaries)
}

/// Linear-interpolation quantile over a sorted non-empty slice.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let rank = p * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}
