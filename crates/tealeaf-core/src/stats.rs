// ─────────────────────────────────────────────────────────────────────
// TeaLeaf Post — Error Statistics
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Scalar error summaries of difference grids, one per iteration.

use std::collections::BTreeMap;
use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tealeaf_types::error::{TeaError, TeaResult};
use tealeaf_types::state::{DifferenceGrid, FieldName, GlobalGrid};

/// Error statistics of a single field.
///
/// Relative errors are `|a-b| / |a|` over cells with a non-zero reference
/// value `a`; they are `None` when no such cell exists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldErrorStats {
    pub max_abs: f64,
    pub mean_abs: f64,
    pub mean_relative: Option<f64>,
    pub max_relative: Option<f64>,
}

impl FieldErrorStats {
    pub fn compute(reference: &Array1<f64>, abs_diff: &Array1<f64>) -> Self {
        let n = abs_diff.len();
        let max_abs = abs_diff.iter().copied().fold(0.0_f64, f64::max);
        let mean_abs = if n == 0 { 0.0 } else { abs_diff.sum() / n as f64 };

        let relative: Vec<f64> = reference
            .iter()
            .zip(abs_diff.iter())
            .filter(|(a, _)| **a != 0.0)
            .map(|(a, d)| d / a.abs())
            .collect();
        let (mean_relative, max_relative) = if relative.is_empty() {
            (None, None)
        } else {
            (
                Some(relative.iter().sum::<f64>() / relative.len() as f64),
                Some(relative.iter().copied().fold(0.0_f64, f64::max)),
            )
        };

        Self {
            max_abs,
            mean_abs,
            mean_relative,
            max_relative,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub iteration: usize,
    pub density: FieldErrorStats,
    pub energy: FieldErrorStats,
    pub temperature: FieldErrorStats,
}

impl ErrorSummary {
    pub fn new(reference: &GlobalGrid, difference: &DifferenceGrid) -> TeaResult<Self> {
        if reference.iteration != difference.iteration() {
            return Err(TeaError::IncompatibleGrids {
                iteration: reference.iteration,
                message: format!(
                    "difference grid belongs to iteration {}",
                    difference.iteration()
                ),
            });
        }
        let stats = |name: FieldName| -> TeaResult<FieldErrorStats> {
            let a = reference.fields.get(name);
            let d = difference.fields().get(name);
            if a.len() != d.len() {
                return Err(TeaError::ShapeMismatch {
                    iteration: reference.iteration,
                    field: name.to_string(),
                    expected: a.len(),
                    actual: d.len(),
                });
            }
            Ok(FieldErrorStats::compute(a, d))
        };
        Ok(Self {
            iteration: reference.iteration,
            density: stats(FieldName::Density)?,
            energy: stats(FieldName::Energy)?,
            temperature: stats(FieldName::Temperature)?,
        })
    }

    pub fn field(&self, name: FieldName) -> &FieldErrorStats {
        match name {
            FieldName::Density => &self.density,
            FieldName::Energy => &self.energy,
            FieldName::Temperature => &self.temperature,
        }
    }
}

/// Summaries keyed and ordered by iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorSeries {
    summaries: BTreeMap<usize, ErrorSummary>,
}

impl ErrorSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the summary previously stored for the same iteration, if any.
    pub fn push(&mut self, summary: ErrorSummary) -> Option<ErrorSummary> {
        self.summaries.insert(summary.iteration, summary)
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorSummary> {
        self.summaries.values()
    }

    pub fn iterations(&self) -> Vec<usize> {
        self.summaries.keys().copied().collect()
    }

    /// `(iteration, value)` points of one statistic, ascending by iteration.
    pub fn series(
        &self,
        name: FieldName,
        stat: impl Fn(&FieldErrorStats) -> Option<f64>,
    ) -> Vec<(usize, f64)> {
        self.summaries
            .values()
            .filter_map(|s| stat(s.field(name)).map(|v| (s.iteration, v)))
            .collect()
    }

    pub fn to_json(&self) -> TeaResult<String> {
        let list: Vec<&ErrorSummary> = self.iter().collect();
        Ok(serde_json::to_string_pretty(&list)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> TeaResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl FromIterator<ErrorSummary> for ErrorSeries {
    fn from_iter<I: IntoIterator<Item = ErrorSummary>>(iter: I) -> Self {
        let mut series = Self::new();
        for summary in iter {
            series.push(summary);
        }
        series
    }
}
