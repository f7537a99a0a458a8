// ─────────────────────────────────────────────────────────────────────
// TeaLeaf Post — Solver Log Decoding
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Extraction of per-timestep performance figures from a solver log.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tealeaf_types::error::{TeaError, TeaResult};

/// File name of the solver log inside a run directory.
pub const SOLVER_LOG_FILENAME: &str = "tea.out";

const TIMESTEP_PATTERN: &str = r"Timestep\s+(\d+)";
const CG_PATTERN: &str = r"CG:\s+(\d+)\siterations";
const WALLCLOCK_PATTERN: &str = r"Wallclock:\s+([\d.]+)s";

/// Per-timestep figures, in log order. All vectors have equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSeries {
    pub timesteps: Vec<u64>,
    pub solver_iterations: Vec<u64>,
    pub wallclock: Vec<f64>,
}

impl PerformanceSeries {
    pub fn len(&self) -> usize {
        self.timesteps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timesteps.is_empty()
    }

    pub fn to_json(&self) -> TeaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A record whose value does not parse is an error rather than a gap, so
/// the series never shift against each other.
fn captures<T>(pattern: &str, text: &str) -> TeaResult<Vec<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let re = Regex::new(pattern).map_err(|e| TeaError::ConfigError(e.to_string()))?;
    re.captures_iter(text)
        .filter_map(|c| Some((c.get(0)?, c.get(1)?)))
        .map(|(record, value)| {
            value.as_str().parse().map_err(|e: T::Err| TeaError::MalformedLog {
                token: record.as_str().to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Decodes `Timestep N`, `CG: N iterations` and `Wallclock: Xs` records.
///
/// Series are truncated to the shortest so that a log cut off mid-step
/// still yields aligned entries.
pub fn decode_performance_log(text: &str) -> TeaResult<PerformanceSeries> {
    let mut timesteps: Vec<u64> = captures(TIMESTEP_PATTERN, text)?;
    let mut solver_iterations: Vec<u64> = captures(CG_PATTERN, text)?;
    let mut wallclock: Vec<f64> = captures(WALLCLOCK_PATTERN, text)?;

    let n = timesteps.len().min(solver_iterations.len()).min(wallclock.len());
    timesteps.truncate(n);
    solver_iterations.truncate(n);
    wallclock.truncate(n);

    Ok(PerformanceSeries {
        timesteps,
        solver_iterations,
        wallclock,
    })
}

/// Reads `tea.out` from `log_dir` and decodes it.
pub fn decode_performance_dir(log_dir: impl AsRef<Path>) -> TeaResult<PerformanceSeries> {
    let path = log_dir.as_ref().join(SOLVER_LOG_FILENAME);
    let text = std::fs::read_to_string(&path).map_err(|e| {
        TeaError::MissingInput(format!("cannot read solver log '{}': {e}", path.display()))
    })?;
    let series = decode_performance_log(&text)?;
    tracing::info!(path = %path.display(), steps = series.len(), "decoded solver log");
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
 Timestep      1
 CG:  12 iterations
 Wallclock: 0.015s
 Timestep      2
 CG:  9 iterations
 Wallclock:    0.031s
 Timestep      3
 CG:  7 iterations
";

    #[test]
    fn test_decode_truncates_to_shortest() {
        let series = decode_performance_log(LOG).unwrap();
        assert_eq!(series.timesteps, vec![1, 2]);
        assert_eq!(series.solver_iterations, vec![12, 9]);
        assert_eq!(series.wallclock, vec![0.015, 0.031]);
    }

    #[test]
    fn test_decode_empty_log() {
        let series = decode_performance_log("no solver output here").unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_decode_rejects_unparsable_wallclock() {
        let log = " Timestep 1\n CG: 4 iterations\n Wallclock: 1.2.3s\n";
        let err = decode_performance_log(log).unwrap_err();
        match err {
            TeaError::MalformedLog { token, .. } => assert_eq!(token, "Wallclock: 1.2.3s"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_rejects_overflowing_timestep() {
        let log = " Timestep 99999999999999999999999\n";
        assert!(matches!(
            decode_performance_log(log),
            Err(TeaError::MalformedLog { .. })
        ));
    }

    #[test]
    fn test_decode_dir_missing_log() {
        let dir = tempfile::tempdir().unwrap();
        let err = decode_performance_dir(dir.path()).unwrap_err();
        assert!(matches!(err, TeaError::MissingInput(_)));
    }

    #[test]
    fn test_decode_dir_and_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SOLVER_LOG_FILENAME), LOG).unwrap();
        let series = decode_performance_dir(dir.path()).unwrap();
        let back: PerformanceSeries = serde_json::from_str(&series.to_json().unwrap()).unwrap();
        assert_eq!(back, series);
    }
}
