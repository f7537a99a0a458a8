// ─────────────────────────────────────────────────────────────────────
// TeaLeaf Post — Batch Pipeline
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Directory-level drivers: merge every iteration of a chunked run, or
//! compare two directories of merged grids.
//!
//! Filename decoding and recovery run sequentially; once the manifest is
//! final, iterations are independent and processed in parallel with rayon.
//! Each output file is produced by a single write of a fully assembled grid.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tealeaf_types::codec::GridCodec;
use tealeaf_types::config::{ChunkLayout, FailurePolicy, PostprocessConfig};
use tealeaf_types::error::{TeaError, TeaResult};
use tealeaf_types::manifest::{IterationChunks, IterationManifest};
use tealeaf_types::state::{ChunkData, GlobalGrid};

use crate::assemble::{grid_from_raw, merge_iteration};
use crate::diff::compute_difference;
use crate::filename::{decode_filenames, output_filename, NamingScheme};
use crate::recovery::{recover_missing_chunks, RecoveryReport};
use crate::stats::{ErrorSeries, ErrorSummary};

/// An iteration that could not be produced.
#[derive(Debug)]
pub struct IterationFailure {
    pub iteration: usize,
    pub error: TeaError,
}

#[derive(Debug, Default)]
pub struct MergeReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<IterationFailure>,
    pub recovery: RecoveryReport,
    pub removed_inputs: usize,
}

#[derive(Debug, Default)]
pub struct CompareReport {
    pub series: ErrorSeries,
    pub written: Vec<PathBuf>,
    pub failures: Vec<IterationFailure>,
}

/// Files in `dir` with extension `extension`, sorted by name.
pub fn discover_inputs(dir: &Path, extension: &str) -> TeaResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        TeaError::MissingInput(format!("cannot read input directory '{}': {e}", dir.display()))
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(extension) {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(TeaError::MissingInput(format!(
            "no '*.{extension}' files in '{}'",
            dir.display()
        )));
    }
    files.sort();
    tracing::debug!(dir = %dir.display(), files = files.len(), "inputs discovered");
    Ok(files)
}

/// Reads every chunk listed for one iteration.
pub fn load_chunks(
    codec: &dyn GridCodec,
    iteration: usize,
    chunks: &IterationChunks,
) -> TeaResult<Vec<ChunkData>> {
    chunks
        .values()
        .map(|chunk| {
            let raw = codec.read(&chunk.source)?;
            ChunkData::from_raw(chunk.key, iteration, raw)
        })
        .collect()
}

fn load_grid(codec: &dyn GridCodec, iteration: usize, path: &Path) -> TeaResult<GlobalGrid> {
    grid_from_raw(iteration, codec.read(path)?)
}

/// Runs `run` over `work` in parallel. Under `Abort` the first failure stops
/// iterations that have not started yet; those leave no outcome behind.
fn run_iterations<W, T, F>(
    work: &[W],
    policy: FailurePolicy,
    run: F,
) -> Vec<(usize, TeaResult<T>)>
where
    W: Sync,
    T: Send,
    F: Fn(&W) -> (usize, TeaResult<T>) + Sync,
{
    let aborted = AtomicBool::new(false);
    work.par_iter()
        .filter_map(|item| {
            if aborted.load(Ordering::Relaxed) {
                return None;
            }
            let (iteration, outcome) = run(item);
            if outcome.is_err() && policy == FailurePolicy::Abort {
                aborted.store(true, Ordering::Relaxed);
            }
            Some((iteration, outcome))
        })
        .collect()
}

/// Splits per-iteration outcomes. Under `Abort` the failure of the lowest
/// iteration is returned as the error.
fn settle<T>(
    mut outcomes: Vec<(usize, TeaResult<T>)>,
    policy: FailurePolicy,
) -> TeaResult<(Vec<(usize, T)>, Vec<IterationFailure>)> {
    outcomes.sort_by_key(|(iteration, _)| *iteration);
    let mut done = Vec::new();
    let mut failures = Vec::new();
    for (iteration, outcome) in outcomes {
        match outcome {
            Ok(value) => done.push((iteration, value)),
            Err(error) => {
                if policy == FailurePolicy::Abort {
                    return Err(error);
                }
                tracing::error!(iteration, error = %error, "iteration failed");
                failures.push(IterationFailure { iteration, error });
            }
        }
    }
    Ok((done, failures))
}

/// Merges every iteration of the chunk files in `input_dir` into one grid
/// file per iteration in `output_dir`.
///
/// With a layout every iteration must cover the full decomposition; without
/// one, every iteration must hold every key seen in the run.
pub fn merge_directory(
    codec: &dyn GridCodec,
    input_dir: &Path,
    output_dir: &Path,
    layout: Option<&ChunkLayout>,
    config: &PostprocessConfig,
) -> TeaResult<MergeReport> {
    config.validate()?;
    let inputs = discover_inputs(input_dir, &config.extension)?;
    let manifest = decode_filenames(&inputs, NamingScheme::Chunked, config.duplicate_policy)?;
    let (recovered, recovery) = recover_missing_chunks(manifest, layout)?;
    if layout.is_none() {
        recovered.check_complete()?;
    }
    std::fs::create_dir_all(output_dir)?;

    let manifest = recovered.manifest();
    let work: Vec<(usize, &IterationChunks)> = manifest.iter().collect();
    tracing::info!(
        iterations = work.len(),
        chunks = manifest.total_chunks(),
        reused = manifest.carried_forward_count(),
        "merging iterations"
    );

    let outcomes = run_iterations(&work, config.failure_policy, |&(iteration, chunks)| {
        let outcome = load_chunks(codec, iteration, chunks)
            .and_then(|loaded| merge_iteration(iteration, &loaded, config.boundary_policy))
            .and_then(|grid| {
                let path = output_dir.join(output_filename(
                    &config.output_prefix,
                    iteration,
                    config.iteration_padding,
                    &config.extension,
                ));
                codec.write(&grid, &path, config.encoding)?;
                Ok(path)
            });
        (iteration, outcome)
    });

    let (done, failures) = settle(outcomes, config.failure_policy)?;
    let mut report = MergeReport {
        written: done.into_iter().map(|(_, path)| path).collect(),
        failures,
        recovery,
        removed_inputs: 0,
    };

    if config.remove_inputs {
        if report.failures.is_empty() {
            for path in &inputs {
                std::fs::remove_file(path)?;
            }
            report.removed_inputs = inputs.len();
        } else {
            tracing::warn!(
                failed = report.failures.len(),
                "keeping input chunks because some iterations failed"
            );
        }
    }

    tracing::info!(
        written = report.written.len(),
        failed = report.failures.len(),
        removed = report.removed_inputs,
        "merge finished"
    );
    Ok(report)
}

/// Writes `|expected - actual|` for every iteration present in both
/// directories and summarises each difference.
///
/// An iteration present on one side only is a `MissingInput` failure.
pub fn compare_directories(
    codec: &dyn GridCodec,
    expected_dir: &Path,
    actual_dir: &Path,
    output_dir: &Path,
    config: &PostprocessConfig,
) -> TeaResult<CompareReport> {
    config.validate()?;
    let expected = decode_filenames(
        discover_inputs(expected_dir, &config.extension)?,
        NamingScheme::Single,
        config.duplicate_policy,
    )?;
    let actual = decode_filenames(
        discover_inputs(actual_dir, &config.extension)?,
        NamingScheme::Single,
        config.duplicate_policy,
    )?;
    std::fs::create_dir_all(output_dir)?;

    let mut iterations: Vec<usize> = expected
        .iteration_numbers()
        .chain(actual.iteration_numbers())
        .collect();
    iterations.sort_unstable();
    iterations.dedup();

    let source = |manifest: &IterationManifest, iteration: usize| {
        manifest
            .chunks(iteration)
            .and_then(|chunks| chunks.values().next())
            .map(|chunk| chunk.source.clone())
    };
    let work: Vec<(usize, Option<PathBuf>, Option<PathBuf>)> = iterations
        .into_iter()
        .map(|it| (it, source(&expected, it), source(&actual, it)))
        .collect();
    tracing::info!(iterations = work.len(), "comparing iterations");

    let outcomes = run_iterations(
        &work,
        config.failure_policy,
        |(iteration, expected_path, actual_path)| {
            let iteration = *iteration;
            let outcome = match (expected_path, actual_path) {
                (Some(e), Some(a)) => compare_one(codec, iteration, e, a, output_dir, config),
                (None, _) => Err(TeaError::MissingInput(format!(
                    "iteration {iteration} has no expected grid in '{}'",
                    expected_dir.display()
                ))),
                (_, None) => Err(TeaError::MissingInput(format!(
                    "iteration {iteration} has no actual grid in '{}'",
                    actual_dir.display()
                ))),
            };
            (iteration, outcome)
        },
    );

    let (done, failures) = settle(outcomes, config.failure_policy)?;
    let mut report = CompareReport {
        failures,
        ..CompareReport::default()
    };
    for (_, (summary, path)) in done {
        report.series.push(summary);
        report.written.push(path);
    }
    tracing::info!(
        compared = report.series.len(),
        failed = report.failures.len(),
        "comparison finished"
    );
    Ok(report)
}

fn compare_one(
    codec: &dyn GridCodec,
    iteration: usize,
    expected_path: &Path,
    actual_path: &Path,
    output_dir: &Path,
    config: &PostprocessConfig,
) -> TeaResult<(ErrorSummary, PathBuf)> {
    let (reference, actual) = rayon::join(
        || load_grid(codec, iteration, expected_path),
        || load_grid(codec, iteration, actual_path),
    );
    let reference = reference?;
    let difference = compute_difference(&reference, &actual?)?;
    let summary = ErrorSummary::new(&reference, &difference)?;
    let path = output_dir.join(output_filename(
        &config.output_prefix,
        iteration,
        config.iteration_padding,
        &config.extension,
    ));
    codec.write(&difference.grid, &path, config.encoding)?;
    tracing::debug!(
        iteration,
        max_abs_temperature = summary.temperature.max_abs,
        "difference written"
    );
    Ok((summary, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filename::chunk_filename;
    use ndarray::Array1;
    use tealeaf_types::codec::Encoding;
    use tealeaf_types::config::BoundaryPolicy;
    use tealeaf_types::constants::DEFAULT_ERROR_PREFIX;
    use tealeaf_types::state::{CellFields, ChunkKey};
    use tealeaf_vtk::LegacyVtkCodec;

    fn grid(iteration: usize, x: Vec<f64>, y: Vec<f64>, density: Vec<f64>) -> GlobalGrid {
        let temperature = density.iter().map(|d| d * 10.0).collect();
        GlobalGrid {
            iteration,
            x_coords: Array1::from_vec(x),
            y_coords: Array1::from_vec(y),
            z_coords: GlobalGrid::single_plane(),
            fields: CellFields::from_vecs(density.clone(), density, temperature),
        }
    }

    /// Two 2x2 chunks side by side, split at x = 2.
    fn write_pair(dir: &Path, iteration: usize, offset: f64) {
        let y = vec![0.0, 1.0, 2.0];
        let left = grid(iteration, vec![0.0, 1.0, 2.0], y.clone(), vec![1.0, 2.0, 3.0, 4.0]);
        let right = grid(iteration, vec![2.0, 3.0, 4.0], y, vec![5.0, 6.0, 7.0, 8.0]);
        for (key, mut chunk) in [(ChunkKey::new(0, 0), left), (ChunkKey::new(1, 0), right)] {
            chunk.fields.density.mapv_inplace(|v| v + offset);
            let name = chunk_filename("tea", key, iteration, 5, "vtk");
            LegacyVtkCodec
                .write(&chunk, &dir.join(name), Encoding::Ascii)
                .unwrap();
        }
    }

    fn read_back(path: &Path, iteration: usize) -> GlobalGrid {
        grid_from_raw(iteration, LegacyVtkCodec.read(path).unwrap()).unwrap()
    }

    #[test]
    fn test_discover_inputs_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.vtk", "a.vtk", "tea.visit", "c.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.vtk")).unwrap();
        let files = discover_inputs(dir.path(), "vtk").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.vtk", "b.vtk"]);
    }

    #[test]
    fn test_discover_inputs_missing_or_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover_inputs(dir.path(), "vtk"),
            Err(TeaError::MissingInput(_))
        ));
        assert!(matches!(
            discover_inputs(&dir.path().join("absent"), "vtk"),
            Err(TeaError::MissingInput(_))
        ));
    }

    #[test]
    fn test_merge_directory_writes_row_major_grid() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_pair(input.path(), 0, 0.0);
        write_pair(input.path(), 10, 100.0);

        let config = PostprocessConfig::default();
        let report =
            merge_directory(&LegacyVtkCodec, input.path(), output.path(), None, &config).unwrap();
        assert_eq!(report.written.len(), 2);
        assert!(report.failures.is_empty());
        assert!(report.recovery.is_clean());

        let merged = read_back(&output.path().join("tea.00010.vtk"), 10);
        assert_eq!(merged.x_coords.to_vec(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(merged.y_coords.to_vec(), vec![0.0, 1.0, 2.0]);
        assert_eq!(
            merged.fields.density.to_vec(),
            vec![101.0, 102.0, 105.0, 106.0, 103.0, 104.0, 107.0, 108.0]
        );
        assert_eq!(merged.fields.temperature[2], 50.0);
    }

    #[test]
    fn test_merge_directory_carries_missing_chunk_forward() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_pair(input.path(), 0, 0.0);
        write_pair(input.path(), 5, 50.0);
        std::fs::remove_file(input.path().join(chunk_filename(
            "tea",
            ChunkKey::new(1, 0),
            5,
            5,
            "vtk",
        )))
        .unwrap();

        let layout = ChunkLayout::new(2, 1).unwrap();
        let report = merge_directory(
            &LegacyVtkCodec,
            input.path(),
            output.path(),
            Some(&layout),
            &PostprocessConfig::default(),
        )
        .unwrap();
        assert_eq!(report.recovery.reused.len(), 1);
        let inputs = discover_inputs(input.path(), "vtk").unwrap();
        let decoded = decode_filenames(&inputs, NamingScheme::Chunked, Default::default()).unwrap();
        let (recovered, _) = recover_missing_chunks(decoded, Some(&layout)).unwrap();
        assert_eq!(recovered.manifest().carried_forward_count(), 1);
        let merged = read_back(&output.path().join("tea.00005.vtk"), 5);
        // Left half from iteration 5, right half reused from iteration 0.
        assert_eq!(
            merged.fields.density.to_vec(),
            vec![51.0, 52.0, 5.0, 6.0, 53.0, 54.0, 7.0, 8.0]
        );
    }

    #[test]
    fn test_merge_directory_first_iteration_gap_is_fatal() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_pair(input.path(), 0, 0.0);
        let layout = ChunkLayout::new(2, 2).unwrap();
        let err = merge_directory(
            &LegacyVtkCodec,
            input.path(),
            output.path(),
            Some(&layout),
            &PostprocessConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TeaError::NoPriorChunkAvailable { iteration: 0, .. }));
    }

    #[test]
    fn test_failure_policy() {
        let input = tempfile::tempdir().unwrap();
        write_pair(input.path(), 0, 0.0);
        write_pair(input.path(), 3, 0.0);
        write_pair(input.path(), 7, 0.0);
        let broken = input.path().join(chunk_filename("tea", ChunkKey::new(0, 0), 3, 5, "vtk"));
        std::fs::write(&broken, "not a grid").unwrap();

        let output = tempfile::tempdir().unwrap();
        let abort = PostprocessConfig::default();
        let err = merge_directory(&LegacyVtkCodec, input.path(), output.path(), None, &abort)
            .unwrap_err();
        assert!(matches!(err, TeaError::Codec { ref path, .. } if *path == broken));

        let output = tempfile::tempdir().unwrap();
        let proceed = PostprocessConfig {
            failure_policy: FailurePolicy::Continue,
            remove_inputs: true,
            ..PostprocessConfig::default()
        };
        let report =
            merge_directory(&LegacyVtkCodec, input.path(), output.path(), None, &proceed).unwrap();
        assert_eq!(report.written.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].iteration, 3);
        assert!(!output.path().join("tea.00003.vtk").exists());
        // Inputs are kept when anything failed.
        assert_eq!(report.removed_inputs, 0);
        assert!(broken.exists());
    }

    #[test]
    fn test_abort_stops_later_iterations() {
        let input = tempfile::tempdir().unwrap();
        for iteration in [0, 3, 7, 9] {
            write_pair(input.path(), iteration, 0.0);
        }
        let broken = input.path().join(chunk_filename("tea", ChunkKey::new(1, 0), 3, 5, "vtk"));
        std::fs::write(&broken, "not a grid").unwrap();

        let output = tempfile::tempdir().unwrap();
        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let err = pool
            .install(|| {
                merge_directory(
                    &LegacyVtkCodec,
                    input.path(),
                    output.path(),
                    None,
                    &PostprocessConfig::default(),
                )
            })
            .unwrap_err();
        assert!(matches!(err, TeaError::Codec { ref path, .. } if *path == broken));
        assert!(output.path().join("tea.00000.vtk").exists());
        assert!(!output.path().join("tea.00007.vtk").exists());
        assert!(!output.path().join("tea.00009.vtk").exists());
    }

    #[test]
    fn test_merge_remove_inputs_and_binary_output() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_pair(input.path(), 2, 0.0);
        let config = PostprocessConfig {
            output_prefix: "merged".into(),
            encoding: Encoding::Binary,
            boundary_policy: BoundaryPolicy::Exact,
            remove_inputs: true,
            ..PostprocessConfig::default()
        };
        let report =
            merge_directory(&LegacyVtkCodec, input.path(), output.path(), None, &config).unwrap();
        assert_eq!(report.removed_inputs, 2);
        assert_eq!(std::fs::read_dir(input.path()).unwrap().count(), 0);
        let merged = read_back(&output.path().join("merged.00002.vtk"), 2);
        assert_eq!(merged.cell_count(), 8);
    }

    #[test]
    fn test_compare_directories() {
        let expected = tempfile::tempdir().unwrap();
        let actual = tempfile::tempdir().unwrap();
        let x = vec![0.0, 1.0, 2.0];
        let y = vec![0.0, 1.0];
        for (it, shift) in [(1usize, 0.5), (2, 0.0)] {
            let e = grid(it, x.clone(), y.clone(), vec![2.0, 4.0]);
            let a = grid(it, x.clone(), y.clone(), vec![2.0 + shift, 4.0]);
            let name = output_filename("tea", it, 5, "vtk");
            LegacyVtkCodec
                .write(&e, &expected.path().join(&name), Encoding::Ascii)
                .unwrap();
            LegacyVtkCodec
                .write(&a, &actual.path().join(&name), Encoding::Ascii)
                .unwrap();
        }
        let out = actual.path().join("error");
        let config = PostprocessConfig {
            output_prefix: DEFAULT_ERROR_PREFIX.into(),
            ..PostprocessConfig::default()
        };
        let report =
            compare_directories(&LegacyVtkCodec, expected.path(), actual.path(), &out, &config)
                .unwrap();
        assert_eq!(report.series.iterations(), vec![1, 2]);
        let first = report.series.iter().next().unwrap();
        assert_eq!(first.density.max_abs, 0.5);
        assert_eq!(first.density.max_relative, Some(0.25));

        let diff = read_back(&out.join("tea-error.00001.vtk"), 1);
        assert_eq!(diff.fields.density.to_vec(), vec![0.5, 0.0]);
        assert_eq!(diff.fields.temperature.to_vec(), vec![5.0, 0.0]);
    }

    #[test]
    fn test_compare_reports_unpaired_iteration() {
        let expected = tempfile::tempdir().unwrap();
        let actual = tempfile::tempdir().unwrap();
        let g = grid(4, vec![0.0, 1.0], vec![0.0, 1.0], vec![1.0]);
        for dir in [expected.path(), actual.path()] {
            LegacyVtkCodec
                .write(&g, &dir.join("tea.00004.vtk"), Encoding::Ascii)
                .unwrap();
        }
        let lone = grid(9, vec![0.0, 1.0], vec![0.0, 1.0], vec![1.0]);
        LegacyVtkCodec
            .write(&lone, &expected.path().join("tea.00009.vtk"), Encoding::Ascii)
            .unwrap();

        let out = tempfile::tempdir().unwrap();
        let err = compare_directories(
            &LegacyVtkCodec,
            expected.path(),
            actual.path(),
            out.path(),
            &PostprocessConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TeaError::MissingInput(_)));

        let config = PostprocessConfig {
            failure_policy: FailurePolicy::Continue,
            ..PostprocessConfig::default()
        };
        let report =
            compare_directories(&LegacyVtkCodec, expected.path(), actual.path(), out.path(), &config)
                .unwrap();
        assert_eq!(report.series.iterations(), vec![4]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].iteration, 9);
    }
}
