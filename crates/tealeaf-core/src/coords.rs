// ─────────────────────────────────────────────────────────────────────
// TeaLeaf Post — Coordinate Merger
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Global axis coordinates from per-chunk coordinate sets.
//!
//! Neighbouring chunks share their facing boundary vertex. The union of all
//! coordinate values, deduplicated by exact equality and sorted, gives the
//! global axis. No tolerance is applied: coordinates that differ in the
//! last bit stay distinct. [`BoundaryPolicy::Strict`] turns that silent
//! wrong shape into an error.

use std::collections::BTreeMap;

use ndarray::Array1;
use tealeaf_types::config::BoundaryPolicy;
use tealeaf_types::error::{TeaError, TeaResult};
use tealeaf_types::state::{ChunkData, ChunkKey, GlobalGrid};

/// Merged vertex coordinates of one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedCoordinates {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    /// Always `[0.0]`.
    pub z: Array1<f64>,
}

/// Sorted union of `values` under exact equality.
pub fn merge_axis(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut merged: Vec<f64> = values.into_iter().collect();
    merged.sort_by(f64::total_cmp);
    merged.dedup_by(|a, b| *a == *b);
    merged
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

impl Axis {
    fn label(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
        }
    }

    fn index(self, key: ChunkKey) -> usize {
        match self {
            Axis::X => key.x,
            Axis::Y => key.y,
        }
    }

    fn cells(self, chunk: &ChunkData) -> usize {
        match self {
            Axis::X => chunk.cell_width(),
            Axis::Y => chunk.cell_height(),
        }
    }
}

/// Vertex count the axis must have if every chunk boundary coincides:
/// one plus the cells of each distinct chunk column (row).
fn expected_vertices(iteration: usize, chunks: &[ChunkData], axis: Axis) -> TeaResult<usize> {
    let mut cells_per_index: BTreeMap<usize, (usize, ChunkKey)> = BTreeMap::new();
    for chunk in chunks {
        let cells = axis.cells(chunk);
        match cells_per_index.get(&axis.index(chunk.key)) {
            Some(&(seen, first)) if seen != cells => {
                return Err(TeaError::InconsistentChunkGeometry {
                    iteration,
                    keys: vec![first, chunk.key],
                    message: format!(
                        "chunks sharing {} index {} span {seen} and {cells} cells",
                        axis.label(),
                        axis.index(chunk.key)
                    ),
                });
            }
            Some(_) => {}
            None => {
                cells_per_index.insert(axis.index(chunk.key), (cells, chunk.key));
            }
        }
    }
    Ok(1 + cells_per_index.values().map(|&(cells, _)| cells).sum::<usize>())
}

/// Computes global x/y coordinates for the chunks of one iteration.
pub fn merge_coordinates(
    iteration: usize,
    chunks: &[ChunkData],
    policy: BoundaryPolicy,
) -> TeaResult<MergedCoordinates> {
    if chunks.is_empty() {
        return Err(TeaError::MissingInput(format!(
            "iteration {iteration} has no chunks to merge"
        )));
    }
    let x = merge_axis(chunks.iter().flat_map(|c| c.x_coords.iter().copied()));
    let y = merge_axis(chunks.iter().flat_map(|c| c.y_coords.iter().copied()));

    if policy == BoundaryPolicy::Strict {
        for (axis, merged) in [(Axis::X, &x), (Axis::Y, &y)] {
            let expected = expected_vertices(iteration, chunks, axis)?;
            if merged.len() != expected {
                return Err(TeaError::InconsistentChunkGeometry {
                    iteration,
                    keys: chunks.iter().map(|c| c.key).collect(),
                    message: format!(
                        "merged {} axis has {} vertices, shared boundaries imply {expected}",
                        axis.label(),
                        merged.len()
                    ),
                });
            }
        }
    }

    Ok(MergedCoordinates {
        x: Array1::from_vec(x),
        y: Array1::from_vec(y),
        z: GlobalGrid::single_plane(),
    })
}
