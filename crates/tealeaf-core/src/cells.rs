// ─────────────────────────────────────────────────────────────────────
// TeaLeaf Post — Cell Data Merger
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Reassembly of per-chunk cell arrays into global row-major order.
//!
//! For each chunk row (ascending `y`), for each local cell row, the chunks
//! of that row are visited left to right (ascending `x`) and their local
//! cell row is appended. A global row therefore spans the full merged width
//! before the next one starts.

use std::collections::BTreeMap;

use ndarray::s;
use tealeaf_types::error::{TeaError, TeaResult};
use tealeaf_types::state::{CellFields, ChunkData, ChunkKey};

/// Chunks of one chunk row, ordered by ascending `x`, with the shared height.
#[derive(Debug)]
pub struct ChunkRow<'a> {
    pub y_index: usize,
    pub height: usize,
    pub chunks: Vec<&'a ChunkData>,
}

impl ChunkRow<'_> {
    /// Sum of the chunk widths, in cells.
    pub fn width(&self) -> usize {
        self.chunks.iter().map(|c| c.cell_width()).sum()
    }

    fn keys(&self) -> Vec<ChunkKey> {
        self.chunks.iter().map(|c| c.key).collect()
    }
}

/// Groups chunks into rows and checks the decomposition contract before
/// anything is merged: equal heights inside a row, equal total width
/// across rows.
pub fn plan_chunk_rows(iteration: usize, chunks: &[ChunkData]) -> TeaResult<Vec<ChunkRow<'_>>> {
    let mut by_y: BTreeMap<usize, Vec<&ChunkData>> = BTreeMap::new();
    for chunk in chunks {
        by_y.entry(chunk.key.y).or_default().push(chunk);
    }

    let mut rows = Vec::with_capacity(by_y.len());
    for (y_index, mut members) in by_y {
        members.sort_by_key(|c| c.key.x);
        if let Some(pair) = members.windows(2).find(|w| w[0].key.x == w[1].key.x) {
            return Err(TeaError::InconsistentChunkGeometry {
                iteration,
                keys: vec![pair[0].key, pair[1].key],
                message: "two chunks occupy the same position".into(),
            });
        }
        let height = members[0].cell_height();
        if members.iter().any(|c| c.cell_height() != height) {
            return Err(TeaError::InconsistentChunkGeometry {
                iteration,
                keys: members.iter().map(|c| c.key).collect(),
                message: format!(
                    "chunk row {y_index} has unequal cell heights {:?}",
                    members.iter().map(|c| c.cell_height()).collect::<Vec<_>>()
                ),
            });
        }
        rows.push(ChunkRow {
            y_index,
            height,
            chunks: members,
        });
    }

    if let Some(first) = rows.first() {
        let width = first.width();
        if let Some(bad) = rows.iter().find(|r| r.width() != width) {
            let mut keys = first.keys();
            keys.extend(bad.keys());
            return Err(TeaError::InconsistentChunkGeometry {
                iteration,
                keys,
                message: format!(
                    "chunk row {} is {} cells wide, chunk row {} is {width}",
                    bad.y_index,
                    bad.width(),
                    first.y_index
                ),
            });
        }
    }
    Ok(rows)
}

/// Concatenates the chunks' fields into global row-major arrays.
pub fn merge_cell_data(iteration: usize, chunks: &[ChunkData]) -> TeaResult<CellFields> {
    let rows = plan_chunk_rows(iteration, chunks)?;
    let total: usize = rows.iter().map(|r| r.height * r.width()).sum();
    let mut density = Vec::with_capacity(total);
    let mut energy = Vec::with_capacity(total);
    let mut temperature = Vec::with_capacity(total);

    for row in &rows {
        for r in 0..row.height {
            for chunk in &row.chunks {
                let width = chunk.cell_width();
                let start = r * width;
                let local = start..start + width;
                density.extend(chunk.fields.density.slice(s![local.clone()]).iter());
                energy.extend(chunk.fields.energy.slice(s![local.clone()]).iter());
                temperature.extend(chunk.fields.temperature.slice(s![local]).iter());
            }
        }
    }

    tracing::debug!(iteration, rows = rows.len(), cells = total, "cell data merged");
    Ok(CellFields::from_vecs(density, energy, temperature))
}
