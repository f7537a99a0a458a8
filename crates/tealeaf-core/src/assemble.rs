// ─────────────────────────────────────────────────────────────────────
// TeaLeaf Post — Grid Assembler
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Packaging of merged coordinates and fields into a [`GlobalGrid`].

use ndarray::Array1;
use tealeaf_types::config::BoundaryPolicy;
use tealeaf_types::error::{TeaError, TeaResult};
use tealeaf_types::state::{CellFields, ChunkData, ChunkKey, GlobalGrid, RawGrid};

use crate::cells::merge_cell_data;
use crate::coords::{merge_coordinates, MergedCoordinates};

/// Builds a grid, requiring every field to hold `(Nx-1)*(Ny-1)` cells.
pub fn assemble_grid(
    iteration: usize,
    coords: MergedCoordinates,
    fields: CellFields,
) -> TeaResult<GlobalGrid> {
    let expected = coords.x.len().saturating_sub(1) * coords.y.len().saturating_sub(1);
    for (name, values) in fields.iter() {
        if values.len() != expected {
            return Err(TeaError::ShapeMismatch {
                iteration,
                field: name.to_string(),
                expected,
                actual: values.len(),
            });
        }
    }
    Ok(GlobalGrid {
        iteration,
        x_coords: coords.x,
        y_coords: coords.y,
        z_coords: coords.z,
        fields,
    })
}

/// Merges the loaded chunks of one iteration into a global grid.
///
/// Coordinate and cell merging are independent and run side by side.
pub fn merge_iteration(
    iteration: usize,
    chunks: &[ChunkData],
    policy: BoundaryPolicy,
) -> TeaResult<GlobalGrid> {
    let (coords, fields) = rayon::join(
        || merge_coordinates(iteration, chunks, policy),
        || merge_cell_data(iteration, chunks),
    );
    assemble_grid(iteration, coords?, fields?)
}

/// Grid stored whole in one file (comparison mode). Coordinates are kept
/// as read; the z axis is normalised to the single plane.
pub fn grid_from_raw(iteration: usize, raw: RawGrid) -> TeaResult<GlobalGrid> {
    let chunk = ChunkData::from_raw(ChunkKey::new(0, 0), iteration, raw)?;
    assemble_grid(
        iteration,
        MergedCoordinates {
            x: chunk.x_coords,
            y: chunk.y_coords,
            z: GlobalGrid::single_plane(),
        },
        chunk.fields,
    )
}

/// Coordinates from plain vectors, for callers that build grids directly.
pub fn coordinates(x: Vec<f64>, y: Vec<f64>) -> MergedCoordinates {
    MergedCoordinates {
        x: Array1::from_vec(x),
        y: Array1::from_vec(y),
        z: GlobalGrid::single_plane(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_accepts_matching_shape() {
        let grid = assemble_grid(
            2,
            coordinates(vec![0.0, 1.0, 2.0], vec![0.0, 1.0]),
            CellFields::uniform(2, 0.5),
        )
        .unwrap();
        assert_eq!(grid.iteration, 2);
        assert_eq!(grid.cell_count(), 2);
        assert_eq!(grid.z_coords.to_vec(), vec![0.0]);
    }

    #[test]
    fn test_assemble_rejects_short_and_long_fields() {
        for n in [1usize, 3] {
            let err = assemble_grid(
                6,
                coordinates(vec![0.0, 1.0, 2.0], vec![0.0, 1.0]),
                CellFields::uniform(n, 0.5),
            )
            .unwrap_err();
            match err {
                TeaError::ShapeMismatch {
                    iteration,
                    field,
                    expected,
                    actual,
                } => {
                    assert_eq!(iteration, 6);
                    assert_eq!(field, "density");
                    assert_eq!(expected, 2);
                    assert_eq!(actual, n);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_assemble_reports_offending_field() {
        let mut fields = CellFields::uniform(2, 0.0);
        fields.temperature = Array1::zeros(5);
        let err = assemble_grid(0, coordinates(vec![0.0, 1.0, 2.0], vec![0.0, 1.0]), fields)
            .unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_merge_iteration_two_chunks() {
        let left = ChunkData::new(
            ChunkKey::new(0, 0),
            1,
            Array1::from_vec(vec![0.0, 1.0, 2.0]),
            Array1::from_vec(vec![0.0, 1.0, 2.0]),
            CellFields::from_vecs(vec![1.0, 2.0, 3.0, 4.0], vec![0.0; 4], vec![0.0; 4]),
        )
        .unwrap();
        let right = ChunkData::new(
            ChunkKey::new(1, 0),
            1,
            Array1::from_vec(vec![2.0, 3.0, 4.0]),
            Array1::from_vec(vec![0.0, 1.0, 2.0]),
            CellFields::from_vecs(vec![5.0, 6.0, 7.0, 8.0], vec![0.0; 4], vec![0.0; 4]),
        )
        .unwrap();
        let grid = merge_iteration(1, &[right, left], BoundaryPolicy::Strict).unwrap();
        assert_eq!(grid.x_coords.to_vec(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            grid.fields.density.to_vec(),
            vec![1.0, 2.0, 5.0, 6.0, 3.0, 4.0, 7.0, 8.0]
        );
    }
}
