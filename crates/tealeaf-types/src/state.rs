// ─────────────────────────────────────────────────────────────────────
// TeaLeaf Post — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Chunk payloads and assembled grids.
//!
//! Cell-centred fields are stored flat in row-major order: the row (Y)
//! index varies slower than the column (X) index, so cell `(row, col)`
//! of a grid `width` cells wide lives at `row * width + col`.

use std::fmt;

use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::constants::{FIELD_NAMES, Z_PLANE};
use crate::error::{TeaError, TeaResult};

/// Position of a chunk in the 2-D domain decomposition.
///
/// Ordering is lexicographic on `(x, y)`, which is the deterministic merge
/// order of chunks inside one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkKey {
    pub x: usize,
    pub y: usize,
}

impl ChunkKey {
    pub fn new(x: usize, y: usize) -> Self {
        ChunkKey { x, y }
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The three named cell fields, index-addressed on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Density,
    Energy,
    Temperature,
}

impl FieldName {
    pub const ALL: [FieldName; 3] = [FieldName::Density, FieldName::Energy, FieldName::Temperature];

    pub fn as_str(self) -> &'static str {
        FIELD_NAMES[self.index()]
    }

    /// Position of the field among the cell arrays of a grid file.
    pub fn index(self) -> usize {
        match self {
            FieldName::Density => 0,
            FieldName::Energy => 1,
            FieldName::Temperature => 2,
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Density, energy and temperature for every cell of a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CellFields {
    pub density: Array1<f64>,
    pub energy: Array1<f64>,
    pub temperature: Array1<f64>,
}

impl CellFields {
    pub fn from_vecs(density: Vec<f64>, energy: Vec<f64>, temperature: Vec<f64>) -> Self {
        CellFields {
            density: Array1::from_vec(density),
            energy: Array1::from_vec(energy),
            temperature: Array1::from_vec(temperature),
        }
    }

    /// All three fields filled with `value`.
    pub fn uniform(n_cells: usize, value: f64) -> Self {
        CellFields {
            density: Array1::from_elem(n_cells, value),
            energy: Array1::from_elem(n_cells, value),
            temperature: Array1::from_elem(n_cells, value),
        }
    }

    pub fn get(&self, name: FieldName) -> &Array1<f64> {
        match name {
            FieldName::Density => &self.density,
            FieldName::Energy => &self.energy,
            FieldName::Temperature => &self.temperature,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &Array1<f64>)> {
        FieldName::ALL.into_iter().map(move |name| (name, self.get(name)))
    }

    /// Builds new fields by combining same-named fields of `self` and `other`.
    /// Callers are responsible for matching lengths.
    pub fn zip_map(&self, other: &CellFields, f: impl Fn(f64, f64) -> f64) -> CellFields {
        let combine = |a: &Array1<f64>, b: &Array1<f64>| -> Array1<f64> {
            a.iter().zip(b.iter()).map(|(&av, &bv)| f(av, bv)).collect()
        };
        CellFields {
            density: combine(&self.density, &other.density),
            energy: combine(&self.energy, &other.energy),
            temperature: combine(&self.temperature, &other.temperature),
        }
    }
}

/// One named cell array as stored in a grid file.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArray {
    pub name: String,
    pub values: Vec<f64>,
}

/// Codec-level content of a rectilinear grid file: coordinates plus the
/// cell arrays in file order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawGrid {
    pub x_coords: Vec<f64>,
    pub y_coords: Vec<f64>,
    pub z_coords: Vec<f64>,
    pub cell_arrays: Vec<NamedArray>,
}

/// Loaded payload of one chunk for one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkData {
    pub key: ChunkKey,
    pub iteration: usize,
    pub x_coords: Array1<f64>,
    pub y_coords: Array1<f64>,
    pub fields: CellFields,
}

impl ChunkData {
    /// Validates coordinates and field lengths of a chunk.
    pub fn new(
        key: ChunkKey,
        iteration: usize,
        x_coords: Array1<f64>,
        y_coords: Array1<f64>,
        fields: CellFields,
    ) -> TeaResult<Self> {
        for (axis, coords) in [("x", &x_coords), ("y", &y_coords)] {
            if coords.len() < 2 {
                return Err(TeaError::InconsistentChunkGeometry {
                    iteration,
                    keys: vec![key],
                    message: format!(
                        "{axis} axis has {} coordinates, at least 2 are required",
                        coords.len()
                    ),
                });
            }
            if !is_strictly_increasing(&coords.to_vec()) {
                return Err(TeaError::InconsistentChunkGeometry {
                    iteration,
                    keys: vec![key],
                    message: format!("{axis} coordinates are not finite and strictly increasing"),
                });
            }
        }
        let expected = (x_coords.len() - 1) * (y_coords.len() - 1);
        for (name, values) in fields.iter() {
            if values.len() != expected {
                return Err(TeaError::ShapeMismatch {
                    iteration,
                    field: format!("{name} of chunk {key}"),
                    expected,
                    actual: values.len(),
                });
            }
        }
        Ok(ChunkData {
            key,
            iteration,
            x_coords,
            y_coords,
            fields,
        })
    }

    /// Maps the first three cell arrays of a grid file, by index, onto
    /// density, energy and temperature.
    pub fn from_raw(key: ChunkKey, iteration: usize, raw: RawGrid) -> TeaResult<Self> {
        let RawGrid {
            x_coords,
            y_coords,
            cell_arrays,
            ..
        } = raw;
        let fields = fields_from_arrays(cell_arrays).map_err(|found| {
            TeaError::InconsistentChunkGeometry {
                iteration,
                keys: vec![key],
                message: format!("expected 3 cell arrays, found {found}"),
            }
        })?;
        ChunkData::new(
            key,
            iteration,
            Array1::from_vec(x_coords),
            Array1::from_vec(y_coords),
            fields,
        )
    }

    /// Cells along X.
    pub fn cell_width(&self) -> usize {
        self.x_coords.len().saturating_sub(1)
    }

    /// Cells along Y.
    pub fn cell_height(&self) -> usize {
        self.y_coords.len().saturating_sub(1)
    }
}

/// Takes the first three arrays as density, energy, temperature.
/// Returns the number of arrays found when fewer than three are present.
pub fn fields_from_arrays(arrays: Vec<NamedArray>) -> Result<CellFields, usize> {
    let found = arrays.len();
    let mut it = arrays.into_iter();
    match (it.next(), it.next(), it.next()) {
        (Some(d), Some(e), Some(t)) => Ok(CellFields::from_vecs(d.values, e.values, t.values)),
        _ => Err(found),
    }
}

/// Rectilinear grid covering the whole domain for one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalGrid {
    pub iteration: usize,
    pub x_coords: Array1<f64>,
    pub y_coords: Array1<f64>,
    /// Always the single plane `[0.0]`.
    pub z_coords: Array1<f64>,
    pub fields: CellFields,
}

impl GlobalGrid {
    /// Vertices along X.
    pub fn nx(&self) -> usize {
        self.x_coords.len()
    }

    /// Vertices along Y.
    pub fn ny(&self) -> usize {
        self.y_coords.len()
    }

    pub fn cell_count(&self) -> usize {
        self.nx().saturating_sub(1) * self.ny().saturating_sub(1)
    }

    /// Row-major `[ny-1, nx-1]` view of one field.
    pub fn field_matrix(&self, name: FieldName) -> Option<ArrayView2<'_, f64>> {
        let values = self.fields.get(name).as_slice()?;
        let shape = (self.ny().saturating_sub(1), self.nx().saturating_sub(1));
        ArrayView2::from_shape(shape, values).ok()
    }

    /// The fixed z-plane coordinates.
    pub fn single_plane() -> Array1<f64> {
        Array1::from_vec(vec![Z_PLANE])
    }
}

/// Elementwise `|a - b|` of two grids sharing identical coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferenceGrid {
    pub grid: GlobalGrid,
}

impl DifferenceGrid {
    pub fn iteration(&self) -> usize {
        self.grid.iteration
    }

    pub fn fields(&self) -> &CellFields {
        &self.grid.fields
    }
}

/// True when every value is finite and each is larger than its predecessor.
pub fn is_strictly_increasing(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite()) && values.windows(2).all(|w| w[0] < w[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_chunk(nx: usize, ny: usize) -> RawGrid {
        let cells = (nx - 1) * (ny - 1);
        RawGrid {
            x_coords: (0..nx).map(|i| i as f64).collect(),
            y_coords: (0..ny).map(|j| j as f64 * 0.5).collect(),
            z_coords: vec![0.0],
            cell_arrays: FIELD_NAMES
                .iter()
                .enumerate()
                .map(|(k, name)| NamedArray {
                    name: name.to_string(),
                    values: (0..cells).map(|c| (k * 100 + c) as f64).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_chunk_key_orders_by_x_then_y() {
        let mut keys = vec![
            ChunkKey::new(1, 0),
            ChunkKey::new(0, 1),
            ChunkKey::new(0, 0),
            ChunkKey::new(1, 1),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                ChunkKey::new(0, 0),
                ChunkKey::new(0, 1),
                ChunkKey::new(1, 0),
                ChunkKey::new(1, 1),
            ]
        );
        assert_eq!(ChunkKey::new(3, 7).to_string(), "(3, 7)");
    }

    #[test]
    fn test_field_names_follow_file_order() {
        for (i, name) in FieldName::ALL.iter().enumerate() {
            assert_eq!(name.index(), i);
            assert_eq!(name.as_str(), FIELD_NAMES[i]);
        }
    }

    #[test]
    fn test_chunk_from_raw_maps_arrays_by_index() {
        let chunk = ChunkData::from_raw(ChunkKey::new(2, 1), 4, raw_chunk(4, 3)).unwrap();
        assert_eq!(chunk.cell_width(), 3);
        assert_eq!(chunk.cell_height(), 2);
        assert_eq!(chunk.fields.density[0], 0.0);
        assert_eq!(chunk.fields.energy[0], 100.0);
        assert_eq!(chunk.fields.temperature[5], 205.0);
    }

    #[test]
    fn test_chunk_from_raw_rejects_short_field() {
        let mut raw = raw_chunk(3, 3);
        raw.cell_arrays[1].values.pop();
        let err = ChunkData::from_raw(ChunkKey::new(0, 0), 9, raw).unwrap_err();
        match err {
            TeaError::ShapeMismatch {
                iteration,
                expected,
                actual,
                ..
            } => {
                assert_eq!(iteration, 9);
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_chunk_from_raw_rejects_non_monotone_coordinates() {
        let mut raw = raw_chunk(3, 3);
        raw.x_coords = vec![0.0, 2.0, 1.0];
        let err = ChunkData::from_raw(ChunkKey::new(1, 0), 0, raw).unwrap_err();
        assert!(matches!(err, TeaError::InconsistentChunkGeometry { .. }));
    }

    #[test]
    fn test_chunk_from_raw_requires_three_arrays() {
        let mut raw = raw_chunk(3, 3);
        raw.cell_arrays.truncate(2);
        let err = ChunkData::from_raw(ChunkKey::new(0, 0), 0, raw).unwrap_err();
        assert!(err.to_string().contains("found 2"));
    }

    #[test]
    fn test_field_matrix_is_row_major() {
        let grid = GlobalGrid {
            iteration: 0,
            x_coords: Array1::from_vec(vec![0.0, 1.0, 2.0, 3.0]),
            y_coords: Array1::from_vec(vec![0.0, 1.0, 2.0]),
            z_coords: GlobalGrid::single_plane(),
            fields: CellFields::from_vecs(
                vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
                vec![0.0; 6],
                vec![0.0; 6],
            ),
        };
        let m = grid.field_matrix(FieldName::Density).unwrap();
        assert_eq!(m.dim(), (2, 3));
        assert_eq!(m[[0, 2]], 3.0);
        assert_eq!(m[[1, 0]], 4.0);
        assert_eq!(grid.cell_count(), 6);
    }

    #[test]
    fn test_strictly_increasing() {
        assert!(is_strictly_increasing(&[0.0, 1.0, 5.0]));
        assert!(!is_strictly_increasing(&[0.0, 0.0]));
        assert!(!is_strictly_increasing(&[0.0, f64::NAN]));
        assert!(is_strictly_increasing(&[]));
    }
}
