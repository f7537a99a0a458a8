// ─────────────────────────────────────────────────────────────────────
// TeaLeaf Post — Legacy VTK Codec
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Legacy VTK `RECTILINEAR_GRID` reader and writer.
//!
//! Chunk dumps are written by every solver rank with one cell array per
//! field inside a `FIELD` block; merged and difference grids are written
//! back in the same layout, in ASCII or big-endian binary.

pub mod reader;
pub mod writer;

use std::path::Path;

use tealeaf_types::codec::{Encoding, GridCodec};
use tealeaf_types::error::{TeaError, TeaResult};
use tealeaf_types::state::{GlobalGrid, RawGrid};

pub use reader::{parse_rectilinear, raw_from_model};
pub use writer::{grid_model, render_rectilinear};

/// File-backed codec for the legacy VTK format.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyVtkCodec;

impl GridCodec for LegacyVtkCodec {
    fn read(&self, source: &Path) -> TeaResult<RawGrid> {
        tracing::debug!(path = %source.display(), "reading grid file");
        let bytes = std::fs::read(source).map_err(|e| TeaError::codec(source, e.to_string()))?;
        parse_rectilinear(&bytes).map_err(|message| TeaError::codec(source, message))
    }

    /// The file appears under its final name only once fully written.
    fn write(&self, grid: &GlobalGrid, destination: &Path, encoding: Encoding) -> TeaResult<()> {
        let bytes =
            render_rectilinear(grid, encoding).map_err(|m| TeaError::codec(destination, m))?;
        let mut partial = destination.as_os_str().to_owned();
        partial.push(".partial");
        let partial = Path::new(&partial);
        std::fs::write(partial, &bytes).map_err(|e| TeaError::codec(destination, e.to_string()))?;
        std::fs::rename(partial, destination)
            .map_err(|e| TeaError::codec(destination, e.to_string()))?;
        tracing::debug!(
            path = %destination.display(),
            iteration = grid.iteration,
            bytes = bytes.len(),
            "grid file written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use tealeaf_types::state::{CellFields, ChunkData, ChunkKey};

    fn sample_grid() -> GlobalGrid {
        GlobalGrid {
            iteration: 12,
            x_coords: Array1::from_vec(vec![0.0, 0.5, 1.25]),
            y_coords: Array1::from_vec(vec![-1.0, 0.0, 1.0 / 3.0]),
            z_coords: GlobalGrid::single_plane(),
            fields: CellFields::from_vecs(
                vec![1.0, 2.0, 3.0, 4.0],
                vec![1e-12, -2.5, 3.0e8, 0.1],
                vec![300.0, 301.5, f64::MIN_POSITIVE, 7.0],
            ),
        }
    }

    #[test]
    fn test_codec_roundtrip_both_encodings() {
        let dir = tempfile::tempdir().unwrap();
        let grid = sample_grid();
        for (encoding, name) in [(Encoding::Ascii, "a.vtk"), (Encoding::Binary, "b.vtk")] {
            let path = dir.path().join(name);
            LegacyVtkCodec.write(&grid, &path, encoding).unwrap();
            assert!(!dir.path().join(format!("{name}.partial")).exists());
            let raw = LegacyVtkCodec.read(&path).unwrap();
            let chunk = ChunkData::from_raw(ChunkKey::new(0, 0), 12, raw).unwrap();
            assert_eq!(chunk.x_coords, grid.x_coords);
            assert_eq!(chunk.y_coords, grid.y_coords);
            assert_eq!(chunk.fields, grid.fields);
        }
    }

    #[test]
    fn test_codec_read_missing_file_is_codec_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LegacyVtkCodec.read(&dir.path().join("absent.vtk")).unwrap_err();
        assert!(matches!(err, TeaError::Codec { .. }));
    }
}
