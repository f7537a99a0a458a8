//! Serializer for assembled grids.

use tealeaf_types::codec::Encoding;
use tealeaf_types::state::GlobalGrid;
use vtkio::model::{
    Attribute, Attributes, ByteOrder, Coordinates, DataArrayBase, DataSet, Extent, Piece,
    RectilinearGridPiece,
};
use vtkio::{IOBuffer, Vtk};

/// Name of the `FIELD` block holding the cell arrays.
pub const FIELD_BLOCK_NAME: &str = "FieldData";

fn dimension(n: usize, axis: &str) -> Result<u32, String> {
    u32::try_from(n).map_err(|_| format!("{axis} axis has {n} vertices, too many for VTK"))
}

/// Builds the legacy VTK model of `grid`: one inline rectilinear piece with
/// a single `FIELD` block holding density, energy and temperature.
pub fn grid_model(grid: &GlobalGrid) -> Result<Vtk, String> {
    let extent = Extent::Dims([
        dimension(grid.x_coords.len(), "x")?,
        dimension(grid.y_coords.len(), "y")?,
        dimension(grid.z_coords.len(), "z")?,
    ]);

    let data_array = grid
        .fields
        .iter()
        .map(|(name, values)| DataArrayBase {
            name: name.as_str().to_string(),
            elem: 1,
            data: IOBuffer::new(values.to_vec()),
        })
        .collect();

    let piece = RectilinearGridPiece {
        extent: extent.clone(),
        coords: Coordinates {
            x: IOBuffer::new(grid.x_coords.to_vec()),
            y: IOBuffer::new(grid.y_coords.to_vec()),
            z: IOBuffer::new(grid.z_coords.to_vec()),
        },
        data: Attributes {
            point: Vec::new(),
            cell: vec![Attribute::Field {
                name: FIELD_BLOCK_NAME.to_string(),
                data_array,
            }],
        },
    };

    Ok(Vtk {
        version: (3, 0).into(),
        title: format!("tealeaf iteration {}", grid.iteration),
        byte_order: ByteOrder::BigEndian,
        data: DataSet::RectilinearGrid {
            extent,
            meta: None,
            pieces: vec![Piece::Inline(Box::new(piece))],
        },
        file_path: None,
    })
}

/// Renders `grid` as a legacy VTK file, ASCII or big-endian binary.
pub fn render_rectilinear(grid: &GlobalGrid, encoding: Encoding) -> Result<Vec<u8>, String> {
    let model = grid_model(grid)?;
    match encoding {
        Encoding::Ascii => {
            let mut text = String::new();
            model
                .write_legacy_ascii(&mut text)
                .map_err(|e| e.to_string())?;
            Ok(text.into_bytes())
        }
        Encoding::Binary => {
            let mut bytes = Vec::new();
            model.write_legacy(&mut bytes).map_err(|e| e.to_string())?;
            Ok(bytes)
        }
    }
}
