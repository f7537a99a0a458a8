//! Legacy VTK rectilinear grids to [`RawGrid`].

use tealeaf_types::state::{NamedArray, RawGrid};
use vtkio::model::{Attribute, DataSet, ElementType, Extent, Piece};
use vtkio::{IOBuffer, Vtk};

/// Scalar type names that may close a `FIELD` array header.
const SCALAR_TYPES: [&str; 10] = [
    "bit",
    "unsigned_char",
    "char",
    "unsigned_short",
    "short",
    "unsigned_int",
    "int",
    "unsigned_long",
    "long",
    "double",
];

/// Rejects header counts no file of this size can satisfy. Every value
/// takes at least one byte, ASCII or binary.
fn check_declared_counts(data: &[u8]) -> Result<(), String> {
    for line in data.split(|&b| b == b'\n') {
        let Ok(line) = std::str::from_utf8(line) else {
            continue;
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = tokens.first() else {
            continue;
        };
        let keyword = first.to_ascii_uppercase();
        let counts: &[&str] = match keyword.as_str() {
            "X_COORDINATES" | "Y_COORDINATES" | "Z_COORDINATES" | "CELL_DATA" => {
                &tokens[1..tokens.len().min(2)]
            }
            _ if tokens.len() == 4
                && (tokens[3] == "float" || SCALAR_TYPES.contains(&tokens[3])) =>
            {
                &tokens[1..3]
            }
            _ => continue,
        };
        let mut total: usize = 1;
        for tok in counts {
            let n: usize = tok
                .parse()
                .map_err(|_| format!("{first}: count '{tok}' is not a non-negative integer"))?;
            total = total
                .checked_mul(n)
                .ok_or_else(|| format!("{first}: block size overflows"))?;
        }
        if total > data.len() {
            return Err(format!(
                "{first}: declares {total} values, file holds {} bytes",
                data.len()
            ));
        }
    }
    Ok(())
}

fn buffer_values(buffer: IOBuffer, what: &str) -> Result<Vec<f64>, String> {
    Ok(match buffer {
        IOBuffer::F64(v) => v,
        IOBuffer::F32(v) => v.into_iter().map(f64::from).collect(),
        IOBuffer::I32(v) => v.into_iter().map(f64::from).collect(),
        IOBuffer::U32(v) => v.into_iter().map(f64::from).collect(),
        IOBuffer::I16(v) => v.into_iter().map(f64::from).collect(),
        IOBuffer::U16(v) => v.into_iter().map(f64::from).collect(),
        IOBuffer::I8(v) => v.into_iter().map(f64::from).collect(),
        IOBuffer::U8(v) => v.into_iter().map(f64::from).collect(),
        IOBuffer::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        IOBuffer::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        _ => return Err(format!("{what}: unsupported element type")),
    })
}

fn push_cell_array(
    grid: &mut RawGrid,
    cells: usize,
    name: String,
    components: usize,
    values: Vec<f64>,
) -> Result<(), String> {
    let expected = cells.saturating_mul(components);
    if values.len() != expected {
        return Err(format!(
            "cell array '{name}' holds {} values, the grid has {cells} cells",
            values.len()
        ));
    }
    grid.cell_arrays.push(NamedArray { name, values });
    Ok(())
}

/// Maps a parsed `RECTILINEAR_GRID` model onto coordinates plus cell
/// arrays in file order. Point data is dropped.
pub fn raw_from_model(vtk: Vtk) -> Result<RawGrid, String> {
    let pieces = match vtk.data {
        DataSet::RectilinearGrid { pieces, .. } => pieces,
        _ => return Err("unsupported dataset, expected RECTILINEAR_GRID".into()),
    };
    if pieces.len() != 1 {
        return Err(format!("expected one grid piece, found {}", pieces.len()));
    }
    let piece = match pieces.into_iter().next() {
        Some(Piece::Inline(piece)) => *piece,
        _ => return Err("grid piece is not stored inline".into()),
    };

    let mut grid = RawGrid {
        x_coords: buffer_values(piece.coords.x, "X_COORDINATES")?,
        y_coords: buffer_values(piece.coords.y, "Y_COORDINATES")?,
        z_coords: buffer_values(piece.coords.z, "Z_COORDINATES")?,
        cell_arrays: Vec::new(),
    };
    let found = [grid.x_coords.len(), grid.y_coords.len(), grid.z_coords.len()];
    if let Extent::Dims(dims) = piece.extent {
        let declared = dims.map(|d| d as usize);
        if declared != found {
            return Err(format!(
                "DIMENSIONS {declared:?} disagree with coordinate counts {found:?}"
            ));
        }
    }
    let cells: usize = found.iter().map(|n| n.saturating_sub(1).max(1)).product();

    for attribute in piece.data.cell {
        match attribute {
            Attribute::DataArray(array) => {
                let components = match array.elem {
                    ElementType::Scalars { num_comp, .. } => num_comp as usize,
                    _ => 1,
                };
                let values = buffer_values(array.data, &array.name)?;
                push_cell_array(&mut grid, cells, array.name, components, values)?;
            }
            Attribute::Field { data_array, .. } => {
                for array in data_array {
                    let values = buffer_values(array.data, &array.name)?;
                    push_cell_array(&mut grid, cells, array.name, array.elem as usize, values)?;
                }
            }
        }
    }
    Ok(grid)
}

/// Parses a legacy VTK rectilinear grid held in memory, ASCII or
/// big-endian binary.
pub fn parse_rectilinear(data: &[u8]) -> Result<RawGrid, String> {
    check_declared_counts(data)?;
    let vtk = Vtk::parse_legacy_be(data).map_err(|e| e.to_string())?;
    raw_from_model(vtk)
}
