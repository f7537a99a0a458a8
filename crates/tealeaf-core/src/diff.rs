// ─────────────────────────────────────────────────────────────────────
// TeaLeaf Post — Error Computer
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Elementwise absolute difference of two grids of the same iteration.
//!
//! Both grids must carry bit-identical coordinates. Nothing is resampled.

use ndarray::Array1;
use tealeaf_types::error::{TeaError, TeaResult};
use tealeaf_types::state::{DifferenceGrid, GlobalGrid};

fn incompatible(iteration: usize, message: String) -> TeaError {
    TeaError::IncompatibleGrids { iteration, message }
}

fn check_axis(iteration: usize, axis: &str, a: &Array1<f64>, b: &Array1<f64>) -> TeaResult<()> {
    if a.len() != b.len() {
        return Err(incompatible(
            iteration,
            format!("{axis} axis has {} vs {} coordinates", a.len(), b.len()),
        ));
    }
    if let Some((i, (av, bv))) = a
        .iter()
        .zip(b.iter())
        .enumerate()
        .find(|(_, (av, bv))| av.to_bits() != bv.to_bits())
    {
        return Err(incompatible(
            iteration,
            format!("{axis} coordinate {i} differs: {av:e} vs {bv:e}"),
        ));
    }
    Ok(())
}

/// `|reference - actual|` for density, energy and temperature.
pub fn compute_difference(reference: &GlobalGrid, actual: &GlobalGrid) -> TeaResult<DifferenceGrid> {
    let iteration = reference.iteration;
    if actual.iteration != iteration {
        return Err(incompatible(
            iteration,
            format!("grids belong to iterations {iteration} and {}", actual.iteration),
        ));
    }
    check_axis(iteration, "x", &reference.x_coords, &actual.x_coords)?;
    check_axis(iteration, "y", &reference.y_coords, &actual.y_coords)?;
    check_axis(iteration, "z", &reference.z_coords, &actual.z_coords)?;

    let cells = reference.cell_count();
    for grid in [reference, actual] {
        for (name, values) in grid.fields.iter() {
            if values.len() != cells {
                return Err(incompatible(
                    iteration,
                    format!("field '{name}' holds {} cells, grid has {cells}", values.len()),
                ));
            }
        }
    }

    let fields = reference.fields.zip_map(&actual.fields, |a, b| (a - b).abs());
    Ok(DifferenceGrid {
        grid: GlobalGrid {
            iteration,
            x_coords: reference.x_coords.clone(),
            y_coords: reference.y_coords.clone(),
            z_coords: reference.z_coords.clone(),
            fields,
        },
    })
}
