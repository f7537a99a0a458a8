// ─────────────────────────────────────────────────────────────────────
// TeaLeaf Post — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Name of the chunk-layout descriptor written by the solver.
pub const VISIT_FILENAME: &str = "tea.visit";

/// Descriptor key: number of chunks along X.
pub const GRID_X_CHUNKS_KEY: &str = "grid_x_chunks";

/// Descriptor key: number of chunks along Y.
pub const GRID_Y_CHUNKS_KEY: &str = "grid_y_chunks";

/// Cell-centred fields carried by every chunk, in on-disk array order.
pub const FIELD_NAMES: [&str; 3] = ["density", "energy", "temperature"];

/// Default prefix of merged output files.
pub const DEFAULT_OUTPUT_PREFIX: &str = "tea";

/// Default prefix of difference output files.
pub const DEFAULT_ERROR_PREFIX: &str = "tea-error";

/// Default grid-file extension.
pub const DEFAULT_EXTENSION: &str = "vtk";

/// Zero padding of the iteration number in output filenames.
/// Five digits keeps lexical order equal to numeric order up to 99_999.
pub const DEFAULT_ITERATION_PADDING: usize = 5;

/// The single z-plane every assembled grid lives on.
pub const Z_PLANE: f64 = 0.0;
