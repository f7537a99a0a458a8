// ─────────────────────────────────────────────────────────────────────
// TeaLeaf Post — Codec Seam
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Boundary between the reconstruction core and the grid file format.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TeaResult;
use crate::state::{GlobalGrid, RawGrid};

/// On-disk variant of the grid format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    #[default]
    Ascii,
    Binary,
}

/// Reads chunk files and persists assembled grids.
///
/// Cell arrays come back in file order; the core addresses them by index.
pub trait GridCodec: Send + Sync {
    fn read(&self, source: &Path) -> TeaResult<RawGrid>;

    fn write(&self, grid: &GlobalGrid, destination: &Path, encoding: Encoding) -> TeaResult<()>;
}
