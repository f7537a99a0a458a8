// ─────────────────────────────────────────────────────────────────────
// TeaLeaf Post — Post-Processing Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Reassembly of chunked TeaLeaf dumps into global grids.
//!
//! Stage 1: filename decoding, missing-chunk recovery
//! Stage 2: coordinate and cell merging, grid assembly
//! Stage 3: difference grids, error statistics, solver log decoding

pub mod assemble;
pub mod cells;
pub mod coords;
pub mod diff;
pub mod filename;
pub mod perf_log;
pub mod pipeline;
pub mod recovery;
pub mod stats;
