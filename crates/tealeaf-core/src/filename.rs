// ─────────────────────────────────────────────────────────────────────
// TeaLeaf Post — Filename Decoder
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Chunk identity from dump filenames.
//!
//! Merge mode reads `<prefix>.<x>.<y>.<iteration>.<ext>`, comparison mode
//! reads `<prefix>.<iteration>.<ext>`. Positional fields are taken from the
//! end of the name, so a prefix may itself contain dots.

use std::path::Path;

use tealeaf_types::config::DuplicatePolicy;
use tealeaf_types::error::{TeaError, TeaResult};
use tealeaf_types::manifest::{ChunkRef, IterationManifest};
use tealeaf_types::state::ChunkKey;

/// Which filename pattern to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingScheme {
    /// One file per chunk per iteration.
    Chunked,
    /// One file per iteration holding the whole domain.
    Single,
}

/// Identity recovered from one filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedName {
    pub key: ChunkKey,
    pub iteration: usize,
}

fn malformed(name: &str, reason: impl Into<String>) -> TeaError {
    TeaError::MalformedName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn parse_index(name: &str, field: &str, token: &str) -> TeaResult<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(name, format!("{field} '{token}' is not a non-negative integer")));
    }
    token
        .parse::<usize>()
        .map_err(|e| malformed(name, format!("{field} '{token}': {e}")))
}

/// Decodes the chunk key and iteration of one file.
///
/// Only the final path component is inspected. Single-scheme files map to
/// chunk `(0, 0)`.
pub fn decode_filename(path: &Path, scheme: NamingScheme) -> TeaResult<DecodedName> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| malformed(&path.display().to_string(), "no UTF-8 file name"))?;
    let parts: Vec<&str> = name.split('.').collect();
    let n = parts.len();
    let min_parts = match scheme {
        NamingScheme::Chunked => 5,
        NamingScheme::Single => 3,
    };
    if n < min_parts {
        return Err(malformed(
            name,
            format!("expected at least {min_parts} dot-separated fields, found {n}"),
        ));
    }
    if parts[0].is_empty() || parts[n - 1].is_empty() {
        return Err(malformed(name, "empty prefix or extension"));
    }
    let iteration = parse_index(name, "iteration", parts[n - 2])?;
    let key = match scheme {
        NamingScheme::Chunked => ChunkKey::new(
            parse_index(name, "x index", parts[n - 4])?,
            parse_index(name, "y index", parts[n - 3])?,
        ),
        NamingScheme::Single => ChunkKey::new(0, 0),
    };
    Ok(DecodedName { key, iteration })
}

/// Groups files by iteration. Input order only matters for
/// `DuplicatePolicy::LastWins`.
pub fn decode_filenames<I, P>(
    paths: I,
    scheme: NamingScheme,
    policy: DuplicatePolicy,
) -> TeaResult<IterationManifest>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut manifest = IterationManifest::new();
    for path in paths {
        let path = path.as_ref();
        let decoded = decode_filename(path, scheme)?;
        let replaced = manifest.insert(
            ChunkRef::new(decoded.key, decoded.iteration, path),
            policy,
        )?;
        if let Some(old) = replaced {
            tracing::warn!(
                iteration = decoded.iteration,
                chunk = %decoded.key,
                dropped = %old.source.display(),
                kept = %path.display(),
                "duplicate chunk file, keeping the last one"
            );
        }
    }
    tracing::debug!(
        iterations = manifest.len(),
        chunks = manifest.total_chunks(),
        "filenames decoded"
    );
    Ok(manifest)
}

/// `<prefix>.<iteration>.<ext>` with the iteration zero-padded.
pub fn output_filename(prefix: &str, iteration: usize, padding: usize, extension: &str) -> String {
    format!("{prefix}.{iteration:0padding$}.{extension}")
}

/// `<prefix>.<x>.<y>.<iteration>.<ext>`, the solver's per-chunk dump name.
pub fn chunk_filename(
    prefix: &str,
    key: ChunkKey,
    iteration: usize,
    padding: usize,
    extension: &str,
) -> String {
    format!(
        "{prefix}.{x:0padding$}.{y:0padding$}.{iteration:0padding$}.{extension}",
        x = key.x,
        y = key.y
    )
}
