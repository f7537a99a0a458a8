// ─────────────────────────────────────────────────────────────────────
// TeaLeaf Post — Missing Chunk Recovery
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Carry-forward imputation of chunks the solver did not write.
//!
//! Iterations are folded in ascending order through an explicit
//! [`RecoveryCarryState`]. Iteration `i + 1` is resolved against the
//! *resolved* state of iteration `i`, so the pass is inherently sequential.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tealeaf_types::config::ChunkLayout;
use tealeaf_types::error::{TeaError, TeaResult};
use tealeaf_types::manifest::{ChunkRef, IterationChunks, IterationManifest};
use tealeaf_types::state::ChunkKey;

/// Latest resolved chunk per key. Lives for one recovery pass.
#[derive(Debug, Default)]
pub struct RecoveryCarryState {
    last_seen: BTreeMap<ChunkKey, ChunkRef>,
}

impl RecoveryCarryState {
    pub fn new() -> Self {
        RecoveryCarryState::default()
    }

    pub fn known_keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.last_seen.keys().copied()
    }

    /// Fills the gaps of one iteration from the carried state.
    fn fill(
        &self,
        iteration: usize,
        mut chunks: IterationChunks,
        layout: Option<&ChunkLayout>,
        report: &mut RecoveryReport,
    ) -> TeaResult<IterationChunks> {
        let mut expected: BTreeSet<ChunkKey> = self.known_keys().collect();
        if let Some(layout) = layout {
            let outside: Vec<ChunkKey> = chunks
                .keys()
                .copied()
                .filter(|k| !layout.contains(*k))
                .collect();
            if !outside.is_empty() {
                return Err(TeaError::InconsistentChunkGeometry {
                    iteration,
                    keys: outside,
                    message: format!(
                        "chunk index outside the declared {}x{} layout",
                        layout.grid_x_chunks, layout.grid_y_chunks
                    ),
                });
            }
            expected.extend(layout.keys());
        }

        let missing: Vec<ChunkKey> = expected
            .into_iter()
            .filter(|k| !chunks.contains_key(k))
            .collect();
        for key in missing {
            let prior = self
                .last_seen
                .get(&key)
                .ok_or(TeaError::NoPriorChunkAvailable { iteration, key })?;
            let substitute = prior.carried_to(iteration);
            if iteration != 0 {
                tracing::warn!(
                    iteration,
                    chunk = %key,
                    reused = %substitute.source.display(),
                    "missing chunk file, re-using prior chunk"
                );
            }
            report.reused.push(ReusedChunk {
                iteration,
                key,
                source: substitute.source.clone(),
                from_iteration: substitute.source_iteration(),
            });
            chunks.insert(key, substitute);
        }
        Ok(chunks)
    }

    /// Records every chunk of a resolved iteration, recovered or original.
    fn absorb(&mut self, chunks: &IterationChunks) {
        for (key, chunk) in chunks {
            self.last_seen.insert(*key, chunk.clone());
        }
    }
}

/// One synthesized manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReusedChunk {
    pub iteration: usize,
    pub key: ChunkKey,
    pub source: PathBuf,
    pub from_iteration: usize,
}

/// Diagnostics of one recovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub reused: Vec<ReusedChunk>,
}

impl RecoveryReport {
    /// True when no entry had to be synthesized.
    pub fn is_clean(&self) -> bool {
        self.reused.is_empty()
    }
}

/// A manifest that went through carry-forward recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredManifest {
    manifest: IterationManifest,
}

impl RecoveredManifest {
    pub fn manifest(&self) -> &IterationManifest {
        &self.manifest
    }

    pub fn into_manifest(self) -> IterationManifest {
        self.manifest
    }

    /// Verifies every iteration holds every key seen anywhere in the run.
    ///
    /// Carry-forward cannot fill iterations that precede a key's first
    /// appearance; those are reported as `NoPriorChunkAvailable`.
    pub fn check_complete(&self) -> TeaResult<()> {
        let all = self.manifest.key_union();
        for (iteration, chunks) in self.manifest.iter() {
            if let Some(key) = all.iter().find(|k| !chunks.contains_key(*k)) {
                return Err(TeaError::NoPriorChunkAvailable {
                    iteration,
                    key: *key,
                });
            }
        }
        Ok(())
    }
}

/// Guarantees one entry per expected chunk key in every iteration.
///
/// Without a layout the expected keys are those seen in earlier iterations.
/// With a layout every key of the layout is expected from the first
/// iteration on, and chunks outside it are rejected.
pub fn recover_missing_chunks(
    manifest: IterationManifest,
    layout: Option<&ChunkLayout>,
) -> TeaResult<(RecoveredManifest, RecoveryReport)> {
    let mut state = RecoveryCarryState::new();
    let mut report = RecoveryReport::default();
    let mut resolved = BTreeMap::new();

    for (iteration, chunks) in manifest.into_iterations() {
        tracing::debug!(iteration, present = chunks.len(), "checking for missing chunks");
        let chunks = state.fill(iteration, chunks, layout, &mut report)?;
        state.absorb(&chunks);
        resolved.insert(iteration, chunks);
    }

    tracing::info!(
        iterations = resolved.len(),
        reused = report.reused.len(),
        "missing chunks recovered"
    );
    Ok((
        RecoveredManifest {
            manifest: IterationManifest::from_iterations(resolved),
        },
        report,
    ))
}
