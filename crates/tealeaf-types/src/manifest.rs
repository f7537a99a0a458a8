// ─────────────────────────────────────────────────────────────────────
// TeaLeaf Post — Manifest
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Chunk references grouped by iteration.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::DuplicatePolicy;
use crate::error::{TeaError, TeaResult};
use crate::state::ChunkKey;

/// Where a manifest entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ChunkOrigin {
    /// Decoded from a file written for this iteration.
    Original,
    /// Substituted from the file of an earlier iteration.
    CarriedForward { from_iteration: usize },
}

/// Lightweight handle on one chunk file. The payload is loaded on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRef {
    pub key: ChunkKey,
    pub iteration: usize,
    pub source: PathBuf,
    pub origin: ChunkOrigin,
}

impl ChunkRef {
    pub fn new(key: ChunkKey, iteration: usize, source: impl Into<PathBuf>) -> Self {
        ChunkRef {
            key,
            iteration,
            source: source.into(),
            origin: ChunkOrigin::Original,
        }
    }

    pub fn is_carried_forward(&self) -> bool {
        matches!(self.origin, ChunkOrigin::CarriedForward { .. })
    }

    /// Iteration whose file actually backs this entry.
    pub fn source_iteration(&self) -> usize {
        match self.origin {
            ChunkOrigin::Original => self.iteration,
            ChunkOrigin::CarriedForward { from_iteration } => from_iteration,
        }
    }

    /// Same file, re-tagged as a stand-in for `iteration`.
    pub fn carried_to(&self, iteration: usize) -> ChunkRef {
        ChunkRef {
            key: self.key,
            iteration,
            source: self.source.clone(),
            origin: ChunkOrigin::CarriedForward {
                from_iteration: self.source_iteration(),
            },
        }
    }
}

/// Chunks of one iteration, ordered by key.
pub type IterationChunks = BTreeMap<ChunkKey, ChunkRef>;

/// Iteration number → chunks present for it, both levels ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationManifest {
    iterations: BTreeMap<usize, IterationChunks>,
}

impl IterationManifest {
    pub fn new() -> Self {
        IterationManifest::default()
    }

    pub fn from_iterations(iterations: BTreeMap<usize, IterationChunks>) -> Self {
        IterationManifest { iterations }
    }

    pub fn into_iterations(self) -> BTreeMap<usize, IterationChunks> {
        self.iterations
    }

    /// Adds a chunk. On a key collision `Reject` fails with
    /// `DuplicateChunk` and `LastWins` replaces the earlier entry, which
    /// is returned.
    pub fn insert(&mut self, chunk: ChunkRef, policy: DuplicatePolicy) -> TeaResult<Option<ChunkRef>> {
        let slot = self.iterations.entry(chunk.iteration).or_default();
        if let Some(existing) = slot.get(&chunk.key) {
            if policy == DuplicatePolicy::Reject {
                return Err(TeaError::DuplicateChunk {
                    iteration: chunk.iteration,
                    key: chunk.key,
                    first: existing.source.clone(),
                    second: chunk.source,
                });
            }
        }
        Ok(slot.insert(chunk.key, chunk))
    }

    pub fn iteration_numbers(&self) -> impl Iterator<Item = usize> + '_ {
        self.iterations.keys().copied()
    }

    pub fn chunks(&self, iteration: usize) -> Option<&IterationChunks> {
        self.iterations.get(&iteration)
    }

    pub fn chunk(&self, iteration: usize, key: ChunkKey) -> Option<&ChunkRef> {
        self.iterations.get(&iteration)?.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &IterationChunks)> {
        self.iterations.iter().map(|(&it, chunks)| (it, chunks))
    }

    /// Number of iterations.
    pub fn len(&self) -> usize {
        self.iterations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty()
    }

    pub fn total_chunks(&self) -> usize {
        self.iterations.values().map(BTreeMap::len).sum()
    }

    /// Every chunk key observed in any iteration.
    pub fn key_union(&self) -> BTreeSet<ChunkKey> {
        self.iterations
            .values()
            .flat_map(|chunks| chunks.keys().copied())
            .collect()
    }

    pub fn carried_forward_count(&self) -> usize {
        self.iterations
            .values()
            .flat_map(BTreeMap::values)
            .filter(|c| c.is_carried_forward())
            .count()
    }
}
