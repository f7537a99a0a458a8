// ─────────────────────────────────────────────────────────────────────
// TeaLeaf Post — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::Encoding;
use crate::constants::{
    DEFAULT_EXTENSION, DEFAULT_ITERATION_PADDING, DEFAULT_OUTPUT_PREFIX, GRID_X_CHUNKS_KEY,
    GRID_Y_CHUNKS_KEY,
};
use crate::error::{TeaError, TeaResult};
use crate::state::ChunkKey;

/// What to do when two files claim the same chunk of the same iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with `DuplicateChunk`.
    #[default]
    Reject,
    /// Keep the file seen last in input order.
    LastWins,
}

/// How chunk-boundary coordinates are matched when merging axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Exact-equality union. Boundaries that differ in the last bit add
    /// spurious vertices without any error.
    Exact,
    /// Exact-equality union, then the vertex count of each axis must equal
    /// one plus the summed cell counts of the chunk columns (rows).
    #[default]
    Strict,
}

/// Whether one failing iteration stops a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failed iteration. Iterations already running in
    /// other workers finish and may still write their output.
    #[default]
    Abort,
    /// Record the failure and process the remaining iterations.
    Continue,
}

/// Post-processing options. Every field has a default, so a partial JSON
/// document is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostprocessConfig {
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,
    #[serde(default)]
    pub encoding: Encoding,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    #[serde(default)]
    pub boundary_policy: BoundaryPolicy,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Zero padding of the iteration number in output filenames.
    #[serde(default = "default_iteration_padding")]
    pub iteration_padding: usize,
    /// Extension of input and output grid files, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Delete the input chunk files after a fully successful merge.
    #[serde(default)]
    pub remove_inputs: bool,
}

fn default_output_prefix() -> String {
    DEFAULT_OUTPUT_PREFIX.to_string()
}
fn default_iteration_padding() -> usize {
    DEFAULT_ITERATION_PADDING
}
fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        PostprocessConfig {
            output_prefix: default_output_prefix(),
            encoding: Encoding::default(),
            duplicate_policy: DuplicatePolicy::default(),
            boundary_policy: BoundaryPolicy::default(),
            failure_policy: FailurePolicy::default(),
            iteration_padding: default_iteration_padding(),
            extension: default_extension(),
            remove_inputs: false,
        }
    }
}

impl PostprocessConfig {
    pub fn from_file(path: impl AsRef<Path>) -> TeaResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TeaResult<()> {
        if self.output_prefix.is_empty() {
            return Err(TeaError::ConfigError("output_prefix must not be empty".into()));
        }
        if self.extension.is_empty() || self.extension.contains('.') {
            return Err(TeaError::ConfigError(format!(
                "extension must be non-empty and dot-free, got '{}'",
                self.extension
            )));
        }
        if self.iteration_padding == 0 || self.iteration_padding > 20 {
            return Err(TeaError::ConfigError(format!(
                "iteration_padding must be in 1..=20, got {}",
                self.iteration_padding
            )));
        }
        Ok(())
    }
}

/// Static chunk decomposition declared by the solver's visit descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkLayout {
    pub grid_x_chunks: usize,
    pub grid_y_chunks: usize,
}

impl ChunkLayout {
    pub fn new(grid_x_chunks: usize, grid_y_chunks: usize) -> TeaResult<Self> {
        if grid_x_chunks == 0 || grid_y_chunks == 0 {
            return Err(TeaError::ConfigError(format!(
                "chunk layout must be positive, got {grid_x_chunks}x{grid_y_chunks}"
            )));
        }
        Ok(ChunkLayout {
            grid_x_chunks,
            grid_y_chunks,
        })
    }

    /// Chunks in a fully populated iteration.
    pub fn chunk_count(&self) -> usize {
        self.grid_x_chunks * self.grid_y_chunks
    }

    pub fn contains(&self, key: ChunkKey) -> bool {
        key.x < self.grid_x_chunks && key.y < self.grid_y_chunks
    }

    /// Every key of the layout in ascending `(x, y)` order.
    pub fn keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        (0..self.grid_x_chunks)
            .flat_map(move |x| (0..self.grid_y_chunks).map(move |y| ChunkKey::new(x, y)))
    }

    /// Parses descriptor text. Only lines made of exactly two tokens with an
    /// integer second token count as `key value` pairs; filename listings and
    /// other lines are ignored.
    pub fn parse(text: &str) -> TeaResult<Self> {
        let mut vars: HashMap<&str, i64> = HashMap::new();
        for line in text.lines() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if let [key, value] = tokens.as_slice() {
                if let Ok(v) = value.parse::<i64>() {
                    vars.insert(*key, v);
                }
            }
        }
        let lookup = |key: &str| -> TeaResult<usize> {
            let value = *vars.get(key).ok_or_else(|| {
                TeaError::MissingInput(format!("visit descriptor lacks required key '{key}'"))
            })?;
            usize::try_from(value)
                .ok()
                .filter(|&v| v > 0)
                .ok_or_else(|| TeaError::ConfigError(format!("'{key}' must be positive, got {value}")))
        };
        ChunkLayout::new(lookup(GRID_X_CHUNKS_KEY)?, lookup(GRID_Y_CHUNKS_KEY)?)
    }

    pub fn from_visit_file(path: impl AsRef<Path>) -> TeaResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            TeaError::MissingInput(format!(
                "visit descriptor '{}' is absent or unreadable: {e}",
                path.display()
            ))
        })?;
        ChunkLayout::parse(&text)
    }
}
