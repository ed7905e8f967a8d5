use serde::{Deserialize, Serialize};

/// Statistics about one index build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Raw chunks handed to the builder
    pub raw_chunks: usize,

    /// Chunks that survived filtering and were embedded
    pub kept_chunks: usize,

    /// Chunks dropped as empty after normalization
    pub dropped_chunks: usize,

    /// Embedding dimensionality
    pub dimension: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl BuildStats {
    pub(crate) fn new(raw_chunks: usize, kept_chunks: usize, dimension: usize) -> Self {
        Self {
            raw_chunks,
            kept_chunks,
            dropped_chunks: raw_chunks.saturating_sub(kept_chunks),
            dimension,
            time_ms: 0,
        }
    }
}
