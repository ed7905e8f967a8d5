use crate::error::{ChunkStoreError, Result};
use crate::types::Chunk;

/// Ordered, immutable sequence of chunks addressed by dense 0-based positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkStore {
    chunks: Vec<Chunk>,
}

impl ChunkStore {
    /// Build a store from raw chunk text in document order.
    ///
    /// Chunks that are empty after trimming are dropped without leaving a gap
    /// in the positions of the ones that follow.
    pub fn from_raw<I, S>(raw_chunks: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut total = 0usize;
        let chunks: Vec<Chunk> = raw_chunks
            .into_iter()
            .inspect(|_| total += 1)
            .filter_map(|raw| Chunk::normalize(raw.as_ref()))
            .collect();

        if chunks.is_empty() {
            return Err(ChunkStoreError::EmptyInput);
        }

        if chunks.len() < total {
            log::debug!(
                "Dropped {} empty chunks ({} kept)",
                total - chunks.len(),
                chunks.len()
            );
        }

        Ok(Self { chunks })
    }

    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Get the chunk at `position`
    pub fn get(&self, position: usize) -> Result<&Chunk> {
        self.chunks
            .get(position)
            .ok_or(ChunkStoreError::OutOfRange {
                position,
                len: self.chunks.len(),
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Always false for a constructed store; kept for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk texts in position order, as handed to the embedder.
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.chunks.iter().map(|c| c.text().to_string()).collect()
    }

    /// Serialize into the chunk-text artifact: one chunk per line, each line
    /// terminated by `\n`.
    #[must_use]
    pub fn to_artifact(&self) -> String {
        let capacity = self.chunks.iter().map(|c| c.text().len() + 1).sum();
        let mut out = String::with_capacity(capacity);
        for chunk in &self.chunks {
            out.push_str(chunk.text());
            out.push('\n');
        }
        out
    }

    /// Parse a chunk-text artifact produced by [`ChunkStore::to_artifact`].
    pub fn from_artifact(text: &str) -> Result<Self> {
        let body = text.strip_suffix('\n').unwrap_or(text);
        if body.is_empty() {
            return Err(ChunkStoreError::corrupt("chunk artifact holds no lines"));
        }

        let mut chunks = Vec::new();
        for (line_no, line) in body.split('\n').enumerate() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            match Chunk::normalize(line) {
                Some(chunk) if chunk.text() == line => chunks.push(chunk),
                Some(_) => {
                    return Err(ChunkStoreError::corrupt(format!(
                        "line {} is not in normalized form",
                        line_no + 1
                    )))
                }
                None => {
                    return Err(ChunkStoreError::corrupt(format!(
                        "line {} is blank",
                        line_no + 1
                    )))
                }
            }
        }

        Ok(Self { chunks })
    }
}
