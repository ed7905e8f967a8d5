use thiserror::Error;

/// Result type for chunk store operations
pub type Result<T> = std::result::Result<T, ChunkStoreError>;

/// Errors that can occur while building, reading or decoding a chunk store
#[derive(Error, Debug)]
pub enum ChunkStoreError {
    /// No chunk survived trimming
    #[error("No usable chunks: every input chunk was empty after trimming")]
    EmptyInput,

    /// Position outside the store
    #[error("Chunk position {position} out of range (store holds {len} chunks)")]
    OutOfRange { position: usize, len: usize },

    /// The chunk-text artifact does not follow the one-chunk-per-line format
    #[error("Corrupt chunk artifact: {0}")]
    CorruptData(String),

    /// Extracted document could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ChunkStoreError {
    /// Create a corrupt-data error
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptData(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }
}
