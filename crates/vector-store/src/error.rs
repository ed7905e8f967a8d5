use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

/// Boxed error produced by an embedding backend
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Cannot build an index from zero embeddings")]
    EmptyInput,

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding backend failed: {0}")]
    Upstream(#[source] BoxError),

    #[error("Corrupt vector artifact: {0}")]
    CorruptData(String),

    #[error("Embedding configuration error: {0}")]
    Config(String),
}

impl VectorStoreError {
    /// Forward a backend error unchanged
    pub fn upstream(err: impl Into<BoxError>) -> Self {
        Self::Upstream(err.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptData(msg.into())
    }
}
