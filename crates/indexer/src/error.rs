use careguide_chunk_store::ChunkStoreError;
use careguide_vector_store::VectorStoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("No usable chunks to index")]
    EmptyInput,

    #[error("Index artifact not found: {0}")]
    NotFound(String),

    #[error("Corrupt index data: {0}")]
    CorruptData(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Chunk store error: {0}")]
    ChunkStoreError(ChunkStoreError),

    #[error("Vector store error: {0}")]
    VectorStoreError(VectorStoreError),

    #[error("{0}")]
    Other(String),
}

impl IndexerError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptData(msg.into())
    }
}

impl From<ChunkStoreError> for IndexerError {
    fn from(err: ChunkStoreError) -> Self {
        match err {
            ChunkStoreError::EmptyInput => Self::EmptyInput,
            ChunkStoreError::CorruptData(msg) => Self::CorruptData(msg),
            ChunkStoreError::IoError(io) => Self::IoError(io),
            other => Self::ChunkStoreError(other),
        }
    }
}

impl From<VectorStoreError> for IndexerError {
    fn from(err: VectorStoreError) -> Self {
        match err {
            VectorStoreError::EmptyInput => Self::EmptyInput,
            VectorStoreError::CorruptData(msg) => Self::CorruptData(msg),
            other => Self::VectorStoreError(other),
        }
    }
}
