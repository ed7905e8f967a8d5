use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Empty query")]
    EmptyQuery,

    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] careguide_vector_store::VectorStoreError),

    #[error("Chunk store error: {0}")]
    ChunkStoreError(#[from] careguide_chunk_store::ChunkStoreError),

    #[error("Index error: {0}")]
    IndexerError(#[from] careguide_indexer::IndexerError),
}
