use crate::error::{IndexerError, Result};
use crate::stats::BuildStats;
use careguide_chunk_store::ChunkStore;
use careguide_vector_store::{embed_all, Embedder, FlatL2Index, VectorIndex};
use std::time::Instant;

/// A chunk store paired with the vector index built from it.
///
/// Vector `i` is the embedding of chunk `i`; the two lengths are always equal.
#[derive(Debug, Clone)]
pub struct IndexBundle<I = FlatL2Index> {
    store: ChunkStore,
    index: I,
    model_id: String,
}

impl<I: VectorIndex> IndexBundle<I> {
    /// Pair an existing store and index, checking they describe the same corpus
    pub fn new(store: ChunkStore, index: I) -> Result<Self> {
        if store.len() != index.len() {
            return Err(IndexerError::corrupt(format!(
                "index holds {} vectors but chunk store holds {} chunks",
                index.len(),
                store.len()
            )));
        }
        Ok(Self {
            store,
            index,
            model_id: String::new(),
        })
    }

    /// Record the embedder that produced the vectors
    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// Embedder model id, empty when unknown
    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Filter `raw_chunks`, embed the survivors in order and build the index.
pub async fn build_index<I, E, S>(raw_chunks: &[S], embedder: &E) -> Result<(IndexBundle<I>, BuildStats)>
where
    I: VectorIndex,
    E: Embedder + ?Sized,
    S: AsRef<str>,
{
    let start = Instant::now();
    let store = ChunkStore::from_raw(raw_chunks)?;

    let texts = store.texts();
    log::info!(
        "Embedding {} chunks with '{}' (dim {})",
        texts.len(),
        embedder.model_id(),
        embedder.dimension()
    );
    let vectors = embed_all(embedder, &texts).await?;
    let index = I::build(vectors)?;

    let mut stats = BuildStats::new(raw_chunks.len(), store.len(), index.dimension());
    let bundle = IndexBundle::new(store, index)?.with_model_id(embedder.model_id());
    stats.time_ms = start.elapsed().as_millis() as u64;

    log::info!(
        "Built index: {} chunks kept, {} dropped, {} ms",
        stats.kept_chunks,
        stats.dropped_chunks,
        stats.time_ms
    );
    Ok((bundle, stats))
}
