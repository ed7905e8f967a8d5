use crate::error::{Result, SearchError};
use async_trait::async_trait;
use careguide_indexer::{IndexBundle, IndexHandle};
use careguide_vector_store::{Embedder, FlatL2Index, VectorIndex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One retrieved chunk with its position in the chunk store.
///
/// `score` is the squared L2 distance for vector retrieval (lower is closer)
/// and the matched query-word count for keyword retrieval (higher is better).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub position: usize,
    pub score: f32,
    pub text: String,
}

/// Returns the chunks most relevant to a query, best first.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve_scored(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>>;

    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        Ok(self
            .retrieve_scored(query, top_k)
            .await?
            .into_iter()
            .map(|chunk| chunk.text)
            .collect())
    }
}

/// Embed `query` and return the texts of the `top_k` nearest chunks.
pub async fn retrieve<I, E>(
    query: &str,
    bundle: &IndexBundle<I>,
    embedder: &E,
    top_k: usize,
) -> Result<Vec<String>>
where
    I: VectorIndex,
    E: Embedder + ?Sized,
{
    Ok(search_bundle(query, bundle, embedder, top_k)
        .await?
        .into_iter()
        .map(|chunk| chunk.text)
        .collect())
}

async fn search_bundle<I, E>(
    query: &str,
    bundle: &IndexBundle<I>,
    embedder: &E,
    top_k: usize,
) -> Result<Vec<RetrievedChunk>>
where
    I: VectorIndex,
    E: Embedder + ?Sized,
{
    if query.trim().is_empty() {
        return Err(SearchError::EmptyQuery);
    }
    if top_k == 0 {
        return Ok(Vec::new());
    }
    if !bundle.model_id().is_empty() && bundle.model_id() != embedder.model_id() {
        log::warn!(
            "Index was built with '{}' but queries use '{}'",
            bundle.model_id(),
            embedder.model_id()
        );
    }

    let vector = embedder.embed(query).await?;
    let neighbors = bundle.index().search(&vector, top_k)?;
    log::debug!(
        "Vector search: query='{}', top_k={}, hits={}",
        query,
        top_k,
        neighbors.len()
    );

    neighbors
        .into_iter()
        .map(|neighbor| -> Result<RetrievedChunk> {
            let chunk = bundle.store().get(neighbor.position)?;
            Ok(RetrievedChunk {
                position: neighbor.position,
                score: neighbor.distance,
                text: chunk.text().to_string(),
            })
        })
        .collect()
}

/// Nearest-neighbor retrieval over the live bundle of an [`IndexHandle`].
pub struct VectorRetriever<I = FlatL2Index> {
    handle: Arc<IndexHandle<I>>,
    embedder: Arc<dyn Embedder>,
}

impl<I: VectorIndex> VectorRetriever<I> {
    pub fn new(handle: Arc<IndexHandle<I>>, embedder: Arc<dyn Embedder>) -> Self {
        Self { handle, embedder }
    }
}

#[async_trait]
impl<I: VectorIndex> Retriever for VectorRetriever<I> {
    async fn retrieve_scored(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let bundle = self.handle.snapshot();
        search_bundle(query, &bundle, self.embedder.as_ref(), top_k).await
    }
}
