use crate::error::{Result, SearchError};
use crate::retriever::{RetrievedChunk, Retriever};
use async_trait::async_trait;
use careguide_chunk_store::ChunkStore;
use careguide_indexer::IndexHandle;
use careguide_vector_store::{FlatL2Index, VectorIndex};
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// Word-overlap retrieval that needs no embedder.
///
/// A chunk scores one point per query word found as a substring of its
/// lowercased text; chunks scoring zero are never returned.
pub struct KeywordRetriever<I = FlatL2Index> {
    handle: Arc<IndexHandle<I>>,
}

impl<I: VectorIndex> KeywordRetriever<I> {
    pub fn new(handle: Arc<IndexHandle<I>>) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl<I: VectorIndex> Retriever for KeywordRetriever<I> {
    async fn retrieve_scored(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let bundle = self.handle.snapshot();
        keyword_search(query, bundle.store(), top_k)
    }
}

/// Rank `store` by query-word overlap, best first, ties by position.
///
/// Query words are Unicode words, not whitespace runs: punctuation is dropped
/// and `15mg/kg` counts as the two words `15mg` and `kg`.
pub fn keyword_search(query: &str, store: &ChunkStore, top_k: usize) -> Result<Vec<RetrievedChunk>> {
    if query.trim().is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    let lowered = query.to_lowercase();
    let words: Vec<&str> = lowered.unicode_words().collect();

    let mut scored: Vec<(usize, usize)> = store
        .chunks()
        .iter()
        .enumerate()
        .filter_map(|(position, chunk)| {
            let text = chunk.text().to_lowercase();
            let score = words.iter().filter(|w| text.contains(*w)).count();
            (score > 0).then_some((position, score))
        })
        .collect();

    // Stable sort keeps ascending positions within equal scores.
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.truncate(top_k);

    log::debug!(
        "Keyword search: query='{}', words={}, hits={}",
        query,
        words.len(),
        scored.len()
    );

    scored
        .into_iter()
        .map(|(position, score)| -> Result<RetrievedChunk> {
            Ok(RetrievedChunk {
                position,
                score: score as f32,
                text: store.get(position)?.text().to_string(),
            })
        })
        .collect()
}
