use async_trait::async_trait;
use careguide_indexer::{build_index, load, persist, IndexBundle, IndexHandle};
use careguide_search::{
    join_context, retrieve, KeywordRetriever, Retriever, SearchError, VectorRetriever,
};
use careguide_vector_store::{Embedder, StubEmbedder, VectorStoreError};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const FEVER: &str = "Fever management in infants.";
const TABLE: &str = "TABLE DATA:\nDrug\tDose\nParacetamol\t15mg/kg";

/// Places "fever" texts and table texts on orthogonal axes.
struct TopicEmbedder;

#[async_trait]
impl Embedder for TopicEmbedder {
    fn dimension(&self) -> usize {
        2
    }

    fn model_id(&self) -> &str {
        "topic"
    }

    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> careguide_vector_store::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                if lower.contains("fever") {
                    vec![1.0, 0.0]
                } else if lower.contains("table") || lower.contains("dose") {
                    vec![0.0, 1.0]
                } else {
                    vec![0.5, 0.5]
                }
            })
            .collect())
    }
}

struct OfflineEmbedder;

#[async_trait]
impl Embedder for OfflineEmbedder {
    fn dimension(&self) -> usize {
        2
    }

    fn model_id(&self) -> &str {
        "topic"
    }

    async fn embed_batch(
        &self,
        _texts: &[String],
    ) -> careguide_vector_store::Result<Vec<Vec<f32>>> {
        Err(VectorStoreError::upstream("model server offline"))
    }
}

async fn two_chunk_bundle() -> IndexBundle {
    let (bundle, _) = build_index(&[FEVER, TABLE], &TopicEmbedder).await.unwrap();
    bundle
}

#[tokio::test]
async fn fever_query_returns_fever_chunk() {
    let bundle = two_chunk_bundle().await;
    let hits = retrieve("fever", &bundle, &TopicEmbedder, 1).await.unwrap();
    assert_eq!(hits, vec![FEVER.to_string()]);
}

#[tokio::test]
async fn top_k_above_corpus_size_returns_everything_nearest_first() {
    let bundle = two_chunk_bundle().await;
    let hits = retrieve("paracetamol dose", &bundle, &TopicEmbedder, 5).await.unwrap();
    assert_eq!(
        hits,
        vec![
            "TABLE DATA: Drug\tDose Paracetamol\t15mg/kg".to_string(),
            FEVER.to_string(),
        ]
    );
}

#[tokio::test]
async fn equal_distances_resolve_by_position() {
    let (bundle, _): (IndexBundle, _) = build_index(
        &["first fever note", "second fever note", "third fever note"],
        &TopicEmbedder,
    )
    .await
    .unwrap();

    for _ in 0..3 {
        let hits = retrieve("fever", &bundle, &TopicEmbedder, 2).await.unwrap();
        assert_eq!(hits, vec!["first fever note", "second fever note"]);
    }
}

#[tokio::test]
async fn embedder_failure_is_forwarded() {
    let bundle = two_chunk_bundle().await;
    let result = retrieve("fever", &bundle, &OfflineEmbedder, 1).await;
    assert!(matches!(
        result,
        Err(SearchError::VectorStoreError(VectorStoreError::Upstream(_)))
    ));
}

#[tokio::test]
async fn persisted_bundle_answers_identically() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = StubEmbedder::new(32);
    let corpus = [
        FEVER,
        TABLE,
        "Dehydration: assess capillary refill time.",
        "Bronchiolitis: supportive care and oxygen.",
    ];
    let (bundle, _): (IndexBundle, _) = build_index(&corpus, &embedder).await.unwrap();
    persist(&bundle, dir.path()).await.unwrap();
    let loaded: IndexBundle = load(dir.path()).await.unwrap();

    for query in ["fever", "oxygen for bronchiolitis", "paracetamol"] {
        assert_eq!(
            retrieve(query, &loaded, &embedder, 3).await.unwrap(),
            retrieve(query, &bundle, &embedder, 3).await.unwrap()
        );
    }
}

#[tokio::test]
async fn retrievers_share_a_swappable_handle() {
    let handle = Arc::new(IndexHandle::new(two_chunk_bundle().await));
    let vector = VectorRetriever::new(handle.clone(), Arc::new(TopicEmbedder));
    let keyword = KeywordRetriever::new(handle.clone());

    let scored = vector.retrieve_scored("fever", 2).await.unwrap();
    assert_eq!(scored[0].position, 0);
    assert_eq!(scored[0].score, 0.0);
    assert_eq!(scored[1].score, 2.0);

    let hits = keyword.retrieve("paracetamol", 3).await.unwrap();
    assert_eq!(hits, vec!["TABLE DATA: Drug\tDose Paracetamol\t15mg/kg"]);

    let (replacement, _) = build_index(&["Fever pathway v2"], &TopicEmbedder).await.unwrap();
    handle.swap(replacement);
    assert_eq!(
        vector.retrieve("fever", 5).await.unwrap(),
        vec!["Fever pathway v2"]
    );
    assert!(keyword.retrieve("paracetamol", 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn context_joins_nearest_first() {
    let bundle = two_chunk_bundle().await;
    let hits = retrieve("fever", &bundle, &TopicEmbedder, 2).await.unwrap();
    assert_eq!(
        join_context(&hits),
        "Fever management in infants.\n\nTABLE DATA: Drug\tDose Paracetamol\t15mg/kg"
    );
}
