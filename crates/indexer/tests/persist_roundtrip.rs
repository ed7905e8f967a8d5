use careguide_indexer::{
    build_index, decode_pair, load, manifest_path, persist, read_manifest, IndexBundle,
    IndexHandle, IndexerError,
};
use careguide_vector_store::{StubEmbedder, VectorIndex};
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::TempDir;

const CORPUS: [&str; 3] = [
    "Fever management in infants.",
    "TABLE DATA:\nDrug\tDose\nParacetamol\t15mg/kg",
    "Dehydration: assess capillary refill.",
];

async fn built() -> IndexBundle {
    let (bundle, _stats) = build_index(&CORPUS, &StubEmbedder::new(16)).await.unwrap();
    bundle
}

fn generation_dirs(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(root.join("generations"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn persisted_pair_loads_back_identically() {
    let dir = TempDir::new().unwrap();
    let bundle = built().await;
    let manifest = persist(&bundle, dir.path()).await.unwrap();

    assert_eq!(manifest.generation, 1);
    assert_eq!(manifest.chunk_count, 3);
    assert_eq!(manifest.vector_count, 3);
    assert_eq!(manifest.dimension, 16);
    assert_eq!(manifest.model_id, "stub-16");

    let loaded: IndexBundle = load(dir.path()).await.unwrap();
    assert_eq!(loaded.store(), bundle.store());
    assert_eq!(loaded.index(), bundle.index());
    assert_eq!(loaded.model_id(), "stub-16");

    let chunks = std::fs::read_to_string(manifest.chunks_path(dir.path())).unwrap();
    assert_eq!(
        chunks,
        "Fever management in infants.\n\
         TABLE DATA: Drug\tDose Paracetamol\t15mg/kg\n\
         Dehydration: assess capillary refill.\n"
    );

    let query = bundle.index().search(&[0.25; 16], 3).unwrap();
    assert_eq!(loaded.index().search(&[0.25; 16], 3).unwrap(), query);
}

#[tokio::test]
async fn missing_manifest_is_not_found() {
    let dir = TempDir::new().unwrap();
    let result: Result<IndexBundle, _> = load(dir.path()).await;
    assert!(matches!(result, Err(IndexerError::NotFound(_))));
    assert!(matches!(
        read_manifest(dir.path()).await,
        Err(IndexerError::NotFound(_))
    ));
}

#[tokio::test]
async fn missing_artifact_is_not_found() {
    let dir = TempDir::new().unwrap();
    let manifest = persist(&built().await, dir.path()).await.unwrap();
    std::fs::remove_file(manifest.index_path(dir.path())).unwrap();

    let result: Result<IndexBundle, _> = load(dir.path()).await;
    assert!(matches!(result, Err(IndexerError::NotFound(_))));
}

#[tokio::test]
async fn tampered_chunk_artifact_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let manifest = persist(&built().await, dir.path()).await.unwrap();
    let path = manifest.chunks_path(dir.path());
    let mut text = std::fs::read_to_string(&path).unwrap();
    text.push_str("an extra chunk line\n");
    std::fs::write(&path, text).unwrap();

    let result: Result<IndexBundle, _> = load(dir.path()).await;
    assert!(matches!(result, Err(IndexerError::CorruptData(_))));
}

#[tokio::test]
async fn garbage_manifest_is_corrupt() {
    let dir = TempDir::new().unwrap();
    persist(&built().await, dir.path()).await.unwrap();
    std::fs::write(manifest_path(dir.path()), b"{ not json").unwrap();

    let result: Result<IndexBundle, _> = load(dir.path()).await;
    assert!(matches!(result, Err(IndexerError::CorruptData(_))));
}

#[tokio::test]
async fn unknown_schema_version_is_corrupt() {
    let dir = TempDir::new().unwrap();
    persist(&built().await, dir.path()).await.unwrap();
    let path = manifest_path(dir.path());
    let mut manifest: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    manifest["schema_version"] = serde_json::json!(99);
    std::fs::write(&path, serde_json::to_vec(&manifest).unwrap()).unwrap();

    assert!(matches!(
        read_manifest(dir.path()).await,
        Err(IndexerError::CorruptData(_))
    ));
}

#[tokio::test]
async fn vector_count_mismatch_is_corrupt() {
    let (two, _) = build_index::<careguide_vector_store::FlatL2Index, _, _>(
        &CORPUS[..2],
        &StubEmbedder::new(4),
    )
    .await
    .unwrap();
    let three = built().await;

    let result: Result<IndexBundle, _> =
        decode_pair(&three.store().to_artifact(), &two.index().to_bytes());
    assert!(matches!(result, Err(IndexerError::CorruptData(_))));
}

#[tokio::test]
async fn repeated_persist_prunes_old_generations() {
    let dir = TempDir::new().unwrap();
    let bundle = built().await;
    for _ in 0..4 {
        persist(&bundle, dir.path()).await.unwrap();
    }

    let manifest = read_manifest(dir.path()).await.unwrap();
    assert_eq!(manifest.generation, 4);
    assert_eq!(generation_dirs(dir.path()), vec!["3", "4"]);

    let loaded: IndexBundle = load(dir.path()).await.unwrap();
    assert_eq!(loaded.len(), 3);
}

#[tokio::test]
async fn stale_tmp_generation_is_cleaned_up() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("generations/7.tmp")).unwrap();
    std::fs::write(dir.path().join("generations/7.tmp/chunks.txt"), "half").unwrap();

    let manifest = persist(&built().await, dir.path()).await.unwrap();
    assert_eq!(manifest.generation, 1);
    assert_eq!(generation_dirs(dir.path()), vec!["1"]);
}

#[tokio::test]
async fn handle_reload_swaps_in_new_generation() {
    let dir = TempDir::new().unwrap();
    let (small, _): (IndexBundle, _) = build_index(&CORPUS[..1], &StubEmbedder::new(16))
        .await
        .unwrap();
    persist(&small, dir.path()).await.unwrap();

    let handle: IndexHandle = IndexHandle::open(dir.path()).await.unwrap();
    let reader = handle.snapshot();

    persist(&built().await, dir.path()).await.unwrap();
    handle.reload(dir.path()).await.unwrap();

    assert_eq!(reader.len(), 1);
    assert_eq!(handle.snapshot().len(), 3);
}

#[tokio::test]
async fn failed_persist_keeps_previous_generation() {
    let dir = TempDir::new().unwrap();
    let (small, _): (IndexBundle, _) = build_index(&CORPUS[..1], &StubEmbedder::new(16))
        .await
        .unwrap();
    persist(&small, dir.path()).await.unwrap();

    // Publishing the manifest cannot succeed over a directory.
    std::fs::create_dir(dir.path().join("manifest.json.tmp")).unwrap();
    let err = persist(&built().await, dir.path()).await.err().unwrap();
    assert!(matches!(err, IndexerError::IoError(_)), "got {err:?}");

    assert_eq!(read_manifest(dir.path()).await.unwrap().generation, 1);
    let loaded: IndexBundle = load(dir.path()).await.unwrap();
    assert_eq!(loaded.store(), small.store());
    assert_eq!(loaded.len(), 1);
}

#[tokio::test]
async fn unopenable_build_lock_fails_persist_with_io_error() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("index.lock")).unwrap();

    let err = persist(&built().await, dir.path()).await.err().unwrap();
    assert!(matches!(err, IndexerError::IoError(_)), "got {err:?}");
    assert!(!manifest_path(dir.path()).exists());
}
