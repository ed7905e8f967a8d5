use crate::bundle::IndexBundle;
use crate::error::{IndexerError, Result};
use crate::lock::acquire_build_lock;
use careguide_chunk_store::ChunkStore;
use careguide_vector_store::VectorIndex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;

pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

const MANIFEST_FILE_NAME: &str = "manifest.json";
const GENERATIONS_DIR_NAME: &str = "generations";
const CHUNKS_FILE_NAME: &str = "chunks.txt";
const INDEX_FILE_NAME: &str = "index.bin";
const TMP_SUFFIX: &str = ".tmp";

/// Publish marker naming the live artifact generation of an index directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: u32,
    pub generation: u64,
    pub dimension: usize,
    pub vector_count: usize,
    pub chunk_count: usize,
    pub chunks_sha256: String,
    pub index_sha256: String,
    pub model_id: String,
    pub built_at_unix_ms: u64,
}

impl Manifest {
    /// Directory holding this generation's artifacts under `root`
    pub fn generation_dir(&self, root: &Path) -> PathBuf {
        generations_dir(root).join(self.generation.to_string())
    }

    pub fn chunks_path(&self, root: &Path) -> PathBuf {
        self.generation_dir(root).join(CHUNKS_FILE_NAME)
    }

    pub fn index_path(&self, root: &Path) -> PathBuf {
        self.generation_dir(root).join(INDEX_FILE_NAME)
    }
}

pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILE_NAME)
}

fn generations_dir(root: &Path) -> PathBuf {
    root.join(GENERATIONS_DIR_NAME)
}

/// Write `bundle` under `destination` as a new generation and publish it.
///
/// Readers see either the previous pair or the new one, never a mix: the
/// artifacts are complete on disk before `manifest.json` is replaced.
pub async fn persist<I: VectorIndex>(bundle: &IndexBundle<I>, destination: &Path) -> Result<Manifest> {
    let _lock = acquire_build_lock(destination).await?;

    let previous = match read_manifest(destination).await {
        Ok(manifest) => Some(manifest),
        Err(IndexerError::NotFound(_)) => None,
        Err(IndexerError::CorruptData(msg)) => {
            log::warn!("Replacing unreadable manifest in {}: {msg}", destination.display());
            None
        }
        Err(err) => return Err(err),
    };

    let generations = generations_dir(destination);
    tokio::fs::create_dir_all(&generations).await?;
    let generation = next_generation(&generations, previous.as_ref()).await?;

    let chunks_text = bundle.store().to_artifact();
    let index_bytes = bundle.index().to_bytes();
    let manifest = Manifest {
        schema_version: MANIFEST_SCHEMA_VERSION,
        generation,
        dimension: bundle.dimension(),
        vector_count: bundle.index().len(),
        chunk_count: bundle.store().len(),
        chunks_sha256: sha256_hex(chunks_text.as_bytes()),
        index_sha256: sha256_hex(&index_bytes),
        model_id: bundle.model_id().to_string(),
        built_at_unix_ms: unix_now_ms(),
    };

    let final_dir = manifest.generation_dir(destination);
    let tmp_dir = generations.join(format!("{generation}{TMP_SUFFIX}"));
    if tokio::fs::try_exists(&tmp_dir).await? {
        tokio::fs::remove_dir_all(&tmp_dir).await?;
    }
    tokio::fs::create_dir_all(&tmp_dir).await?;
    write_synced(&tmp_dir.join(CHUNKS_FILE_NAME), chunks_text.as_bytes()).await?;
    write_synced(&tmp_dir.join(INDEX_FILE_NAME), &index_bytes).await?;
    tokio::fs::rename(&tmp_dir, &final_dir).await?;
    sync_dir(&generations).await;

    let bytes = serde_json::to_vec_pretty(&manifest)?;
    let path = manifest_path(destination);
    let tmp = path.with_extension("json.tmp");
    write_synced(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, &path).await?;
    sync_dir(destination).await;

    log::info!(
        "Persisted generation {} ({} chunks, dim {}) to {}",
        manifest.generation,
        manifest.chunk_count,
        manifest.dimension,
        destination.display()
    );

    let keep_previous = previous.map(|m| m.generation);
    prune_generations(&generations, generation, keep_previous).await;
    Ok(manifest)
}

/// Read the published manifest without touching the artifacts
pub async fn read_manifest(source: &Path) -> Result<Manifest> {
    let path = manifest_path(source);
    let bytes = read_artifact(&path).await?;
    let manifest: Manifest = serde_json::from_slice(&bytes)
        .map_err(|err| IndexerError::corrupt(format!("parse {}: {err}", path.display())))?;
    if manifest.schema_version != MANIFEST_SCHEMA_VERSION {
        return Err(IndexerError::corrupt(format!(
            "unsupported manifest schema version {} (expected {})",
            manifest.schema_version, MANIFEST_SCHEMA_VERSION
        )));
    }
    Ok(manifest)
}

/// Load the published pair from `source`, verifying digests and counts.
pub async fn load<I: VectorIndex>(source: &Path) -> Result<IndexBundle<I>> {
    let manifest = read_manifest(source).await?;
    match load_generation(source, &manifest).await {
        Err(IndexerError::NotFound(missing)) => {
            // A concurrent persist may have published and pruned in between.
            let current = read_manifest(source).await?;
            if current.generation == manifest.generation {
                return Err(IndexerError::NotFound(missing));
            }
            log::debug!(
                "Generation {} vanished during load, retrying with {}",
                manifest.generation,
                current.generation
            );
            load_generation(source, &current).await
        }
        other => other,
    }
}

async fn load_generation<I: VectorIndex>(source: &Path, manifest: &Manifest) -> Result<IndexBundle<I>> {
    let chunks_path = manifest.chunks_path(source);
    let index_path = manifest.index_path(source);
    let chunk_bytes = read_artifact(&chunks_path).await?;
    let index_bytes = read_artifact(&index_path).await?;

    verify_digest(&chunks_path, &chunk_bytes, &manifest.chunks_sha256)?;
    verify_digest(&index_path, &index_bytes, &manifest.index_sha256)?;

    let chunk_text = String::from_utf8(chunk_bytes).map_err(|err| {
        IndexerError::corrupt(format!("{} is not UTF-8: {err}", chunks_path.display()))
    })?;
    let bundle: IndexBundle<I> = decode_pair(&chunk_text, &index_bytes)?;

    if bundle.index().len() != manifest.vector_count
        || bundle.store().len() != manifest.chunk_count
        || bundle.dimension() != manifest.dimension
    {
        return Err(IndexerError::corrupt(format!(
            "generation {} disagrees with its manifest ({} chunks, {} vectors, dim {})",
            manifest.generation,
            bundle.store().len(),
            bundle.index().len(),
            bundle.dimension()
        )));
    }

    log::info!(
        "Loaded generation {} ({} chunks, dim {}) from {}",
        manifest.generation,
        bundle.len(),
        bundle.dimension(),
        source.display()
    );
    Ok(bundle.with_model_id(manifest.model_id.clone()))
}

/// Decode raw artifact contents into a bundle, checking the pair agrees.
pub fn decode_pair<I: VectorIndex>(chunk_text: &str, index_bytes: &[u8]) -> Result<IndexBundle<I>> {
    let store = ChunkStore::from_artifact(chunk_text)?;
    let index = I::from_bytes(index_bytes)?;
    IndexBundle::new(store, index)
}

async fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            Err(IndexerError::NotFound(path.display().to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

fn verify_digest(path: &Path, bytes: &[u8], expected: &str) -> Result<()> {
    let actual = sha256_hex(bytes);
    if actual != expected {
        return Err(IndexerError::corrupt(format!(
            "{} digest mismatch (manifest {expected}, file {actual})",
            path.display()
        )));
    }
    Ok(())
}

async fn next_generation(generations: &Path, previous: Option<&Manifest>) -> Result<u64> {
    let mut latest = previous.map_or(0, |m| m.generation);
    let mut entries = tokio::fs::read_dir(generations).await?;
    while let Some(entry) = entries.next_entry().await? {
        if let Some(generation) = entry.file_name().to_str().and_then(|n| n.parse::<u64>().ok()) {
            latest = latest.max(generation);
        }
    }
    latest.checked_add(1).ok_or_else(|| {
        IndexerError::corrupt(format!(
            "generation counter exhausted in {}",
            generations.display()
        ))
    })
}

async fn prune_generations(generations: &Path, current: u64, previous: Option<u64>) {
    let mut entries = match tokio::fs::read_dir(generations).await {
        Ok(entries) => entries,
        Err(err) => {
            log::warn!("Skipping prune of {}: {err}", generations.display());
            return;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                log::warn!("Stopped pruning {}: {err}", generations.display());
                break;
            }
        };
        let keep = entry
            .file_name()
            .to_str()
            .and_then(|n| n.parse::<u64>().ok())
            .is_some_and(|g| g == current || Some(g) == previous);
        if keep {
            continue;
        }

        let path = entry.path();
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => log::debug!("Pruned {}", path.display()),
            Err(err) => log::warn!("Failed to prune {}: {err}", path.display()),
        }
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

// Directory fsync is unsupported on some platforms; the rename already happened.
async fn sync_dir(dir: &Path) {
    let dir = dir.to_path_buf();
    let result = tokio::task::spawn_blocking(move || std::fs::File::open(&dir)?.sync_all()).await;
    if let Ok(Err(err)) = result {
        log::debug!("Directory sync skipped: {err}");
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
