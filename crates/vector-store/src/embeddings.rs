use crate::error::{Result, VectorStoreError};
use crate::onnx::OnnxEmbedder;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Maps text into a fixed-dimension vector space.
///
/// Index building and querying must use the same embedder configuration; mixing
/// models is a caller error this crate does not detect.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Dimensionality of every produced vector
    fn dimension(&self) -> usize;

    /// Identifier recorded next to persisted indexes
    fn model_id(&self) -> &str;

    /// Embed `texts`, returning exactly one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        if embeddings.len() != 1 {
            return Err(VectorStoreError::upstream(format!(
                "embedder returned {} vectors for 1 text",
                embeddings.len()
            )));
        }
        embeddings
            .pop()
            .ok_or_else(|| VectorStoreError::upstream("Empty embedding result"))
    }
}

#[async_trait]
impl<E: Embedder + ?Sized> Embedder for Arc<E> {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text).await
    }
}

/// Embed `texts` and check the one-vector-per-text, fixed-dimension contract.
pub async fn embed_all<E: Embedder + ?Sized>(embedder: &E, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let vectors = embedder.embed_batch(texts).await?;
    if vectors.len() != texts.len() {
        return Err(VectorStoreError::upstream(format!(
            "embedder '{}' returned {} vectors for {} texts",
            embedder.model_id(),
            vectors.len(),
            texts.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != embedder.dimension()) {
        return Err(VectorStoreError::DimensionMismatch {
            expected: embedder.dimension(),
            actual: bad.len(),
        });
    }
    Ok(vectors)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    /// Pretrained model through ONNX Runtime
    Onnx,
    /// Deterministic hash vectors, no model files
    Stub,
}

impl EmbeddingMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Onnx => "onnx",
            Self::Stub => "stub",
        }
    }
}

impl std::str::FromStr for EmbeddingMode {
    type Err = VectorStoreError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "onnx" => Ok(Self::Onnx),
            "stub" => Ok(Self::Stub),
            other => Err(VectorStoreError::Config(format!(
                "Unsupported embedding mode '{other}' (expected 'onnx' or 'stub')"
            ))),
        }
    }
}

/// Embedding settings shared by the index builder and the query path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub mode: EmbeddingMode,
    /// Directory holding `<model_id>/model.onnx` and `<model_id>/tokenizer.json`
    pub model_dir: PathBuf,
    pub model_id: String,
    pub dimension: usize,
    /// Token limit per text (longer input is truncated)
    pub max_length: usize,
    /// Texts per forward pass
    pub max_batch: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::Onnx,
            model_dir: PathBuf::from("models"),
            model_id: "e5-small-v2".to_string(),
            dimension: 384,
            max_length: 512,
            max_batch: 32,
        }
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(VectorStoreError::Config("dimension must be > 0".to_string()));
        }
        if self.max_batch == 0 {
            return Err(VectorStoreError::Config("max_batch must be > 0".to_string()));
        }
        if self.max_length == 0 {
            return Err(VectorStoreError::Config("max_length must be > 0".to_string()));
        }
        if self.model_id.trim().is_empty() {
            return Err(VectorStoreError::Config("model_id is empty".to_string()));
        }
        Ok(())
    }
}

/// Construct the embedder selected by `config.mode`
pub fn embedder_from_config(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    config.validate()?;
    match config.mode {
        EmbeddingMode::Stub => {
            log::debug!("Using stub embedder (dimension {})", config.dimension);
            Ok(Arc::new(StubEmbedder::new(config.dimension)))
        }
        EmbeddingMode::Onnx => Ok(Arc::new(OnnxEmbedder::load(config)?)),
    }
}

/// Deterministic embedder for tests and offline smoke runs.
///
/// Each text is hashed into a seed that drives a splitmix64 stream; the result
/// is a unit vector, so identical texts always land on identical vectors.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    dimension: usize,
    model_id: String,
}

impl StubEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_id: format!("stub-{dimension}"),
        }
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| stub_embed(text, self.dimension))
            .collect())
    }
}

pub(crate) fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        fn dimension(&self) -> usize {
            2
        }

        fn model_id(&self) -> &str {
            "short"
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().skip(1).map(|_| vec![0.0, 0.0]).collect())
        }
    }

    #[tokio::test]
    async fn stub_is_deterministic_and_unit_length() {
        let embedder = StubEmbedder::new(16);
        let a = embedder.embed("fever").await.unwrap();
        let b = embedder.embed("fever").await.unwrap();
        let c = embedder.embed("seizure").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn stub_batch_preserves_order() {
        let embedder = StubEmbedder::new(8);
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();
        for (text, vector) in texts.iter().zip(&batch) {
            assert_eq!(&embedder.embed(text).await.unwrap(), vector);
        }
    }

    #[tokio::test]
    async fn embed_all_rejects_short_batches() {
        let texts = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(
            embed_all(&ShortEmbedder, &texts).await,
            Err(VectorStoreError::Upstream(_))
        ));
        assert!(matches!(
            ShortEmbedder.embed("a").await,
            Err(VectorStoreError::Upstream(_))
        ));
    }

    #[test]
    fn embedding_mode_parses_case_insensitively() {
        assert_eq!("STUB".parse::<EmbeddingMode>().unwrap(), EmbeddingMode::Stub);
        assert_eq!(" onnx ".parse::<EmbeddingMode>().unwrap(), EmbeddingMode::Onnx);
        assert!("fast".parse::<EmbeddingMode>().is_err());
    }

    #[test]
    fn stub_config_builds_without_model_files() {
        let config = EmbeddingConfig {
            mode: EmbeddingMode::Stub,
            dimension: 12,
            ..EmbeddingConfig::default()
        };
        let embedder = embedder_from_config(&config).unwrap();
        assert_eq!(embedder.dimension(), 12);
        assert_eq!(embedder.model_id(), "stub-12");
    }

    #[test]
    fn config_validation_rejects_zero_dimension() {
        let config = EmbeddingConfig {
            mode: EmbeddingMode::Stub,
            dimension: 0,
            ..EmbeddingConfig::default()
        };
        assert!(matches!(
            embedder_from_config(&config),
            Err(VectorStoreError::Config(_))
        ));
    }
}
