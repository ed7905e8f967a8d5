use crate::embeddings::{normalize, Embedder, EmbeddingConfig};
use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use ndarray::{Array, Axis, Ix2, Ix3};
use ort::session::{builder::GraphOptimizationLevel, Session, SessionInputs};
use ort::value::{DynTensor, Tensor};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tokio::task::spawn_blocking;

const MODEL_FILE: &str = "model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// Pretrained sentence-embedding model running on ONNX Runtime (CPU).
///
/// Token embeddings are mean-pooled over the attention mask and L2-normalized.
#[derive(Clone)]
pub struct OnnxEmbedder {
    backend: Arc<OrtBackend>,
    model_id: String,
}

struct OrtBackend {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_length: usize,
    max_batch: usize,
    dimension: usize,
}

impl OnnxEmbedder {
    /// Load `<model_dir>/<model_id>/model.onnx` and its `tokenizer.json`
    pub fn load(config: &EmbeddingConfig) -> Result<Self> {
        let model_dir = config.model_dir.join(&config.model_id);
        let model_path = model_dir.join(MODEL_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);
        if !model_path.exists() || !tokenizer_path.exists() {
            return Err(VectorStoreError::Config(format!(
                "Model files for '{}' are missing. Expected ONNX at {} and tokenizer at {}.",
                config.model_id,
                model_path.display(),
                tokenizer_path.display(),
            )));
        }

        let backend = OrtBackend::new(config, &model_path, &tokenizer_path)?;
        Ok(Self {
            backend: Arc::new(backend),
            model_id: config.model_id.clone(),
        })
    }
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    fn dimension(&self) -> usize {
        self.backend.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let owned = texts.to_vec();
        let backend = self.backend.clone();
        spawn_blocking(move || backend.embed_batch_blocking(&owned))
            .await
            .map_err(VectorStoreError::upstream)?
    }
}

impl OrtBackend {
    fn new(config: &EmbeddingConfig, model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
        if !tokenizers::utils::parallelism::is_parallelism_configured() {
            tokenizers::utils::parallelism::set_parallelism(false);
        }

        let mut tokenizer =
            Tokenizer::from_file(tokenizer_path).map_err(VectorStoreError::upstream)?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..PaddingParams::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_length,
                ..TruncationParams::default()
            }))
            .map_err(VectorStoreError::upstream)?;

        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get().min(4))
            .unwrap_or(1);
        let session = Session::builder()
            .map_err(VectorStoreError::upstream)?
            .with_intra_threads(intra_threads)
            .map_err(VectorStoreError::upstream)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(VectorStoreError::upstream)?
            .commit_from_file(model_path)
            .map_err(VectorStoreError::upstream)?;

        log::info!(
            "Loaded ONNX model '{}' (dim {}, max_length {}, batch {})",
            config.model_id,
            config.dimension,
            config.max_length,
            config.max_batch
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_length: config.max_length,
            max_batch: config.max_batch,
            dimension: config.dimension,
        })
    }

    fn embed_batch_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.max_batch) {
            let encodings = self
                .tokenizer
                .encode_batch(batch.to_vec(), true)
                .map_err(VectorStoreError::upstream)?;

            let Some(seq_len) = encodings.first().map(Encoding::len) else {
                continue;
            };
            if seq_len > self.max_length || encodings.iter().any(|e| e.len() != seq_len) {
                return Err(VectorStoreError::upstream(format!(
                    "tokenized batch has inconsistent lengths (max_length {})",
                    self.max_length
                )));
            }
            let (ids, masks, type_ids, mask_rows) = build_flat_tensors(&encodings, seq_len);

            let shape = (batch.len(), seq_len);
            let ids_array = Array::from_shape_vec(shape, ids).map_err(VectorStoreError::upstream)?;
            let mask_array =
                Array::from_shape_vec(shape, masks).map_err(VectorStoreError::upstream)?;
            let type_array =
                Array::from_shape_vec(shape, type_ids).map_err(VectorStoreError::upstream)?;

            let mut available: HashMap<String, DynTensor> = HashMap::new();
            available.insert(
                "input_ids".to_string(),
                Tensor::from_array(ids_array.into_dyn())
                    .map_err(VectorStoreError::upstream)?
                    .upcast(),
            );
            available.insert(
                "attention_mask".to_string(),
                Tensor::from_array(mask_array.into_dyn())
                    .map_err(VectorStoreError::upstream)?
                    .upcast(),
            );
            available.insert(
                "token_type_ids".to_string(),
                Tensor::from_array(type_array.into_dyn())
                    .map_err(VectorStoreError::upstream)?
                    .upcast(),
            );

            let array = {
                let mut session = self
                    .session
                    .lock()
                    .map_err(|_| VectorStoreError::upstream("ONNX session lock poisoned"))?;

                let mut feed: HashMap<String, DynTensor> = HashMap::new();
                for input in &session.inputs {
                    let value = available.remove(&input.name).ok_or_else(|| {
                        VectorStoreError::upstream(format!(
                            "model expects unsupported input '{}'",
                            input.name
                        ))
                    })?;
                    feed.insert(input.name.clone(), value);
                }

                let outputs = session
                    .run(SessionInputs::from(feed))
                    .map_err(VectorStoreError::upstream)?;
                if outputs.len() == 0 {
                    return Err(VectorStoreError::upstream("ONNX returned no outputs"));
                }

                let array = outputs[0]
                    .try_extract_array::<f32>()
                    .map_err(VectorStoreError::upstream)?
                    .to_owned();

                drop(outputs);
                drop(session);

                array
            };
            results.extend(embeddings_from_output(array, &mask_rows, self.dimension)?);
        }

        Ok(results)
    }
}

fn embeddings_from_output(
    array: ndarray::ArrayD<f32>,
    mask_rows: &[Vec<i64>],
    expected_dimension: usize,
) -> Result<Vec<Vec<f32>>> {
    let pooled: Vec<Vec<f32>> = match array.ndim() {
        2 => array
            .into_dimensionality::<Ix2>()
            .map_err(VectorStoreError::upstream)?
            .outer_iter()
            .map(|row| row.to_vec())
            .collect(),
        3 => {
            let hidden = array
                .into_dimensionality::<Ix3>()
                .map_err(VectorStoreError::upstream)?;
            hidden
                .outer_iter()
                .enumerate()
                .map(|(idx, sample)| {
                    let ones = vec![1; sample.len_of(Axis(0))];
                    let mask = mask_rows.get(idx).unwrap_or(&ones);
                    mean_pool(sample, mask)
                })
                .collect()
        }
        other => {
            return Err(VectorStoreError::upstream(format!(
                "unexpected ONNX output rank {other}"
            )));
        }
    };

    pooled
        .into_iter()
        .map(|mut emb| {
            if emb.len() != expected_dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: expected_dimension,
                    actual: emb.len(),
                });
            }
            normalize(&mut emb);
            Ok(emb)
        })
        .collect()
}

fn mean_pool(sample: ndarray::ArrayView2<'_, f32>, mask: &[i64]) -> Vec<f32> {
    let hidden = sample.len_of(Axis(1));
    let mut sum = vec![0.0f32; hidden];
    let mut count = 0.0f32;

    for (token_idx, token) in sample.outer_iter().enumerate() {
        if mask.get(token_idx).copied().unwrap_or(0) == 0 {
            continue;
        }
        count += 1.0;
        for (dim, value) in token.iter().enumerate() {
            sum[dim] += value;
        }
    }

    if count > 0.0 {
        for value in &mut sum {
            *value /= count;
        }
    }
    sum
}

fn build_flat_tensors(
    encodings: &[Encoding],
    seq_len: usize,
) -> (Vec<i64>, Vec<i64>, Vec<i64>, Vec<Vec<i64>>) {
    let mut ids = Vec::with_capacity(encodings.len() * seq_len);
    let mut masks = Vec::with_capacity(encodings.len() * seq_len);
    let mut type_ids = Vec::with_capacity(encodings.len() * seq_len);
    let mut mask_rows = Vec::with_capacity(encodings.len());

    for encoding in encodings {
        let encoding_ids = encoding.get_ids();
        let encoding_masks = encoding.get_attention_mask();
        let encoding_types = encoding.get_type_ids();

        for idx in 0..seq_len {
            ids.push(i64::from(*encoding_ids.get(idx).unwrap_or(&0)));
            masks.push(i64::from(*encoding_masks.get(idx).unwrap_or(&0)));
            type_ids.push(i64::from(*encoding_types.get(idx).unwrap_or(&0)));
        }

        mask_rows.push(
            encoding_masks
                .iter()
                .take(seq_len)
                .map(|v| i64::from(*v))
                .collect(),
        );
    }

    (ids, masks, type_ids, mask_rows)
}
