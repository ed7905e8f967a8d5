//! # Careguide Vector Store
//!
//! Embedding capability and exact nearest-neighbor search for guideline chunks.
//!
//! ## Architecture
//!
//! ```text
//! chunk texts / query
//!     │
//!     ├──> Embedder (ONNX e5-small-v2 or deterministic stub)
//!     │      └─> Vec<f32>[D]
//!     │
//!     └──> VectorIndex (FlatL2Index: N x D matrix)
//!            ├─> search: squared L2, bounded heap, ties by position
//!            └─> to_bytes / from_bytes (CGV1 artifact)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use careguide_vector_store::{FlatL2Index, VectorIndex};
//!
//! let index = FlatL2Index::build(vec![vec![0.0, 0.0], vec![1.0, 1.0]]).unwrap();
//! let hits = index.search(&[0.9, 0.9], 1).unwrap();
//! assert_eq!(hits[0].position, 1);
//! ```

mod codec;
mod embeddings;
mod error;
mod flat_index;
mod index;
mod onnx;
mod types;

pub use embeddings::{
    embed_all, embedder_from_config, Embedder, EmbeddingConfig, EmbeddingMode, StubEmbedder,
};
pub use error::{BoxError, Result, VectorStoreError};
pub use flat_index::FlatL2Index;
pub use index::VectorIndex;
pub use onnx::OnnxEmbedder;
pub use types::Neighbor;
