//! # Careguide Indexer
//!
//! Builds the chunk/vector pair for a guideline corpus, persists it as one
//! atomic generation and loads it back for querying.
//!
//! ## Pipeline
//!
//! ```text
//! Raw chunks
//!     │
//!     ├──> ChunkStore (trim, drop empty, positions 0..N)
//!     │
//!     ├──> Embedder (batch, in order)
//!     │      └─> VectorIndex::build
//!     │
//!     └──> persist (index.lock held)
//!            ├─> generations/<n>.tmp/{chunks.txt,index.bin} + fsync
//!            ├─> rename to generations/<n>
//!            └─> manifest.json (publish), prune older generations
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use careguide_indexer::{build_index, load, persist, IndexBundle};
//! use careguide_vector_store::StubEmbedder;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let embedder = StubEmbedder::new(384);
//!     let raw = ["Fever management in infants.", "Dehydration assessment."];
//!     let (bundle, stats): (IndexBundle, _) = build_index(&raw, &embedder).await?;
//!     persist(&bundle, Path::new("vectorstore")).await?;
//!
//!     let loaded: IndexBundle = load(Path::new("vectorstore")).await?;
//!     println!("{} chunks ({} dropped)", loaded.len(), stats.dropped_chunks);
//!     Ok(())
//! }
//! ```

mod bundle;
mod error;
mod handle;
mod lock;
mod persist;
mod stats;

pub use bundle::{build_index, IndexBundle};
pub use error::{IndexerError, Result};
pub use handle::IndexHandle;
pub use persist::{
    decode_pair, load, manifest_path, persist, read_manifest, Manifest, MANIFEST_SCHEMA_VERSION,
};
pub use stats::BuildStats;
