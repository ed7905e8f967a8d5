//! # Careguide Search
//!
//! Top-k retrieval of guideline chunks for a free-text query.
//!
//! ## Strategies
//!
//! ```text
//! query
//!   │
//!   ├──> VectorRetriever:  embed ─> VectorIndex::search ─> ChunkStore::get
//!   │
//!   └──> KeywordRetriever: lowercase words ─> substring overlap ─> rank
//!
//! results (nearest / best first) ─> join_context ─> prompt
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use careguide_indexer::{load, IndexBundle};
//! use careguide_search::{join_context, retrieve};
//! use careguide_vector_store::StubEmbedder;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bundle: IndexBundle = load(Path::new("vectorstore")).await?;
//!     let embedder = StubEmbedder::new(bundle.dimension());
//!     let chunks = retrieve("fever in infants", &bundle, &embedder, 5).await?;
//!     println!("{}", join_context(&chunks));
//!     Ok(())
//! }
//! ```

mod context;
mod error;
mod keyword;
mod retriever;

pub use context::join_context;
pub use error::{Result, SearchError};
pub use keyword::{keyword_search, KeywordRetriever};
pub use retriever::{retrieve, RetrievedChunk, Retriever, VectorRetriever};
