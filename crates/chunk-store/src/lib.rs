//! # Careguide Chunk Store
//!
//! The ordered, immutable collection of text chunks that retrieval returns.
//!
//! ## Pipeline
//!
//! ```text
//! Extracted document (JSON pages / form-feed text)
//!     │
//!     ├──> Document units (page text, tables)
//!     │      └─> Raw chunks in document order
//!     │
//!     └──> ChunkStore::from_raw
//!            ├─> trim, drop empty
//!            ├─> normalize line breaks to spaces
//!            └─> dense positions 0..N
//! ```
//!
//! ## Example
//!
//! ```rust
//! use careguide_chunk_store::ChunkStore;
//!
//! let store = ChunkStore::from_raw(vec![
//!     "Fever management in infants.".to_string(),
//!     "   ".to_string(),
//!     "TABLE DATA:\nDrug\tDose".to_string(),
//! ])
//! .unwrap();
//!
//! assert_eq!(store.len(), 2);
//! assert_eq!(store.get(1).unwrap().text(), "TABLE DATA: Drug\tDose");
//! ```

mod document;
mod error;
mod store;
mod types;

pub use document::{load_document, DocumentUnit, ExtractedDocument, ExtractedPage, TABLE_PREFIX};
pub use error::{ChunkStoreError, Result};
pub use store::ChunkStore;
pub use types::Chunk;
