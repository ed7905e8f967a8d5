//! # Careguide Generation
//!
//! Assembles the clinical prompt from retrieved context and sends it to an
//! OpenAI-compatible completion server.
//!
//! ```no_run
//! use careguide_generation::{ClinicalPrompt, CompletionClient, GenerationConfig, Generator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = CompletionClient::new(GenerationConfig::default())?;
//!     if client.is_online().await {
//!         let prompt = ClinicalPrompt::render("Fever threshold?", "Fever is >= 38C.");
//!         println!("{}", client.generate(&prompt).await?);
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod prompt;

pub use client::{CompletionClient, GenerationConfig, Generator};
pub use error::{GenerationError, Result};
pub use prompt::ClinicalPrompt;
