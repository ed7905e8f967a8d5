use crate::ChunkStoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One retrievable unit of guideline text.
///
/// A chunk is always stored in its one-line record form: trimmed, never empty,
/// and free of line breaks. It carries no identity of its own; the owning
/// [`ChunkStore`](crate::ChunkStore) identifies it by position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Chunk(String);

impl Chunk {
    /// Normalize raw text into a chunk. Returns `None` when nothing is left after trimming.
    #[must_use]
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let mut text = String::with_capacity(trimmed.len());
        let mut chars = trimmed.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    text.push(' ');
                }
                '\n' => text.push(' '),
                other => text.push(other),
            }
        }
        Some(Self(text))
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Chunk {
    type Error = ChunkStoreError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::normalize(&raw).ok_or(ChunkStoreError::EmptyInput)
    }
}

impl From<Chunk> for String {
    fn from(chunk: Chunk) -> Self {
        chunk.0
    }
}

impl AsRef<str> for Chunk {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialized_chunks_are_normalized() {
        let chunk: Chunk = serde_json::from_str("\"  Fever\\nin infants \"").unwrap();
        assert_eq!(chunk.text(), "Fever in infants");
        assert_eq!(serde_json::to_string(&chunk).unwrap(), "\"Fever in infants\"");

        assert!(serde_json::from_str::<Chunk>("\" \\r\\n \"").is_err());
    }

    #[test]
    fn normalize_trims_and_flattens_line_breaks() {
        let chunk = Chunk::normalize("  TABLE DATA:\r\nDrug\tDose\nParacetamol\t15mg/kg\r ").unwrap();
        assert_eq!(chunk.text(), "TABLE DATA: Drug\tDose Paracetamol\t15mg/kg");
    }

    #[test]
    fn normalize_rejects_blank_text() {
        assert!(Chunk::normalize("").is_none());
        assert!(Chunk::normalize(" \n\t \r\n").is_none());
    }

    #[test]
    fn interior_blank_lines_become_one_space_each() {
        let chunk = Chunk::normalize("a\n\nb").unwrap();
        assert_eq!(chunk.text(), "a  b");
    }
}
