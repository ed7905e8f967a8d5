use crate::error::{ChunkStoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Header that marks a chunk rendered from a table
pub const TABLE_PREFIX: &str = "TABLE DATA:\n";

const PAGE_BREAK: char = '\u{000C}';

/// One extracted unit of a source document, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentUnit {
    /// Running text of a page
    Text(String),
    /// A table; `None` marks a cell the extractor could not read
    Table(Vec<Vec<Option<String>>>),
}

impl DocumentUnit {
    /// Render the unit as raw chunk text.
    ///
    /// Tables become tab-separated rows under [`TABLE_PREFIX`]; rows whose
    /// cells are all missing or empty are skipped.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Table(rows) => {
                let body = rows
                    .iter()
                    .filter(|row| {
                        row.iter()
                            .any(|cell| cell.as_deref().is_some_and(|c| !c.is_empty()))
                    })
                    .map(|row| {
                        row.iter()
                            .map(|cell| cell.as_deref().unwrap_or(""))
                            .collect::<Vec<_>>()
                            .join("\t")
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("{TABLE_PREFIX}{body}")
            }
        }
    }
}

/// Page-structured dump of an already extracted document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    #[serde(default)]
    pub pages: Vec<ExtractedPage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub tables: Vec<Vec<Vec<Option<String>>>>,
}

impl ExtractedDocument {
    /// Split plain text into pages on form-feed characters
    #[must_use]
    pub fn from_plain_text(text: &str) -> Self {
        let pages = text
            .split(PAGE_BREAK)
            .map(|page| ExtractedPage {
                text: Some(page.to_string()),
                tables: Vec::new(),
            })
            .collect();
        Self { pages }
    }

    /// Units in document order: each page's text, then that page's tables
    #[must_use]
    pub fn units(&self) -> Vec<DocumentUnit> {
        let mut units = Vec::new();
        for page in &self.pages {
            if let Some(text) = page.text.as_ref().filter(|t| !t.is_empty()) {
                units.push(DocumentUnit::Text(text.clone()));
            }
            for table in &page.tables {
                units.push(DocumentUnit::Table(table.clone()));
            }
        }
        units
    }

    /// Raw chunk text for every unit, ready for `ChunkStore::from_raw`
    #[must_use]
    pub fn raw_chunks(&self) -> Vec<String> {
        self.units().iter().map(DocumentUnit::render).collect()
    }
}

/// Read an extracted document and return its raw chunks in document order.
///
/// `*.json` files are parsed as [`ExtractedDocument`]; anything else is read as
/// UTF-8 text with form-feed page breaks.
pub async fn load_document(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let document = if is_json {
        serde_json::from_slice::<ExtractedDocument>(&bytes).map_err(|err| {
            ChunkStoreError::parse(format!("{}: {err}", path.display()))
        })?
    } else {
        let text = String::from_utf8(bytes).map_err(|err| {
            ChunkStoreError::parse(format!("{}: not valid UTF-8 ({err})", path.display()))
        })?;
        ExtractedDocument::from_plain_text(&text)
    };

    let chunks = document.raw_chunks();
    log::info!(
        "Extracted {} text/table chunks from {} pages of {}",
        chunks.len(),
        document.pages.len(),
        path.display()
    );
    Ok(chunks)
}
