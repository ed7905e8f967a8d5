use anyhow::{bail, Context, Result};
use careguide_generation::GenerationConfig;
use careguide_vector_store::EmbeddingConfig;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "careguide.toml";

pub const ENV_CONFIG: &str = "CAREGUIDE_CONFIG";
pub const ENV_INDEX_DIR: &str = "CAREGUIDE_INDEX_DIR";
pub const ENV_EMBEDDING_MODE: &str = "CAREGUIDE_EMBEDDING_MODE";
pub const ENV_MODEL_DIR: &str = "CAREGUIDE_MODEL_DIR";
pub const ENV_EMBEDDING_MODEL: &str = "CAREGUIDE_EMBEDDING_MODEL";
pub const ENV_GENERATION_URL: &str = "CAREGUIDE_GENERATION_URL";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Embed the query and rank by vector distance
    #[default]
    Vector,
    /// Rank by query-word overlap, no embedder needed
    Keyword,
}

impl Strategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Keyword => "keyword",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexSection {
    pub dir: PathBuf,
}

impl Default for IndexSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("vectorstore"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrievalSection {
    pub top_k: usize,
    pub strategy: Strategy,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            top_k: 5,
            strategy: Strategy::Vector,
        }
    }
}

/// Settings from `careguide.toml`, environment and flags, in rising precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CareguideConfig {
    pub index: IndexSection,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalSection,
    pub generation: GenerationConfig,
}

impl CareguideConfig {
    /// Read the config file (explicit path, `CAREGUIDE_CONFIG`, or
    /// `./careguide.toml` when present) and apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_with(explicit, |key| std::env::var(key).ok())
    }

    fn load_with(explicit: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| env(ENV_CONFIG).map(PathBuf::from));

        let mut config = match named {
            Some(path) => Self::from_file(&path)?,
            None => {
                let default_path = Path::new(CONFIG_FILE_NAME);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(env)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = non_empty(env(ENV_INDEX_DIR)) {
            self.index.dir = PathBuf::from(dir);
        }
        if let Some(mode) = non_empty(env(ENV_EMBEDDING_MODE)) {
            self.embedding.mode = mode
                .parse()
                .with_context(|| format!("Invalid {ENV_EMBEDDING_MODE}"))?;
        }
        if let Some(dir) = non_empty(env(ENV_MODEL_DIR)) {
            self.embedding.model_dir = PathBuf::from(dir);
        }
        if let Some(model) = non_empty(env(ENV_EMBEDDING_MODEL)) {
            self.embedding.model_id = model;
        }
        if let Some(url) = non_empty(env(ENV_GENERATION_URL)) {
            self.generation.url = url;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.embedding.validate()?;
        if self.index.dir.as_os_str().is_empty() {
            bail!("index.dir is empty");
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
