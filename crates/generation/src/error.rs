use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenerationError>;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation service request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("Generation configuration error: {0}")]
    Config(String),
}
