use crate::error::{GenerationError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Turns a fully assembled prompt into answer text.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Settings for an OpenAI-compatible `/v1/completions` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:1234/v1/completions".to_string(),
            model: "mistral".to_string(),
            max_tokens: 512,
            temperature: 0.5,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

/// HTTP client for a local completion server such as LM Studio.
///
/// Requests are sent once; failures are reported, never retried.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: Client,
    url: Url,
    config: GenerationConfig,
}

impl CompletionClient {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let url = Url::parse(&config.url)
            .map_err(|err| GenerationError::Config(format!("invalid url '{}': {err}", config.url)))?;
        if config.timeout_secs == 0 {
            return Err(GenerationError::Config("timeout_secs must be > 0".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url,
            config,
        })
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Server root the availability probe targets
    pub fn root_url(&self) -> Url {
        let mut root = self.url.clone();
        root.set_path("/");
        root.set_query(None);
        root.set_fragment(None);
        root
    }

    /// Whether the server root answers `GET /` with HTTP 200
    pub async fn is_online(&self) -> bool {
        let root = self.root_url();
        match self.client.get(root.clone()).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(err) => {
                log::debug!("Generation service probe {root} failed: {err}");
                false
            }
        }
    }
}

#[async_trait]
impl Generator for CompletionClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = CompletionRequest {
            model: &self.config.model,
            prompt,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };
        log::debug!(
            "POST {} (model {}, {} prompt bytes)",
            self.url,
            self.config.model,
            prompt.len()
        );

        let body = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let response: CompletionResponse = serde_json::from_slice(&body)
            .map_err(|err| GenerationError::MalformedResponse(err.to_string()))?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::MalformedResponse("no choices in response".to_string()))?;
        Ok(choice.text.trim().to_string())
    }
}
