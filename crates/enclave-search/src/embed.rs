//! Embedding providers.
//!
//! A [`VectorSource`] turns text into a vector. The index client never
//! depends on one; callers embed first and hand the vector over.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::{EmbedError, EmbedResult};
use crate::resilience::RetryPolicy;

const USER_AGENT: &str = "enclave/0.1.0 (https://github.com/oxur/enclave)";

/// Anything that can embed text into a fixed-length vector.
#[async_trait]
pub trait VectorSource: Send + Sync {
    async fn embed(&self, text: &str) -> EmbedResult<Vec<f32>>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Settings for an [`AzureOpenAiEmbedder`].
#[derive(Clone)]
pub struct EmbedderConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl EmbedderConfig {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            deployment: deployment.into(),
            api_version: "2023-05-15".to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl fmt::Debug for EmbedderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbedderConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Embeddings from an Azure OpenAI model deployment.
///
/// Calls `POST {endpoint}/openai/deployments/{deployment}/embeddings` with
/// an `api-key` header and returns the first embedding of the response.
#[derive(Clone)]
pub struct AzureOpenAiEmbedder {
    http: Client,
    url: Url,
    api_key: String,
    retry: RetryPolicy,
}

impl fmt::Debug for AzureOpenAiEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureOpenAiEmbedder")
            .field("url", &self.url.as_str())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl AzureOpenAiEmbedder {
    /// Create an embedder for the deployment described by `config`.
    ///
    /// # Errors
    /// Returns [`EmbedError::Config`] for an unusable endpoint and
    /// [`EmbedError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: EmbedderConfig) -> EmbedResult<Self> {
        let url = embeddings_url(&config.endpoint, &config.deployment, &config.api_version)?;
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            url,
            api_key: config.api_key,
            retry: config.retry,
        })
    }

    async fn call_api(&self, text: &str) -> EmbedResult<Vec<f32>> {
        let response = self
            .http
            .post(self.url.clone())
            .header("api-key", &self.api_key)
            .json(&EmbeddingRequest { input: text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(EmbedError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| EmbedError::Parse {
            message: e.to_string(),
        })?;

        parsed
            .data
            .into_iter()
            .min_by_key(|d| d.index)
            .map(|d| d.embedding)
            .filter(|embedding| !embedding.is_empty())
            .ok_or(EmbedError::Empty)
    }
}

#[async_trait]
impl VectorSource for AzureOpenAiEmbedder {
    async fn embed(&self, text: &str) -> EmbedResult<Vec<f32>> {
        let embedding = self.retry.run("embed", || self.call_api(text)).await?;
        log::debug!("Embedded {} chars into {} dimensions", text.len(), embedding.len());
        Ok(embedding)
    }
}

fn embeddings_url(endpoint: &str, deployment: &str, api_version: &str) -> EmbedResult<Url> {
    let mut url = Url::parse(endpoint.trim()).map_err(|e| EmbedError::Config {
        message: format!("invalid embedding endpoint {:?}: {}", endpoint, e),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(EmbedError::Config {
            message: format!("embedding endpoint must be http or https: {:?}", endpoint),
        });
    }
    if deployment.trim().is_empty() {
        return Err(EmbedError::Config {
            message: "embedding deployment name is empty".to_string(),
        });
    }

    url.path_segments_mut()
        .map_err(|()| EmbedError::Config {
            message: format!("embedding endpoint cannot be a base URL: {:?}", endpoint),
        })?
        .pop_if_empty()
        .extend(["openai", "deployments", deployment, "embeddings"]);
    url.query_pairs_mut().append_pair("api-version", api_version);
    Ok(url)
}
