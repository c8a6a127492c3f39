use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::embed::EmbedderConfig;
use crate::index::IndexClientConfig;
use crate::resilience::RetryPolicy;

/// Configuration for enclave.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. Environment variables (ENCLAVE_* prefix, highest priority)
/// 2. Config file (~/.config/enclave/config.toml, or `--config`)
/// 3. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the search backend.
    ///
    /// Can be set via:
    /// - ENV: ENCLAVE_SEARCH_ENDPOINT
    /// - Config: search_endpoint = "https://..."
    pub search_endpoint: Option<String>,

    /// Admin key sent as the `api-key` header.
    ///
    /// Can be set via:
    /// - ENV: ENCLAVE_SEARCH_API_KEY
    /// - Config: search_api_key = "..."
    pub search_api_key: Option<String>,

    /// Value of the `api-version` query parameter.
    #[serde(default = "default_search_api_version")]
    pub search_api_version: String,

    /// Dimensionality of the embedding model; fixed when an index is created.
    #[serde(default = "default_vector_dimensions")]
    pub vector_dimensions: usize,

    /// Per-request timeout for both the search backend and the embedder.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries for transient failures (throttling, gateway errors, timeouts).
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Base URL of the embedding provider.
    ///
    /// Can be set via:
    /// - ENV: ENCLAVE_EMBEDDING_ENDPOINT
    /// - Config: embedding_endpoint = "https://..."
    pub embedding_endpoint: Option<String>,

    /// Key for the embedding provider.
    ///
    /// Can be set via:
    /// - ENV: ENCLAVE_EMBEDDING_API_KEY
    /// - Config: embedding_api_key = "..."
    pub embedding_api_key: Option<String>,

    /// Name of the embedding model deployment.
    ///
    /// Can be set via:
    /// - ENV: ENCLAVE_EMBEDDING_DEPLOYMENT
    /// - Config: embedding_deployment = "..."
    pub embedding_deployment: Option<String>,

    #[serde(default = "default_embedding_api_version")]
    pub embedding_api_version: String,

    /// Logger options passed to twyg.
    #[serde(default)]
    pub logging: twyg::Opts,
}

fn default_search_api_version() -> String {
    "2023-11-01".to_string()
}

fn default_vector_dimensions() -> usize {
    1536
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> usize {
    3
}

fn default_embedding_api_version() -> String {
    "2023-05-15".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_endpoint: None,
            search_api_key: None,
            search_api_version: default_search_api_version(),
            vector_dimensions: default_vector_dimensions(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            embedding_endpoint: None,
            embedding_api_key: None,
            embedding_deployment: None,
            embedding_api_version: default_embedding_api_version(),
            logging: twyg::Opts::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default config file and environment.
    ///
    /// Searches for config file at: ~/.config/enclave/config.toml
    /// Reads environment variables with ENCLAVE_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from `config_path` (skipped if it does not exist)
    /// and environment variables.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("enclave");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder
            .build()
            .context("Failed to build configuration")?;

        Ok(config)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn retry(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_retries(self.max_retries)
    }

    /// Settings for the search backend client.
    ///
    /// # Errors
    ///
    /// Returns an error naming the missing setting if the endpoint or key is
    /// not configured.
    pub fn index_client_config(&self) -> Result<IndexClientConfig> {
        let endpoint = required(&self.search_endpoint, "search_endpoint", "ENCLAVE_SEARCH_ENDPOINT")?;
        let api_key = required(&self.search_api_key, "search_api_key", "ENCLAVE_SEARCH_API_KEY")?;

        Ok(
            IndexClientConfig::new(endpoint, api_key, self.search_api_version.clone())
                .with_dimensions(self.vector_dimensions)
                .with_timeout(self.timeout())
                .with_retry(self.retry()),
        )
    }

    /// Settings for the embedding provider.
    ///
    /// # Errors
    ///
    /// Returns an error naming the missing setting if the endpoint, key or
    /// deployment is not configured.
    pub fn embedder_config(&self) -> Result<EmbedderConfig> {
        let endpoint = required(
            &self.embedding_endpoint,
            "embedding_endpoint",
            "ENCLAVE_EMBEDDING_ENDPOINT",
        )?;
        let api_key = required(
            &self.embedding_api_key,
            "embedding_api_key",
            "ENCLAVE_EMBEDDING_API_KEY",
        )?;
        let deployment = required(
            &self.embedding_deployment,
            "embedding_deployment",
            "ENCLAVE_EMBEDDING_DEPLOYMENT",
        )?;

        Ok(EmbedderConfig::new(endpoint, api_key, deployment)
            .with_api_version(self.embedding_api_version.clone())
            .with_timeout(self.timeout())
            .with_retry(self.retry()))
    }
}

fn required(value: &Option<String>, key: &str, env_var: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => anyhow::bail!(
            "{} is not set\n\nSet {} or add `{} = \"...\"` to {}",
            key,
            env_var,
            key,
            config_file_path().display()
        ),
    }
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/enclave/config.toml
/// - macOS: ~/Library/Application Support/enclave/config.toml
/// - Windows: %APPDATA%\enclave\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("enclave")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Enclave Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. Environment variables (ENCLAVE_* prefix)
# 2. This config file
# 3. Built-in defaults (lowest priority)

# Search backend endpoint and admin key
#
# Can also be set via:
# - Environment: ENCLAVE_SEARCH_ENDPOINT=https://<service>.search.windows.net
# - Environment: ENCLAVE_SEARCH_API_KEY=your-key-here
search_endpoint = "https://your-service.search.windows.net"
search_api_key = "your-search-api-key-here"

# REST API version sent as ?api-version=
search_api_version = "2023-11-01"

# Embedding dimensionality. Every tenant index is created with this many
# dimensions and every vector is checked against it before it is sent.
vector_dimensions = 1536

# Per-request timeout and retries for transient failures
request_timeout_secs = 30
max_retries = 3

# Embedding provider (Azure OpenAI deployment)
#
# Can also be set via:
# - Environment: ENCLAVE_EMBEDDING_ENDPOINT, ENCLAVE_EMBEDDING_API_KEY,
#   ENCLAVE_EMBEDDING_DEPLOYMENT
embedding_endpoint = "https://your-resource.openai.azure.com"
embedding_api_key = "your-embedding-api-key-here"
embedding_deployment = "text-embedding-ada-002"
embedding_api_version = "2023-05-15"
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    ensure_config_file_at(&config_file_path())
}

/// Create the example config at `config_path` if nothing is there yet.
pub fn ensure_config_file_at(config_path: &Path) -> Result<bool> {
    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
