pub mod config;
pub mod index;
pub mod ingest;
pub mod query;

use anyhow::{Context, Result};
use enclave_core::TenantId;
use enclave_search::{AzureOpenAiEmbedder, Config, TenantIndexClient};

pub use index::{count_documents, create_index, delete_index};
pub use ingest::{run_ingest, IngestRequest};
pub use query::{run_query, QueryRequest};

fn parse_tenant(tenant: &str) -> Result<TenantId> {
    TenantId::new(tenant).with_context(|| format!("Invalid tenant {:?}", tenant))
}

fn index_client(config: &Config) -> Result<TenantIndexClient> {
    let client_config = config.index_client_config()?;
    TenantIndexClient::new(client_config).context("Failed to create search client")
}

fn embedder(config: &Config) -> Result<AzureOpenAiEmbedder> {
    let embedder_config = config.embedder_config()?;
    AzureOpenAiEmbedder::new(embedder_config).context("Failed to create embedding client")
}
