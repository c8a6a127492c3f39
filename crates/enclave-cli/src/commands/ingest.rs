use anyhow::{Context, Result};
use enclave_core::{Document, TenantId};
use enclave_search::{Config, VectorSource};

use super::{embedder, index_client, parse_tenant};

/// Arguments of `enclave ingest`.
#[derive(Debug)]
pub struct IngestRequest {
    pub tenants: Vec<String>,
    pub title: String,
    pub url: String,
    pub id: Option<String>,
    pub text: Option<String>,
}

pub async fn run_ingest(config: &Config, request: IngestRequest) -> Result<()> {
    // Validate every tenant before spending an embedding call.
    let tenants = request
        .tenants
        .iter()
        .map(|t| parse_tenant(t))
        .collect::<Result<Vec<TenantId>>>()?;

    let client = index_client(config)?;
    let embedder = embedder(config)?;

    let text = request.text.as_deref().unwrap_or(&request.title);
    let vector = embedder
        .embed(text)
        .await
        .context("Failed to embed document text")?;

    let document = match request.id {
        Some(id) => Document::with_id(id, request.title, request.url, vector),
        None => Document::new(request.title, request.url, vector),
    };
    log::info!(
        "Ingesting document {} into {} tenant(s)",
        document.id,
        tenants.len()
    );

    let mut failed = Vec::new();
    for tenant in &tenants {
        match client.try_ingest(tenant, &document).await {
            Ok(()) => println!("✓ {} → {}", document.id, tenant),
            Err(e) => {
                println!("✗ {} → {}: {}", document.id, tenant, e);
                failed.push(tenant.as_str());
            }
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("Ingest failed for tenant(s): {}", failed.join(", "));
    }
    Ok(())
}
