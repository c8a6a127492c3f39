use anyhow::{Context, Result};
use enclave_search::Config;

use super::{index_client, parse_tenant};

pub async fn create_index(config: &Config, tenant: &str) -> Result<()> {
    let tenant = parse_tenant(tenant)?;
    let client = index_client(config)?;

    client
        .try_create_index(&tenant)
        .await
        .with_context(|| format!("Failed to create index for tenant {}", tenant))?;

    println!("✓ Created empty index for tenant {}", tenant);
    println!("  {} dimensions at {}", client.dimensions(), client.endpoint());
    Ok(())
}

pub async fn delete_index(config: &Config, tenant: &str) -> Result<()> {
    let tenant = parse_tenant(tenant)?;
    let client = index_client(config)?;

    let deleted = client
        .try_delete_index(&tenant)
        .await
        .with_context(|| format!("Failed to delete index for tenant {}", tenant))?;

    if deleted {
        println!("✓ Deleted index for tenant {}", tenant);
    } else {
        println!("Tenant {} has no index", tenant);
    }
    Ok(())
}

pub async fn count_documents(config: &Config, tenant: &str) -> Result<()> {
    let tenant = parse_tenant(tenant)?;
    let client = index_client(config)?;

    let count = client
        .document_count(&tenant)
        .await
        .with_context(|| format!("Failed to count documents for tenant {}", tenant))?;

    println!("{}", count);
    Ok(())
}
