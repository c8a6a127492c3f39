use anyhow::{Context, Result};
use enclave_core::{SearchHit, SearchResult};
use enclave_search::{Config, QueryOutcome, VectorSource};

use super::{embedder, index_client, parse_tenant};

/// Arguments of `enclave query`.
#[derive(Debug)]
pub struct QueryRequest {
    pub tenant: String,
    pub top_k: usize,
    pub all: bool,
    pub json: bool,
    pub text: String,
}

pub async fn run_query(config: &Config, request: QueryRequest) -> Result<()> {
    let tenant = parse_tenant(&request.tenant)?;
    let client = index_client(config)?;
    let embedder = embedder(config)?;

    let vector = embedder
        .embed(&request.text)
        .await
        .context("Failed to embed query text")?;

    if request.all {
        let hits = client
            .search(&tenant, request.top_k, &vector)
            .await
            .with_context(|| format!("Search against tenant {} failed", tenant))?;
        if request.json {
            println!("{}", serde_json::to_string_pretty(&hits)?);
        } else if hits.is_empty() {
            println!("No documents found for tenant {}", tenant);
        } else {
            for (rank, hit) in hits.iter().enumerate() {
                print_hit(rank + 1, hit);
            }
        }
        return Ok(());
    }

    match client.query_outcome(&tenant, request.top_k, &vector).await {
        QueryOutcome::Failed(e) => {
            if request.json {
                println!("{}", serde_json::to_string_pretty(&SearchResult::failed())?);
            }
            Err(e).with_context(|| format!("Query against tenant {} failed", tenant))
        }
        outcome if request.json => {
            println!("{}", serde_json::to_string_pretty(&SearchResult::from(outcome))?);
            Ok(())
        }
        QueryOutcome::Found(hit) => {
            print_hit(1, &hit);
            Ok(())
        }
        QueryOutcome::NotFound => {
            println!("No documents found for tenant {}", tenant);
            Ok(())
        }
    }
}

fn print_hit(rank: usize, hit: &SearchHit) {
    println!("{:>2}. {} ({:.4})", rank, hit.document_title, hit.score);
    println!("    id:  {}", hit.document_id);
    println!("    url: {}", hit.document_url);
}
