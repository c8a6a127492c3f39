//! Tenant index client.
//!
//! Owns the lifecycle of every tenant's index on the search backend and all
//! document traffic to it: create/recreate, delete, ingest one document,
//! top-K similarity query, and document count. Each tenant maps to exactly
//! one backend index named after its [`TenantId`], so isolation is enforced
//! by the backend's storage rather than by document content.
//!
//! The client only deals in precomputed vectors. It never calls an embedding
//! provider itself.

use std::fmt;
use std::time::Duration;

use enclave_core::{Document, SearchHit, SearchResult, TenantId};
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;

use crate::error::{IndexError, IndexResult};
use crate::resilience::{RetryPolicy, TenantLocks};
use crate::wire;

const USER_AGENT: &str = "enclave/0.1.0 (https://github.com/oxur/enclave)";

/// Longest backend error body echoed back in a [`IndexError::Rejected`].
const MAX_ERROR_BODY: usize = 512;

/// Connection settings for a [`TenantIndexClient`].
#[derive(Clone)]
pub struct IndexClientConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    /// Dimensionality every tenant index is created with, and that every
    /// ingested or query vector must have.
    pub vector_dimensions: usize,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl IndexClientConfig {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            api_version: api_version.into(),
            vector_dimensions: 1536,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_dimensions(mut self, vector_dimensions: usize) -> Self {
        self.vector_dimensions = vector_dimensions;
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

impl fmt::Debug for IndexClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexClientConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("vector_dimensions", &self.vector_dimensions)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Result of a single-hit query.
///
/// Unlike [`SearchResult`], an empty index and a failed request are
/// different variants here.
#[derive(Debug)]
pub enum QueryOutcome {
    /// The top-ranked hit.
    Found(SearchHit),
    /// The query ran but the index holds no matching document.
    NotFound,
    /// The query could not be executed or its response not understood.
    Failed(IndexError),
}

impl QueryOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn hit(&self) -> Option<&SearchHit> {
        match self {
            Self::Found(hit) => Some(hit),
            _ => None,
        }
    }
}

impl From<QueryOutcome> for SearchResult {
    fn from(outcome: QueryOutcome) -> Self {
        match outcome {
            QueryOutcome::Found(hit) => SearchResult::from(hit),
            QueryOutcome::NotFound => SearchResult::empty(),
            QueryOutcome::Failed(_) => SearchResult::failed(),
        }
    }
}

/// Search backend client scoped per call to one tenant's index.
///
/// Cloning is cheap; clones share the HTTP connection pool and the
/// per-tenant lifecycle guard. Create and delete hold a tenant's guard
/// exclusively, so ingestion and queries issued through this client (or
/// its clones) never see the index missing between delete and create.
/// Callers driving the same tenant from independent clients or processes
/// must serialize lifecycle operations themselves.
#[derive(Clone)]
pub struct TenantIndexClient {
    http: Client,
    endpoint: String,
    api_key: String,
    api_version: String,
    dimensions: usize,
    retry: RetryPolicy,
    locks: TenantLocks,
}

impl fmt::Debug for TenantIndexClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantIndexClient")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("dimensions", &self.dimensions)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl TenantIndexClient {
    /// Create a client for the backend described by `config`.
    ///
    /// # Errors
    /// Returns [`IndexError::Config`] if the endpoint is not an absolute
    /// http(s) URL or the dimensionality is zero, and
    /// [`IndexError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: IndexClientConfig) -> IndexResult<Self> {
        let endpoint = normalize_endpoint(&config.endpoint)?;
        if config.vector_dimensions == 0 {
            return Err(IndexError::Config {
                message: "vector dimensions must be at least 1".to_string(),
            });
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(IndexError::Transport)?;

        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key,
            api_version: config.api_version,
            dimensions: config.vector_dimensions,
            retry: config.retry,
            locks: TenantLocks::new(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    // -----------------------------------------------------------------------
    // Index lifecycle
    // -----------------------------------------------------------------------

    /// Ensure a fresh, empty index exists for `tenant`.
    ///
    /// Any existing index is deleted first; a missing index is not an error.
    /// Returns `true` iff both steps succeeded, so a `true` always means the
    /// index is empty.
    pub async fn create_index(&self, tenant: &TenantId) -> bool {
        match self.try_create_index(tenant).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to create index for tenant {}: {}", tenant, e);
                false
            }
        }
    }

    /// Delete-then-create, surfacing the first error.
    ///
    /// If the delete fails for any reason other than the index not
    /// existing, no create request is sent.
    pub async fn try_create_index(&self, tenant: &TenantId) -> IndexResult<()> {
        let _guard = self.locks.lifecycle(tenant).await;

        // A PUT over a surviving index keeps its documents, so anything but
        // "deleted" or "not there" aborts the reset.
        if self.delete_unguarded(tenant).await? {
            log::debug!("Deleted previous index for tenant {}", tenant);
        } else {
            log::debug!("No previous index for tenant {}", tenant);
        }

        let definition = wire::index_definition(tenant, self.dimensions);
        let url = self.index_url(tenant);
        self.execute("create index", || self.http.put(url.clone()).json(&definition))
            .await?;

        log::info!(
            "Created index for tenant {} ({} dimensions)",
            tenant,
            self.dimensions
        );
        Ok(())
    }

    /// Delete the tenant's index. Returns the backend's success status; a
    /// missing index yields `false` without being logged as a failure.
    pub async fn delete_index(&self, tenant: &TenantId) -> bool {
        match self.try_delete_index(tenant).await {
            Ok(existed) => existed,
            Err(e) => {
                log::warn!("Failed to delete index for tenant {}: {}", tenant, e);
                false
            }
        }
    }

    /// Delete the tenant's index. `Ok(false)` means there was nothing to
    /// delete.
    pub async fn try_delete_index(&self, tenant: &TenantId) -> IndexResult<bool> {
        let _guard = self.locks.lifecycle(tenant).await;
        let deleted = self.delete_unguarded(tenant).await?;
        if deleted {
            log::info!("Deleted index for tenant {}", tenant);
        }
        Ok(deleted)
    }

    async fn delete_unguarded(&self, tenant: &TenantId) -> IndexResult<bool> {
        let url = self.index_url(tenant);
        match self
            .execute("delete index", || self.http.delete(url.clone()))
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    // -----------------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------------

    /// Submit one document to the tenant's index. Returns `true` iff the
    /// backend acknowledged it.
    pub async fn ingest(&self, tenant: &TenantId, document: &Document) -> bool {
        match self.try_ingest(tenant, document).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!(
                    "Failed to ingest document {} into tenant {}: {}",
                    document.id,
                    tenant,
                    e
                );
                false
            }
        }
    }

    /// Submit one document, surfacing why it was not accepted.
    pub async fn try_ingest(&self, tenant: &TenantId, document: &Document) -> IndexResult<()> {
        wire::validate_vector(&document.vector, self.dimensions)?;
        let _guard = self.locks.shared(tenant).await;

        let batch = wire::index_batch(document);
        let url = self.docs_url(tenant, "index/");
        let body = self
            .execute("index document", || self.http.post(url.clone()).json(&batch))
            .await?;
        wire::check_batch_ack(&body)?;

        log::debug!("Ingested document {} into tenant {}", document.id, tenant);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Top hit for `query_vector` as a flat record.
    ///
    /// Failures collapse to [`SearchResult::failed`] and are logged; an
    /// empty index yields [`SearchResult::empty`]. Only the first of up to
    /// `top_k` ranked hits is returned; see [`Self::search`] for all of them.
    pub async fn query(
        &self,
        tenant: &TenantId,
        top_k: usize,
        query_vector: &[f32],
    ) -> SearchResult {
        let outcome = self.query_outcome(tenant, top_k, query_vector).await;
        if let QueryOutcome::Failed(e) = &outcome {
            log::warn!("Query against tenant {} failed: {}", tenant, e);
        }
        SearchResult::from(outcome)
    }

    /// Top hit for `query_vector`, keeping "no match" and "failed" apart.
    pub async fn query_outcome(
        &self,
        tenant: &TenantId,
        top_k: usize,
        query_vector: &[f32],
    ) -> QueryOutcome {
        match self.search(tenant, top_k, query_vector).await {
            Ok(hits) => hits
                .into_iter()
                .next()
                .map_or(QueryOutcome::NotFound, QueryOutcome::Found),
            Err(e) => QueryOutcome::Failed(e),
        }
    }

    /// Every ranked hit (at most `top_k`) in backend order.
    pub async fn search(
        &self,
        tenant: &TenantId,
        top_k: usize,
        query_vector: &[f32],
    ) -> IndexResult<Vec<SearchHit>> {
        if top_k == 0 {
            return Err(IndexError::payload("top_k must be at least 1"));
        }
        wire::validate_vector(query_vector, self.dimensions)?;
        let _guard = self.locks.shared(tenant).await;

        let request = wire::search_request(top_k, query_vector);
        let url = self.docs_url(tenant, "search/");
        let body = self
            .execute("search", || self.http.post(url.clone()).json(&request))
            .await?;

        let mut hits = wire::parse_hits(&body)?;
        hits.truncate(top_k);
        log::debug!("Tenant {} returned {} hit(s)", tenant, hits.len());
        Ok(hits)
    }

    /// Number of documents currently stored in the tenant's index.
    pub async fn document_count(&self, tenant: &TenantId) -> IndexResult<u64> {
        let _guard = self.locks.shared(tenant).await;
        let url = self.docs_url(tenant, "$count");
        let body = self
            .execute("count documents", || self.http.get(url.clone()))
            .await?;
        wire::parse_count(&body)
    }

    // -----------------------------------------------------------------------
    // Request plumbing
    // -----------------------------------------------------------------------

    fn index_url(&self, tenant: &TenantId) -> String {
        format!("{}/indexes/{}/", self.endpoint, tenant)
    }

    fn docs_url(&self, tenant: &TenantId, operation: &str) -> String {
        format!("{}/indexes/{}/docs/{}", self.endpoint, tenant, operation)
    }

    /// Send a request built by `build`, retrying transient failures, and
    /// return the body of the successful response.
    async fn execute<F>(&self, what: &str, build: F) -> IndexResult<String>
    where
        F: Fn() -> RequestBuilder,
    {
        self.retry
            .run(what, || {
                let request = build()
                    .query(&[("api-version", self.api_version.as_str())])
                    .header("api-key", &self.api_key);
                log::debug!("Sending {} request", what);
                send_once(request)
            })
            .await
    }
}

async fn send_once(request: RequestBuilder) -> IndexResult<String> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        Ok(body)
    } else {
        Err(IndexError::Rejected {
            status: status.as_u16(),
            message: rejection_message(&body, status.canonical_reason()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Pull a readable message out of a backend error body.
fn rejection_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return reason.unwrap_or("no response body").to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY).collect()
}

fn normalize_endpoint(endpoint: &str) -> IndexResult<String> {
    let trimmed = endpoint.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).map_err(|e| IndexError::Config {
        message: format!("invalid search endpoint {:?}: {}", endpoint, e),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(IndexError::Config {
            message: format!("search endpoint must be http or https: {:?}", endpoint),
        });
    }
    Ok(trimmed.to_string())
}
