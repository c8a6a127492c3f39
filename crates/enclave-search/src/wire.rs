//! Request and response bodies exchanged with the search backend.
//!
//! Every body is built from typed structs and serialized with serde, so
//! titles and URLs are always escaped and vectors always render as bare
//! JSON number arrays.

use enclave_core::{Document, SearchHit, TenantId};
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};

pub const FIELD_ID: &str = "documentId";
pub const FIELD_TITLE: &str = "documentTitle";
pub const FIELD_URL: &str = "documentUrl";
pub const FIELD_VECTOR: &str = "documentContentVector";

const HNSW_ALGORITHM: &str = "hnsw-cosine";
const VECTOR_PROFILE: &str = "vector-profile";

// ---------------------------------------------------------------------------
// Index schema
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinition<'a> {
    name: &'a str,
    fields: Vec<FieldDefinition>,
    vector_search: VectorSearch,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldDefinition {
    name: &'static str,
    #[serde(rename = "type")]
    field_type: &'static str,
    key: bool,
    searchable: bool,
    filterable: bool,
    retrievable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vector_search_profile: Option<&'static str>,
}

impl FieldDefinition {
    fn string(name: &'static str) -> Self {
        Self {
            name,
            field_type: "Edm.String",
            key: false,
            searchable: false,
            filterable: false,
            retrievable: true,
            dimensions: None,
            vector_search_profile: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct VectorSearch {
    algorithms: Vec<Algorithm>,
    profiles: Vec<Profile>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Algorithm {
    name: &'static str,
    kind: &'static str,
    hnsw_parameters: HnswParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HnswParameters {
    metric: &'static str,
    m: u32,
    ef_construction: u32,
    ef_search: u32,
}

#[derive(Debug, Serialize)]
struct Profile {
    name: &'static str,
    algorithm: &'static str,
}

/// The fixed schema every tenant index is created with.
pub fn index_definition(tenant: &TenantId, dimensions: usize) -> IndexDefinition<'_> {
    let id = FieldDefinition {
        key: true,
        filterable: true,
        ..FieldDefinition::string(FIELD_ID)
    };
    let title = FieldDefinition {
        searchable: true,
        ..FieldDefinition::string(FIELD_TITLE)
    };
    let url = FieldDefinition::string(FIELD_URL);
    let vector = FieldDefinition {
        field_type: "Collection(Edm.Single)",
        searchable: true,
        dimensions: Some(dimensions),
        vector_search_profile: Some(VECTOR_PROFILE),
        ..FieldDefinition::string(FIELD_VECTOR)
    };

    IndexDefinition {
        name: tenant.as_str(),
        fields: vec![id, title, url, vector],
        vector_search: VectorSearch {
            algorithms: vec![Algorithm {
                name: HNSW_ALGORITHM,
                kind: "hnsw",
                hnsw_parameters: HnswParameters {
                    metric: "cosine",
                    m: 4,
                    ef_construction: 400,
                    ef_search: 500,
                },
            }],
            profiles: vec![Profile {
                name: VECTOR_PROFILE,
                algorithm: HNSW_ALGORITHM,
            }],
        },
    }
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct IndexBatch<'a> {
    value: Vec<IndexAction<'a>>,
}

#[derive(Debug, Serialize)]
struct IndexAction<'a> {
    #[serde(rename = "@search.action")]
    action: &'static str,
    #[serde(rename = "documentId")]
    id: &'a str,
    #[serde(rename = "documentTitle")]
    title: &'a str,
    #[serde(rename = "documentUrl")]
    url: &'a str,
    #[serde(rename = "documentContentVector")]
    vector: &'a [f32],
}

/// Wrap one document in an upload action.
pub fn index_batch(document: &Document) -> IndexBatch<'_> {
    IndexBatch {
        value: vec![IndexAction {
            action: "upload",
            id: &document.id,
            title: &document.title,
            url: &document.url,
            vector: &document.vector,
        }],
    }
}

#[derive(Debug, Deserialize)]
struct IndexBatchResponse {
    #[serde(default)]
    value: Vec<IndexingResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexingResult {
    #[serde(default)]
    key: String,
    status: bool,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    status_code: Option<u16>,
}

/// Check the per-document acknowledgements in a successful index response.
///
/// An empty body counts as an acknowledgement.
pub fn check_batch_ack(body: &str) -> IndexResult<()> {
    if body.trim().is_empty() {
        return Ok(());
    }
    let response: IndexBatchResponse = serde_json::from_str(body)
        .map_err(|e| IndexError::parse(format!("index response: {}", e)))?;

    match response.value.into_iter().find(|r| !r.status) {
        None => Ok(()),
        Some(failed) => Err(IndexError::Rejected {
            status: failed.status_code.unwrap_or(400),
            message: format!(
                "document {}: {}",
                failed.key,
                failed
                    .error_message
                    .unwrap_or_else(|| "indexing failed".to_string())
            ),
        }),
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest<'a> {
    select: String,
    top: usize,
    vector_queries: Vec<VectorQuery<'a>>,
}

#[derive(Debug, Serialize)]
struct VectorQuery<'a> {
    kind: &'static str,
    vector: &'a [f32],
    fields: &'static str,
    k: usize,
}

/// A pure vector query for the `top_k` nearest documents.
pub fn search_request(top_k: usize, vector: &[f32]) -> SearchRequest<'_> {
    SearchRequest {
        select: [FIELD_ID, FIELD_TITLE, FIELD_URL].join(", "),
        top: top_k,
        vector_queries: vec![VectorQuery {
            kind: "vector",
            vector,
            fields: FIELD_VECTOR,
            k: top_k,
        }],
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    value: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "@search.score")]
    score: f32,
    #[serde(rename = "documentId", default)]
    document_id: Option<String>,
    #[serde(rename = "documentTitle", default)]
    document_title: Option<String>,
    #[serde(rename = "documentUrl", default)]
    document_url: Option<String>,
}

impl From<RawHit> for SearchHit {
    fn from(raw: RawHit) -> Self {
        Self {
            document_id: raw.document_id.unwrap_or_default(),
            document_title: raw.document_title.unwrap_or_default(),
            document_url: raw.document_url.unwrap_or_default(),
            score: raw.score,
        }
    }
}

/// Parse the ranked hits of a search response, preserving backend order.
///
/// Missing text fields degrade to empty strings; a missing `value` array or
/// score is a parse error.
pub fn parse_hits(body: &str) -> IndexResult<Vec<SearchHit>> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| IndexError::parse(format!("search response: {}", e)))?;
    Ok(response.value.into_iter().map(SearchHit::from).collect())
}

/// Parse the plain-text body of a `$count` request.
pub fn parse_count(body: &str) -> IndexResult<u64> {
    let trimmed = body.trim_start_matches('\u{feff}').trim();
    trimmed
        .parse()
        .map_err(|_| IndexError::parse(format!("document count: {:?}", trimmed)))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject vectors that would serialize to something other than a finite
/// number array, or that do not match the index dimensionality.
pub fn validate_vector(vector: &[f32], expected_dimensions: usize) -> IndexResult<()> {
    if vector.is_empty() {
        return Err(IndexError::payload("vector is empty"));
    }
    if let Some(position) = vector.iter().position(|v| !v.is_finite()) {
        return Err(IndexError::payload(format!(
            "vector component {} is not finite",
            position
        )));
    }
    if vector.len() != expected_dimensions {
        return Err(IndexError::payload(format!(
            "vector has {} dimensions, index expects {}",
            vector.len(),
            expected_dimensions
        )));
    }
    Ok(())
}
