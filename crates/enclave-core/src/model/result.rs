use serde::{Deserialize, Serialize};

/// Score reported in a failed [`SearchResult`].
pub const FAILED_SCORE: f32 = -1.0;

/// One ranked hit from a similarity query.
///
/// The score is computed by the backend; higher means more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub document_id: String,
    pub document_title: String,
    pub document_url: String,
    pub score: f32,
}

/// Flat record for the top hit of a query.
///
/// When `success` is `false` every other field holds its sentinel (empty
/// strings, score `-1`). A successful query against an empty index also
/// yields empty strings, with a score of `0`; use the typed query API to
/// tell the two apart from a real hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub success: bool,
    pub document_id: String,
    pub document_title: String,
    pub document_url: String,
    pub search_score: f32,
}

impl SearchResult {
    /// The record returned when the query could not be executed.
    #[must_use]
    pub fn failed() -> Self {
        Self {
            success: false,
            document_id: String::new(),
            document_title: String::new(),
            document_url: String::new(),
            search_score: FAILED_SCORE,
        }
    }

    /// The record returned when the query ran but matched nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            success: true,
            document_id: String::new(),
            document_title: String::new(),
            document_url: String::new(),
            search_score: 0.0,
        }
    }
}

impl From<SearchHit> for SearchResult {
    fn from(hit: SearchHit) -> Self {
        Self {
            success: true,
            document_id: hit.document_id,
            document_title: hit.document_title,
            document_url: hit.document_url,
            search_score: hit.score,
        }
    }
}
