use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A document destined for exactly one tenant index per ingestion call.
///
/// The vector is produced by whatever embedding provider the caller uses;
/// its length must match the dimensionality the index was created with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub url: String,
    pub vector: Vec<f32>,
}

impl Document {
    /// Create a document with a freshly generated UUID v4 id.
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>, vector: Vec<f32>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), title, url, vector)
    }

    /// Create a document with a caller-chosen id.
    #[must_use]
    pub fn with_id(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        vector: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            vector,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let a = Document::new("A", "https://x/a", vec![1.0]);
        let b = Document::new("A", "https://x/a", vec![1.0]);
        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn test_with_id() {
        let doc = Document::with_id("d1", "Archive Planet", "https://x/d1", vec![1.0, 0.0, 0.0]);
        assert_eq!(doc.id, "d1");
        assert_eq!(doc.title, "Archive Planet");
        assert_eq!(doc.url, "https://x/d1");
        assert_eq!(doc.dimensions(), 3);
    }
}
