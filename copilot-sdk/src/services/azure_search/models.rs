//! Azure AI Search query and response models

use serde::{Deserialize, Serialize};

/// A vector similarity clause
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorQuery {
    /// Always `"vector"` for pre-computed embeddings
    pub kind: String,

    pub vector: Vec<f32>,

    /// Comma-separated vector fields to search
    pub fields: String,

    /// Number of nearest neighbours
    pub k: usize,
}

/// Body of `POST /indexes/{index}/docs/search`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub search: String,

    pub top: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_configuration: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub vector_queries: Vec<VectorQuery>,
}

impl SearchRequest {
    /// Plain keyword search
    pub fn text(search: impl Into<String>, top: usize) -> Self {
        Self {
            search: search.into(),
            top,
            query_type: None,
            semantic_configuration: None,
            vector_queries: Vec::new(),
        }
    }

    /// Keyword search combined with a vector query on `field`
    pub fn hybrid(search: impl Into<String>, vector: Vec<f32>, field: impl Into<String>, k: usize) -> Self {
        Self {
            vector_queries: vec![VectorQuery {
                kind: "vector".to_string(),
                vector,
                fields: field.into(),
                k,
            }],
            ..Self::text(search, k)
        }
    }

    /// Re-rank with the named semantic configuration
    pub fn semantic(mut self, configuration: impl Into<String>) -> Self {
        self.query_type = Some("semantic".to_string());
        self.semantic_configuration = Some(configuration.into());
        self
    }
}

/// One matching document with its relevance score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit<D> {
    #[serde(rename = "@search.score", default)]
    pub score: f64,

    #[serde(flatten)]
    pub document: D,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse<D> {
    #[serde(default = "Vec::new")]
    pub value: Vec<SearchHit<D>>,
}
