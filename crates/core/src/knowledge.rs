//! Knowledge source traits: pluggable lookup providers.
//!
//! Two shapes are supported:
//! - [`EncyclopediaSource`]: search for candidate labels, then fetch a body
//!   per label (e.g. Wikipedia).
//! - [`IndexSource`]: one similarity search returning scored documents
//!   (e.g. a vector index over domain documents).
//!
//! Implementations may fail freely; the fusion engine absorbs every
//! [`KnowledgeError`] at the source boundary.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::KnowledgeError;

/// One retrieved piece of knowledge. Produced fresh per query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    /// Name of the source that produced this item
    pub source: String,

    /// Title or label, if the source has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Body text
    pub body: String,

    /// Relevance score, if the source ranks its results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,

    /// Free-form metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// A similarity-search hit from an index-style source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub text: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub score: f32,
}

/// Encyclopedia-style source: `search` then `fetch`.
#[async_trait]
pub trait EncyclopediaSource: Send + Sync {
    /// Source name (e.g. "wikipedia").
    fn name(&self) -> &str;

    /// Candidate labels for a query, best first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, KnowledgeError>;

    /// Body text for a label.
    ///
    /// Returns [`KnowledgeError::Ambiguous`] when the label resolves to a
    /// disambiguation page.
    async fn fetch(&self, label: &str) -> Result<String, KnowledgeError>;
}

/// Index-style source: a single similarity search.
#[async_trait]
pub trait IndexSource: Send + Sync {
    /// Source name (e.g. "admissions").
    fn name(&self) -> &str;

    /// The `k` most similar documents, highest score first.
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredDocument>, KnowledgeError>;
}
