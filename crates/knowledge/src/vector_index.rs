//! In-memory vector index over domain documents.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use routewise_core::error::KnowledgeError;
use routewise_core::knowledge::{IndexSource, ScoredDocument};
use tokio::sync::RwLock;
use tracing::debug;

use crate::embedding::{Embedder, HashingEmbedder};
use crate::vector::rank_by_similarity;

struct IndexedDocument {
    text: String,
    metadata: HashMap<String, String>,
}

#[derive(Default)]
struct Index {
    documents: Vec<IndexedDocument>,
    embeddings: Vec<Vec<f32>>,
}

/// Similarity-search source backed by an in-memory embedding table.
pub struct VectorIndexSource {
    name: String,
    embedder: Arc<dyn Embedder>,
    index: RwLock<Index>,
}

impl VectorIndexSource {
    pub fn new(name: impl Into<String>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            name: name.into(),
            embedder,
            index: RwLock::new(Index::default()),
        }
    }

    /// An index using the local [`HashingEmbedder`].
    pub fn with_hashing(name: impl Into<String>) -> Self {
        Self::new(name, Arc::new(HashingEmbedder::default()))
    }

    /// Embed and store documents. `metadatas`, when given, pairs up with
    /// `texts` by position. Returns the number of documents added.
    pub async fn add_texts(
        &self,
        texts: Vec<String>,
        metadatas: Option<Vec<HashMap<String, String>>>,
    ) -> Result<usize, KnowledgeError> {
        if texts.is_empty() {
            return Ok(0);
        }
        if let Some(m) = &metadatas {
            if m.len() != texts.len() {
                return Err(KnowledgeError::InvalidResponse(format!(
                    "{} metadata entries for {} texts",
                    m.len(),
                    texts.len()
                )));
            }
        }

        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(KnowledgeError::InvalidResponse(format!(
                "{} embeddings for {} texts from '{}'",
                embeddings.len(),
                texts.len(),
                self.embedder.name()
            )));
        }
        let mut metadatas = metadatas.unwrap_or_default().into_iter();

        let mut index = self.index.write().await;
        let added = texts.len();
        for (text, embedding) in texts.into_iter().zip(embeddings) {
            index.documents.push(IndexedDocument {
                text,
                metadata: metadatas.next().unwrap_or_default(),
            });
            index.embeddings.push(embedding);
        }
        debug!(source = %self.name, added, total = index.documents.len(), "Indexed documents");
        Ok(added)
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl IndexSource for VectorIndexSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredDocument>, KnowledgeError> {
        if k == 0 || self.is_empty().await {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .pop()
            .ok_or_else(|| KnowledgeError::InvalidResponse("empty query embedding".into()))?;

        let index = self.index.read().await;
        Ok(rank_by_similarity(&index.embeddings, &query_embedding, k)
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(i, score)| ScoredDocument {
                text: index.documents[i].text.clone(),
                metadata: index.documents[i].metadata.clone(),
                score,
            })
            .collect())
    }
}
