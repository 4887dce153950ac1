//! The two source shapes behind one infallible lookup.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use routewise_core::error::KnowledgeError;
use routewise_core::knowledge::{EncyclopediaSource, IndexSource, KnowledgeItem};
use tracing::{debug, warn};

/// A registered knowledge source.
#[derive(Clone)]
pub enum KnowledgeSource {
    /// search labels, then fetch a body per label
    Encyclopedia(Arc<dyn EncyclopediaSource>),
    /// one similarity search
    Index(Arc<dyn IndexSource>),
}

impl KnowledgeSource {
    pub fn name(&self) -> &str {
        match self {
            Self::Encyclopedia(s) => s.name(),
            Self::Index(s) => s.name(),
        }
    }

    /// Up to `top_k` items for `query`. Every failure is logged and
    /// becomes an empty or partial result.
    pub async fn lookup(&self, query: &str, top_k: usize) -> Vec<KnowledgeItem> {
        match self {
            Self::Encyclopedia(source) => encyclopedia_lookup(source.as_ref(), query, top_k).await,
            Self::Index(source) => index_lookup(source.as_ref(), query, top_k).await,
        }
    }
}

async fn encyclopedia_lookup(
    source: &dyn EncyclopediaSource,
    query: &str,
    top_k: usize,
) -> Vec<KnowledgeItem> {
    let labels = match source.search(query, top_k).await {
        Ok(labels) => labels,
        Err(e) => {
            warn!(source = source.name(), error = %e, "Knowledge search failed");
            return Vec::new();
        }
    };

    let fetches = labels
        .into_iter()
        .take(top_k)
        .map(|label| fetch_resolving_ambiguity(source, label));

    join_all(fetches)
        .await
        .into_iter()
        .flatten()
        .map(|(title, body)| KnowledgeItem {
            source: source.name().to_string(),
            title: Some(title),
            body,
            score: None,
            metadata: HashMap::new(),
        })
        .collect()
}

/// Fetch one label. An ambiguous label is retried once with its first
/// candidate; any other failure drops the label.
async fn fetch_resolving_ambiguity(
    source: &dyn EncyclopediaSource,
    label: String,
) -> Option<(String, String)> {
    match source.fetch(&label).await {
        Ok(body) => Some((label, body)),
        Err(KnowledgeError::Ambiguous { candidates, .. }) => {
            let candidate = candidates.into_iter().next()?;
            debug!(source = source.name(), %label, %candidate, "Resolving ambiguous label");
            match source.fetch(&candidate).await {
                Ok(body) => Some((candidate, body)),
                Err(e) => {
                    warn!(source = source.name(), label = %candidate, error = %e, "Knowledge fetch failed");
                    None
                }
            }
        }
        Err(e) => {
            warn!(source = source.name(), %label, error = %e, "Knowledge fetch failed");
            None
        }
    }
}

async fn index_lookup(source: &dyn IndexSource, query: &str, top_k: usize) -> Vec<KnowledgeItem> {
    match source.similarity_search(query, top_k).await {
        Ok(docs) => docs
            .into_iter()
            .take(top_k)
            .map(|doc| KnowledgeItem {
                source: source.name().to_string(),
                title: doc.metadata.get("title").cloned(),
                body: doc.text,
                score: Some(doc.score),
                metadata: doc.metadata,
            })
            .collect(),
        Err(e) => {
            warn!(source = source.name(), error = %e, "Similarity search failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use routewise_core::knowledge::ScoredDocument;
    use std::sync::Mutex;

    /// Encyclopedia double keyed by label.
    struct FakeEncyclopedia {
        labels: Vec<String>,
        pages: HashMap<String, Result<String, KnowledgeError>>,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeEncyclopedia {
        fn new(labels: &[&str], pages: Vec<(&str, Result<String, KnowledgeError>)>) -> Self {
            Self {
                labels: labels.iter().map(|s| s.to_string()).collect(),
                pages: pages.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
                fetched: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EncyclopediaSource for FakeEncyclopedia {
        fn name(&self) -> &str {
            "wiki"
        }

        async fn search(&self, _query: &str, limit: usize) -> Result<Vec<String>, KnowledgeError> {
            Ok(self.labels.iter().take(limit).cloned().collect())
        }

        async fn fetch(&self, label: &str) -> Result<String, KnowledgeError> {
            self.fetched.lock().unwrap().push(label.to_string());
            self.pages
                .get(label)
                .cloned()
                .unwrap_or_else(|| Err(KnowledgeError::NoMatch(label.to_string())))
        }
    }

    fn ambiguous(label: &str, candidates: &[&str]) -> Result<String, KnowledgeError> {
        Err(KnowledgeError::Ambiguous {
            label: label.into(),
            candidates: candidates.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[tokio::test]
    async fn encyclopedia_items_keep_search_order() {
        let wiki = FakeEncyclopedia::new(
            &["Rust", "Cargo"],
            vec![("Rust", Ok("A language.".into())), ("Cargo", Ok("A build tool.".into()))],
        );
        let items = KnowledgeSource::Encyclopedia(Arc::new(wiki)).lookup("rust", 5).await;

        let titles: Vec<_> = items.iter().map(|i| i.title.clone().unwrap()).collect();
        assert_eq!(titles, vec!["Rust", "Cargo"]);
        assert_eq!(items[0].source, "wiki");
        assert_eq!(items[1].body, "A build tool.");
    }

    #[tokio::test]
    async fn ambiguous_label_retries_first_candidate_once() {
        let wiki = Arc::new(FakeEncyclopedia::new(
            &["Mercury"],
            vec![
                ("Mercury", ambiguous("Mercury", &["Mercury (planet)", "Mercury (element)"])),
                ("Mercury (planet)", Ok("The smallest planet.".into())),
            ],
        ));
        let items = KnowledgeSource::Encyclopedia(wiki.clone()).lookup("mercury", 3).await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title.as_deref(), Some("Mercury (planet)"));
        assert_eq!(
            *wiki.fetched.lock().unwrap(),
            vec!["Mercury".to_string(), "Mercury (planet)".to_string()]
        );
    }

    #[tokio::test]
    async fn ambiguity_twice_yields_nothing() {
        let wiki = Arc::new(FakeEncyclopedia::new(
            &["A"],
            vec![("A", ambiguous("A", &["B"])), ("B", ambiguous("B", &["C"]))],
        ));
        let items = KnowledgeSource::Encyclopedia(wiki.clone()).lookup("a", 3).await;

        assert!(items.is_empty());
        assert_eq!(wiki.fetched.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn ambiguity_without_candidates_yields_nothing() {
        let wiki = FakeEncyclopedia::new(&["A"], vec![("A", ambiguous("A", &[]))]);
        assert!(KnowledgeSource::Encyclopedia(Arc::new(wiki)).lookup("a", 3).await.is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_drops_only_that_label() {
        let wiki = FakeEncyclopedia::new(&["Missing", "Present"], vec![("Present", Ok("here".into()))]);
        let items = KnowledgeSource::Encyclopedia(Arc::new(wiki)).lookup("q", 5).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title.as_deref(), Some("Present"));
    }

    struct FailingSearch;

    #[async_trait]
    impl EncyclopediaSource for FailingSearch {
        fn name(&self) -> &str {
            "down"
        }
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<String>, KnowledgeError> {
            Err(KnowledgeError::Unavailable {
                source_name: "down".into(),
                reason: "connection refused".into(),
            })
        }
        async fn fetch(&self, label: &str) -> Result<String, KnowledgeError> {
            Err(KnowledgeError::NoMatch(label.into()))
        }
    }

    #[tokio::test]
    async fn search_failure_is_absorbed() {
        let items = KnowledgeSource::Encyclopedia(Arc::new(FailingSearch)).lookup("q", 3).await;
        assert!(items.is_empty());
    }

    struct FixedIndex(Vec<ScoredDocument>);

    #[async_trait]
    impl IndexSource for FixedIndex {
        fn name(&self) -> &str {
            "docs"
        }
        async fn similarity_search(&self, _query: &str, _k: usize) -> Result<Vec<ScoredDocument>, KnowledgeError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn index_hits_become_scored_items() {
        let docs = vec![
            ScoredDocument {
                text: "GPA 3.0".into(),
                metadata: HashMap::from([("title".to_string(), "Requirements".to_string())]),
                score: 0.9,
            },
            ScoredDocument { text: "March 1".into(), metadata: HashMap::new(), score: 0.5 },
            ScoredDocument { text: "extra".into(), metadata: HashMap::new(), score: 0.1 },
        ];
        let items = KnowledgeSource::Index(Arc::new(FixedIndex(docs))).lookup("q", 2).await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title.as_deref(), Some("Requirements"));
        assert_eq!(items[0].score, Some(0.9));
        assert_eq!(items[1].title, None);
    }
}
