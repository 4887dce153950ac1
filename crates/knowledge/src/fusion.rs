//! Knowledge fusion: concurrent fan-out to every enabled source.
//!
//! Each source runs under its own timeout. A source that fails, times out
//! or finds nothing is left out of the result entirely, so an empty
//! [`FusedKnowledge`] formats to an empty string and callers can skip
//! prompt augmentation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use routewise_config::{AppConfig, SourceKind};
use routewise_core::error::KnowledgeError;
use routewise_core::knowledge::KnowledgeItem;
use routewise_core::provider::Provider;
use tracing::{debug, info, warn};

use crate::embedding::{Embedder, HashingEmbedder, ProviderEmbedder};
use crate::source::KnowledgeSource;
use crate::vector_index::VectorIndexSource;
use crate::wikipedia::WikipediaSource;

struct RegisteredSource {
    source: KnowledgeSource,
    label: String,
    timeout: Duration,
}

/// Items contributed by one source.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedSection {
    pub source: String,
    pub label: String,
    pub items: Vec<KnowledgeItem>,
}

/// Result of one fusion call, in source registration order.
///
/// Only sources that produced at least one item are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FusedKnowledge {
    sections: Vec<FusedSection>,
}

impl FusedKnowledge {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn contains(&self, source: &str) -> bool {
        self.get(source).is_some()
    }

    /// Items of one source, if it contributed any.
    pub fn get(&self, source: &str) -> Option<&[KnowledgeItem]> {
        self.sections
            .iter()
            .find(|s| s.source == source)
            .map(|s| s.items.as_slice())
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.source.as_str())
    }

    pub fn sections(&self) -> &[FusedSection] {
        &self.sections
    }
}

/// Queries registered knowledge sources and merges their results.
pub struct FusionEngine {
    sources: Vec<RegisteredSource>,
    default_timeout: Duration,
}

impl FusionEngine {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            sources: Vec::new(),
            default_timeout,
        }
    }

    /// Register a source. Sections are emitted in registration order.
    /// A source registered under an existing name replaces it in place.
    pub fn register(
        &mut self,
        source: KnowledgeSource,
        label: impl Into<String>,
        timeout: Option<Duration>,
    ) {
        let entry = RegisteredSource {
            label: label.into(),
            timeout: timeout.unwrap_or(self.default_timeout),
            source,
        };
        match self
            .sources
            .iter_mut()
            .find(|s| s.source.name() == entry.source.name())
        {
            Some(existing) => *existing = entry,
            None => self.sources.push(entry),
        }
    }

    pub fn with_source(
        mut self,
        source: KnowledgeSource,
        label: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Self {
        self.register(source, label, timeout);
        self
    }

    /// Names of all registered sources, in order.
    pub fn source_names(&self) -> Vec<String> {
        self.sources
            .iter()
            .map(|s| s.source.name().to_string())
            .collect()
    }

    /// Look `query` up in every enabled source concurrently.
    ///
    /// Returns once every source has answered or hit its timeout.
    pub async fn enhance(&self, query: &str, top_k: usize, enabled: &[String]) -> FusedKnowledge {
        let selected: Vec<&RegisteredSource> = self
            .sources
            .iter()
            .filter(|s| enabled.iter().any(|name| name == s.source.name()))
            .collect();

        if selected.is_empty() || top_k == 0 {
            return FusedKnowledge::default();
        }

        let started = Instant::now();
        let lookups = selected.iter().map(|registered| async move {
            let name = registered.source.name();
            match tokio::time::timeout(registered.timeout, registered.source.lookup(query, top_k))
                .await
            {
                Ok(items) => items,
                Err(_) => {
                    let error = KnowledgeError::Timeout {
                        source_name: name.to_string(),
                        timeout_ms: registered.timeout.as_millis() as u64,
                    };
                    warn!(source = name, error = %error, "Knowledge source dropped");
                    Vec::new()
                }
            }
        });
        let results = join_all(lookups).await;

        let sections: Vec<FusedSection> = selected
            .into_iter()
            .zip(results)
            .filter(|(_, items)| !items.is_empty())
            .map(|(registered, items)| FusedSection {
                source: registered.source.name().to_string(),
                label: registered.label.clone(),
                items,
            })
            .collect();

        debug!(
            sources = sections.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Knowledge fusion complete"
        );
        FusedKnowledge { sections }
    }

    /// Render fused knowledge as one text block. Empty input gives `""`.
    pub fn format(knowledge: &FusedKnowledge) -> String {
        knowledge
            .sections
            .iter()
            .map(|section| {
                let items: Vec<String> = section
                    .items
                    .iter()
                    .map(|item| match &item.title {
                        Some(title) => format!("{title}:\n{}", item.body),
                        None => item.body.clone(),
                    })
                    .collect();
                format!(
                    "Relevant information from {}:\n{}",
                    section.label,
                    items.join("\n\n")
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Build the fusion engine from configuration.
///
/// `embedding_provider` backs vector-index sources that name an
/// `embedding_model`; others use the local hashing embedder.
pub async fn build_from_config(
    config: &AppConfig,
    embedding_provider: Option<Arc<dyn Provider>>,
) -> FusionEngine {
    let knowledge = &config.knowledge;
    let mut engine = FusionEngine::new(Duration::from_millis(knowledge.timeout_ms));

    for source_config in &knowledge.sources {
        let timeout = knowledge.timeout_for(source_config);
        let source = match source_config.kind {
            SourceKind::Wikipedia => {
                let language = source_config.language.as_deref().unwrap_or("en");
                KnowledgeSource::Encyclopedia(Arc::new(
                    WikipediaSource::new(&source_config.name, language).with_timeout(timeout),
                ))
            }
            SourceKind::VectorIndex => {
                let embedder: Arc<dyn Embedder> =
                    match (&source_config.embedding_model, &embedding_provider) {
                        (Some(model), Some(provider)) => {
                            Arc::new(ProviderEmbedder::new(Arc::clone(provider), model))
                        }
                        _ => Arc::new(HashingEmbedder::default()),
                    };
                let index = VectorIndexSource::new(&source_config.name, embedder);
                if let Err(e) = index.add_texts(source_config.documents.clone(), None).await {
                    warn!(source = %source_config.name, error = %e, "Failed to index documents");
                }
                KnowledgeSource::Index(Arc::new(index))
            }
        };
        engine.register(source, source_config.display_label(), Some(timeout));
    }

    info!(
        sources = ?engine.source_names(),
        enabled = ?knowledge.enabled_sources(),
        "Knowledge sources registered"
    );
    engine
}
