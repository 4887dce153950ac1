//! Shared test doubles for responder and orchestrator tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use routewise_core::error::{KnowledgeError, ProviderError};
use routewise_core::knowledge::{IndexSource, ScoredDocument};
use routewise_core::message::{Message, PairedTurn};
use routewise_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};

use crate::responder::Responder;

/// A provider that replies with a fixed result and records every request.
pub struct RecordingProvider {
    reply: Result<String, ProviderError>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl RecordingProvider {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            reply: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Provider for RecordingProvider {
    fn name(&self) -> &str {
        "recording_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        let text = self.reply.clone()?;
        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model,
        })
    }
}

/// One recorded `generate` call.
#[derive(Debug, Clone)]
pub struct ResponderCall {
    pub query: String,
    pub history: Vec<PairedTurn>,
}

/// A responder that returns scripted results in order.
///
/// Panics if more calls are made than results provided.
pub struct ScriptedResponder {
    category: String,
    script: Mutex<Vec<Result<String, ProviderError>>>,
    calls: Mutex<Vec<ResponderCall>>,
    delay: Duration,
}

impl ScriptedResponder {
    pub fn new(category: &str, script: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            category: category.to_string(),
            script: Mutex::new(script.into_iter().rev().collect()),
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Replies `"{category} reply {n}"` for `n` calls.
    pub fn echoing(category: &str, n: usize) -> Self {
        Self::new(
            category,
            (1..=n).map(|i| Ok(format!("{category} reply {i}"))).collect(),
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<ResponderCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    fn category(&self) -> &str {
        &self.category
    }

    fn name(&self) -> &str {
        &self.category
    }

    async fn generate(&self, query: &str, history: &[PairedTurn]) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(ResponderCall {
            query: query.to_string(),
            history: history.to_vec(),
        });
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.script.lock().unwrap().pop().unwrap_or_else(|| {
            panic!("ScriptedResponder '{}': no more responses", self.category)
        })
    }
}

/// Index source with fixed documents and an optional delay.
pub struct StaticIndex {
    pub name: String,
    pub documents: Vec<(String, String)>,
    pub delay: Duration,
}

impl StaticIndex {
    pub fn new(name: &str, documents: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            documents: documents
                .iter()
                .map(|(t, b)| (t.to_string(), b.to_string()))
                .collect(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl IndexSource for StaticIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn similarity_search(&self, _query: &str, k: usize) -> Result<Vec<ScoredDocument>, KnowledgeError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self
            .documents
            .iter()
            .take(k)
            .map(|(title, body)| ScoredDocument {
                text: body.clone(),
                metadata: HashMap::from([("title".to_string(), title.clone())]),
                score: 1.0,
            })
            .collect())
    }
}
