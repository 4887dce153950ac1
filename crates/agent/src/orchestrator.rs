//! The orchestrator: one query end-to-end.
//!
//! For each call:
//!
//! 1. **Resolve** the session and append the user turn
//! 2. **Classify** the query against the post-append history
//! 3. **Fuse** knowledge from every enabled source
//! 4. **Generate** with the category's responder, bounded by a timeout
//! 5. **Record** the responder turn
//!
//! Steps 1 to 5 hold the session's exchange guard, so concurrent queries
//! on one session are answered one at a time and their turns stay paired.
//! A responder failure leaves the session with the user turn appended and
//! no responder turn.

use std::sync::Arc;
use std::time::{Duration, Instant};

use routewise_config::AppConfig;
use routewise_core::error::{Error, ProviderError, Result};
use routewise_core::message::{SessionId, Turn, pair_turns};
use routewise_knowledge::FusionEngine;
use routewise_providers::ProviderRouter;
use routewise_session::SessionStore;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::responder::{self, CategoryInfo, ResponderRegistry};
use crate::selection::{RoutingDecision, SelectionPolicy};

/// What a caller gets back from [`Orchestrator::route_query`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteOutcome {
    pub response: String,
    pub category: String,
    pub session_id: SessionId,
}

pub struct Orchestrator {
    sessions: Arc<SessionStore>,
    policy: SelectionPolicy,
    fusion: Arc<FusionEngine>,
    responders: ResponderRegistry,
    top_k: usize,
    enabled_sources: Vec<String>,
    responder_timeout: Duration,
}

impl Orchestrator {
    /// Every registered knowledge source starts enabled.
    pub fn new(
        sessions: Arc<SessionStore>,
        policy: SelectionPolicy,
        fusion: Arc<FusionEngine>,
        responders: ResponderRegistry,
    ) -> Self {
        let enabled_sources = fusion.source_names();
        Self {
            sessions,
            policy,
            fusion,
            responders,
            top_k: 3,
            enabled_sources,
            responder_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_enabled_sources(mut self, sources: Vec<String>) -> Self {
        self.enabled_sources = sources;
        self
    }

    pub fn with_responder_timeout(mut self, timeout: Duration) -> Self {
        self.responder_timeout = timeout;
        self
    }

    /// Wire up sessions, sources and responders from configuration.
    pub async fn from_config(config: &AppConfig, providers: &ProviderRouter) -> Result<Self> {
        let responders = responder::build_from_config(config, providers)?;
        let fusion = routewise_knowledge::build_from_config(config, providers.default()).await;
        let sessions = Arc::new(SessionStore::new(config.session.max_turns));

        Ok(Self::new(
            sessions,
            SelectionPolicy::from_config(config),
            Arc::new(fusion),
            responders,
        )
        .with_top_k(config.knowledge.top_k)
        .with_enabled_sources(config.knowledge.enabled_sources())
        .with_responder_timeout(config.responder.timeout()))
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn categories(&self) -> Vec<CategoryInfo> {
        self.responders.categories()
    }

    /// Classify without side effects.
    pub async fn classify(&self, query: &str, session_id: Option<&SessionId>) -> RoutingDecision {
        let history = match session_id {
            Some(id) => self.sessions.history(id).await,
            None => Vec::new(),
        };
        self.policy.classify(query, &history)
    }

    /// Route one query through selection, fusion and the chosen responder.
    pub async fn route_query(
        &self,
        query: &str,
        session_id: Option<SessionId>,
    ) -> Result<RouteOutcome> {
        let started = Instant::now();
        let session_id = session_id.unwrap_or_default();
        let _exchange = self.sessions.begin_exchange(&session_id).await;
        self.sessions.append_turn(&session_id, Turn::user(query)).await;

        let history = self.sessions.history(&session_id).await;
        let decision = self.policy.classify(query, &history);
        info!(
            session_id = %session_id,
            category = %decision.category,
            phase = ?decision.phase,
            "Routed query"
        );
        debug!(scores = ?decision.scores, "Routing scores");

        let responder = self
            .responders
            .get(&decision.category)
            .ok_or_else(|| Error::UnknownCategory(decision.category.clone()))?;

        let fused = self
            .fusion
            .enhance(query, self.top_k, &self.enabled_sources)
            .await;
        let knowledge = FusionEngine::format(&fused);
        let prompt = if knowledge.is_empty() {
            query.to_string()
        } else {
            format!("{query}\n\n[EXTERNAL KNOWLEDGE: {knowledge}]")
        };

        let paired = pair_turns(&history);
        let generated = tokio::time::timeout(
            self.responder_timeout,
            responder.generate(&prompt, &paired),
        )
        .await
        .unwrap_or_else(|_| {
            Err(ProviderError::Timeout(format!(
                "responder did not answer within {}s",
                self.responder_timeout.as_secs()
            )))
        });

        let response = match generated {
            Ok(text) => text,
            Err(source) => {
                warn!(
                    session_id = %session_id,
                    category = %decision.category,
                    error = %source,
                    "Responder failed"
                );
                return Err(Error::Responder {
                    category: decision.category,
                    source,
                });
            }
        };

        self.sessions
            .append_turn(&session_id, Turn::responder(&response))
            .await;

        info!(
            session_id = %session_id,
            category = %decision.category,
            knowledge_sources = fused.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query answered"
        );

        Ok(RouteOutcome {
            response,
            category: decision.category,
            session_id,
        })
    }
}
