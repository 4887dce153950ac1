//! Responders: the text-generation capability bound to each category.

use std::sync::Arc;

use async_trait::async_trait;
use routewise_config::AppConfig;
use routewise_core::error::{Error, ProviderError};
use routewise_core::message::{Message, PairedTurn};
use routewise_core::provider::{Provider, ProviderRequest};
use routewise_providers::ProviderRouter;
use serde::Serialize;
use tracing::debug;

/// Generates a reply for one routing category.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Category tag this responder serves.
    fn category(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Reply to `query` given prior exchanges, oldest first.
    async fn generate(&self, query: &str, history: &[PairedTurn]) -> Result<String, ProviderError>;
}

/// A responder backed by an LLM [`Provider`].
pub struct ProviderResponder {
    category: String,
    name: String,
    description: String,
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ProviderResponder {
    pub fn new(
        category: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            description: description.into(),
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are a specialized assistant named {}. {}",
            self.name, self.description
        )
    }

    /// Persona, then alternating history, then the query.
    fn build_messages(&self, query: &str, history: &[PairedTurn]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(Message::system(self.system_prompt()));
        for turn in history {
            messages.push(Message::user(&turn.user));
            messages.push(Message::assistant(&turn.responder));
        }
        messages.push(Message::user(query));
        messages
    }
}

#[async_trait]
impl Responder for ProviderResponder {
    fn category(&self) -> &str {
        &self.category
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn generate(&self, query: &str, history: &[PairedTurn]) -> Result<String, ProviderError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: self.build_messages(query, history),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            category = %self.category,
            provider = self.provider.name(),
            model = %self.model,
            history = history.len(),
            "Invoking responder"
        );

        let response = self.provider.complete(request).await?;
        Ok(response.message.content)
    }
}

/// Public description of a category, as listed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Category id → responder, in registration order.
#[derive(Default)]
pub struct ResponderRegistry {
    responders: Vec<Arc<dyn Responder>>,
}

impl ResponderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a responder, replacing any previous one for its category.
    pub fn register(&mut self, responder: Arc<dyn Responder>) {
        match self
            .responders
            .iter_mut()
            .find(|r| r.category() == responder.category())
        {
            Some(existing) => *existing = responder,
            None => self.responders.push(responder),
        }
    }

    pub fn with(mut self, responder: Arc<dyn Responder>) -> Self {
        self.register(responder);
        self
    }

    pub fn get(&self, category: &str) -> Option<Arc<dyn Responder>> {
        self.responders
            .iter()
            .find(|r| r.category() == category)
            .cloned()
    }

    pub fn categories(&self) -> Vec<CategoryInfo> {
        self.responders
            .iter()
            .map(|r| CategoryInfo {
                id: r.category().to_string(),
                name: r.name().to_string(),
                description: r.description().to_string(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.responders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responders.is_empty()
    }
}

/// One [`ProviderResponder`] per configured category, each on the
/// category's provider or the default one.
pub fn build_from_config(
    config: &AppConfig,
    providers: &ProviderRouter,
) -> Result<ResponderRegistry, Error> {
    let mut registry = ResponderRegistry::new();
    for category in &config.categories {
        let provider_name = config.provider_for(category);
        let provider = providers.get(provider_name).ok_or_else(|| {
            let mut known = providers.list();
            known.sort_unstable();
            Error::Config {
                message: format!(
                    "provider '{provider_name}' for category '{}' is not registered (known: {})",
                    category.id,
                    known.join(", ")
                ),
            }
        })?;

        let responder = ProviderResponder::new(
            &category.id,
            &category.name,
            &category.description,
            provider,
            config.model_for(category),
        )
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens);
        registry.register(Arc::new(responder));
    }
    Ok(registry)
}
