//! Configuration loading, validation, and management for Routewise.
//!
//! Loads configuration from `~/.routewise/config.toml` with environment
//! variable overrides. Validates all settings at startup. Everything is
//! static for the lifetime of the process.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The catch-all category every configuration must define.
pub const GENERAL_CATEGORY: &str = "general";

/// The root configuration structure.
///
/// Maps directly to `~/.routewise/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model, used by categories that don't name their own
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Session history settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Knowledge fusion settings
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Responder invocation settings
    #[serde(default)]
    pub responder: ResponderConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Responder categories, in routing order
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryConfig>,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "llama3".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("session", &self.session)
            .field("knowledge", &self.knowledge)
            .field("responder", &self.responder)
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .field("categories", &self.categories)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of (user, responder) exchanges retained per session
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

fn default_max_turns() -> usize {
    10
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Items requested from each source per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Per-source timeout unless a source overrides it
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,

    /// Registered sources, in output order
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

fn default_top_k() -> usize {
    3
}
fn default_source_timeout_ms() -> u64 {
    5_000
}
fn default_sources() -> Vec<SourceConfig> {
    vec![SourceConfig {
        name: "wikipedia".into(),
        kind: SourceKind::Wikipedia,
        enabled: true,
        label: Some("Wikipedia".into()),
        timeout_ms: None,
        language: Some("en".into()),
        documents: vec![],
        embedding_model: None,
    }]
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            timeout_ms: default_source_timeout_ms(),
            sources: default_sources(),
        }
    }
}

impl KnowledgeConfig {
    /// Names of the sources that are switched on.
    pub fn enabled_sources(&self) -> Vec<String> {
        self.sources
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.name.clone())
            .collect()
    }

    /// Effective timeout of a source.
    pub fn timeout_for(&self, source: &SourceConfig) -> Duration {
        Duration::from_millis(source.timeout_ms.unwrap_or(self.timeout_ms))
    }
}

/// Which adapter backs a knowledge source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Encyclopedia lookup against the Wikipedia APIs
    Wikipedia,
    /// In-memory similarity index over `documents`
    VectorIndex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique source name, used as the key in fused results
    pub name: String,

    pub kind: SourceKind,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Human-readable label used in the prompt block (defaults to `name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Override of `knowledge.timeout_ms`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Wikipedia language edition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Documents indexed by a `vector_index` source
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<String>,

    /// Provider embedding model; the local hashing embedder is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
}

impl SourceConfig {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    /// Hard cap on a single responder call
    #[serde(default = "default_responder_timeout")]
    pub timeout_secs: u64,
}

fn default_responder_timeout() -> u64 {
    120
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_responder_timeout(),
        }
    }
}

impl ResponderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "0.0.0.0".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

/// A responder category and the keywords that route queries to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Category tag returned to callers (e.g. "admissions")
    pub id: String,

    /// Human-readable responder name
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Provider override for this category's responder (a key of
    /// `[providers]` or the default provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Model override for this category's responder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Lower-case substrings that vote for this category
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_categories() -> Vec<CategoryConfig> {
    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    vec![
        CategoryConfig {
            id: GENERAL_CATEGORY.into(),
            name: "General Questions Agent".into(),
            description: "Handles general knowledge questions on various topics".into(),
            provider: None,
            model: None,
            keywords: vec![],
        },
        CategoryConfig {
            id: "admissions".into(),
            name: "CS Admissions Agent".into(),
            description: "Specializes in university Computer Science program admissions".into(),
            provider: None,
            model: None,
            keywords: words(&[
                "concordia",
                "university",
                "admission",
                "computer science",
                "cs program",
                "application",
                "requirements",
                "gpa",
                "deadline",
                "tuition",
                "courses",
                "prerequisites",
                "department",
                "faculty",
                "undergraduate",
                "graduate",
            ]),
        },
        CategoryConfig {
            id: "ai".into(),
            name: "AI Knowledge Agent".into(),
            description: "Specializes in artificial intelligence related questions".into(),
            provider: None,
            model: None,
            keywords: words(&[
                "artificial intelligence",
                "machine learning",
                "deep learning",
                "neural network",
                "nlp",
                "natural language processing",
                "computer vision",
                "reinforcement learning",
                "ai model",
                "transformer",
                "gpt",
                "llm",
                "large language model",
                "bert",
                "training",
                "dataset",
                "supervised",
                "unsupervised",
                "algorithm",
            ]),
        },
    ]
}

impl AppConfig {
    /// Load configuration from the default path (~/.routewise/config.toml).
    ///
    /// Environment variables override the file:
    /// - `ROUTEWISE_API_KEY`
    /// - `ROUTEWISE_PROVIDER`
    /// - `ROUTEWISE_MODEL`, then `OLLAMA_MODEL`
    /// - `OLLAMA_BASE_URL` (api_url of the `ollama` provider)
    /// - `API_HOST`, `API_PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(key) = var("ROUTEWISE_API_KEY") {
            self.api_key = Some(key);
        }

        if let Some(provider) = var("ROUTEWISE_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = var("ROUTEWISE_MODEL").or_else(|| var("OLLAMA_MODEL")) {
            self.default_model = model;
        }

        if let Some(url) = var("OLLAMA_BASE_URL") {
            let url = url.trim_end_matches('/');
            let url = if url.ends_with("/v1") {
                url.to_string()
            } else {
                format!("{url}/v1")
            };
            self.providers
                .entry("ollama".into())
                .or_insert_with(|| ProviderConfig {
                    api_key: None,
                    api_url: None,
                    default_model: None,
                })
                .api_url = Some(url);
        }

        if let Some(host) = var("API_HOST") {
            self.gateway.host = host;
        }

        if let Some(port) = var("API_PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("API_PORT is not a valid port: {port}"))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".routewise")
    }

    /// Path of the config file inside [`AppConfig::config_dir`].
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.session.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "session.max_turns must be at least 1".into(),
            ));
        }

        if self.responder.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "responder.timeout_secs must be at least 1".into(),
            ));
        }

        let mut seen = HashSet::new();
        for category in &self.categories {
            if !seen.insert(category.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate category id '{}'",
                    category.id
                )));
            }
        }
        for category in &self.categories {
            if let Some(provider) = &category.provider {
                if provider != &self.default_provider && !self.providers.contains_key(provider) {
                    return Err(ConfigError::ValidationError(format!(
                        "category '{}' uses unknown provider '{provider}'",
                        category.id
                    )));
                }
            }
        }
        if !seen.contains(GENERAL_CATEGORY) {
            return Err(ConfigError::ValidationError(format!(
                "a '{GENERAL_CATEGORY}' category is required"
            )));
        }

        let mut seen = HashSet::new();
        for source in &self.knowledge.sources {
            if !seen.insert(source.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate knowledge source '{}'",
                    source.name
                )));
            }
        }

        Ok(())
    }

    /// Look up a category by id.
    pub fn category(&self, id: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// The provider a category's responder should use.
    pub fn provider_for<'a>(&'a self, category: &'a CategoryConfig) -> &'a str {
        category
            .provider
            .as_deref()
            .unwrap_or(&self.default_provider)
    }

    /// The model a category's responder should use.
    pub fn model_for(&self, category: &CategoryConfig) -> String {
        category
            .model
            .clone()
            .or_else(|| {
                self.providers
                    .get(self.provider_for(category))
                    .and_then(|p| p.default_model.clone())
            })
            .unwrap_or_else(|| self.default_model.clone())
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            session: SessionConfig::default(),
            knowledge: KnowledgeConfig::default(),
            responder: ResponderConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
            categories: default_categories(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
