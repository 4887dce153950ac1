//! # Routewise Core
//!
//! Domain types, traits, and error definitions for the Routewise query
//! orchestrator. This crate has **no framework dependencies**: it defines the
//! model that the session store, knowledge sources, responders and the
//! orchestrator all implement against.
//!
//! ## Design Philosophy
//!
//! Every external capability (text generation, knowledge lookup) is a trait
//! here. Implementations live in their respective crates, which keeps them
//! swappable via configuration and trivially mockable in tests.

pub mod error;
pub mod knowledge;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, KnowledgeError, ProviderError, Result};
pub use knowledge::{EncyclopediaSource, IndexSource, KnowledgeItem, ScoredDocument};
pub use message::{Message, PairedTurn, Role, SessionId, Speaker, Turn, pair_turns};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
