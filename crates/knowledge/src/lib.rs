//! Knowledge retrieval for Routewise.
//!
//! Sources come in two shapes (see [`routewise_core::knowledge`]); the
//! [`FusionEngine`] queries every enabled source concurrently, each under
//! its own timeout, and renders the results into a single context block.

pub mod embedding;
pub mod fusion;
pub mod source;
pub mod vector;
pub mod vector_index;
pub mod wikipedia;

pub use embedding::{Embedder, HashingEmbedder, ProviderEmbedder};
pub use fusion::{FusedKnowledge, FusionEngine, build_from_config};
pub use source::KnowledgeSource;
pub use vector_index::VectorIndexSource;
pub use wikipedia::WikipediaSource;
