//! Query orchestration for Routewise.
//!
//! A query is routed to one responder category by keyword voting
//! ([`SelectionPolicy`]), augmented with fused knowledge, answered by the
//! category's [`Responder`], and recorded in its session by the
//! [`Orchestrator`].

pub mod orchestrator;
pub mod responder;
pub mod selection;

pub use orchestrator::{Orchestrator, RouteOutcome};
pub use responder::{CategoryInfo, ProviderResponder, Responder, ResponderRegistry};
pub use selection::{DecisionPhase, RoutingDecision, SelectionPolicy};

#[cfg(test)]
pub(crate) mod test_helpers;
