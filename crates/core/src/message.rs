//! Session, turn and message domain types.
//!
//! A user query flows in as a [`Turn`], is stored in a session, and is
//! replayed to a responder as [`PairedTurn`]s. Providers speak in
//! [`Message`]s, which are the role-tagged wire form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Responder,
}

/// One message in a session. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn responder(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Responder,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A completed exchange, the form responders receive history in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedTurn {
    pub user: String,
    pub responder: String,
}

/// Pair each user turn with the responder turn that immediately follows it.
///
/// Turns that have no partner (a trailing user turn, a user turn whose
/// responder call failed, or a responder turn left orphaned by eviction)
/// are dropped.
pub fn pair_turns(turns: &[Turn]) -> Vec<PairedTurn> {
    let mut pairs = Vec::with_capacity(turns.len() / 2);
    let mut i = 0;
    while i + 1 < turns.len() {
        let (first, second) = (&turns[i], &turns[i + 1]);
        if first.speaker == Speaker::User && second.speaker == Speaker::Responder {
            pairs.push(PairedTurn {
                user: first.content.clone(),
                responder: second.content.clone(),
            });
            i += 2;
        } else {
            i += 1;
        }
    }
    pairs
}

/// The role of a message sender in a provider request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The model
    Assistant,
    /// System instructions (persona, rules)
    System,
}

/// A single role-tagged message sent to or received from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }
}
