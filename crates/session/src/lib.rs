//! Conversation sessions for Routewise.
//!
//! The [`SessionStore`] owns every session's history for the lifetime of
//! the process. Each session sits behind its own mutex, so appends to one
//! conversation never wait on another. The outer map lock is only held
//! long enough to look up or insert a session handle.
//!
//! A whole query/reply exchange is serialized per session with
//! [`SessionStore::begin_exchange`], so concurrent callers on one id can
//! never interleave their turns.

use std::collections::HashMap;
use std::sync::Arc;

use routewise_core::message::{PairedTurn, SessionId, Turn, pair_turns};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

#[derive(Default)]
struct Session {
    turns: Mutex<Vec<Turn>>,
    exchange: Arc<Mutex<()>>,
}

type SessionHandle = Arc<Session>;

/// Held for the duration of one exchange on a session.
pub type ExchangeGuard = OwnedMutexGuard<()>;

/// In-memory, bounded session store.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    max_turns: usize,
}

impl SessionStore {
    /// Create a store that retains at most `max_turns` exchanges
    /// (`2 * max_turns` turns) per session.
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_turns: max_turns.max(1),
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Resolve or create a session. A missing id gets a fresh uuid.
    pub async fn create_session(&self, id: Option<SessionId>) -> SessionId {
        let id = id.unwrap_or_default();
        self.handle(&id).await;
        id
    }

    /// Wait for exclusive use of a session, creating it if needed.
    ///
    /// Turns may still be appended while the guard is held; the guard only
    /// excludes other exchanges.
    pub async fn begin_exchange(&self, id: &SessionId) -> ExchangeGuard {
        let handle = self.handle(id).await;
        Arc::clone(&handle.exchange).lock_owned().await
    }

    /// Append a turn, creating the session on first reference, then evict
    /// the oldest turns beyond the cap.
    pub async fn append_turn(&self, id: &SessionId, turn: Turn) {
        let handle = self.handle(id).await;
        let mut turns = handle.turns.lock().await;
        turns.push(turn);

        let cap = self.max_turns * 2;
        if turns.len() > cap {
            let excess = turns.len() - cap;
            turns.drain(..excess);
            debug!(session_id = %id, evicted = excess, "Trimmed session history");
        }
    }

    /// Ordered history; empty for an unknown id.
    pub async fn history(&self, id: &SessionId) -> Vec<Turn> {
        match self.existing(id).await {
            Some(handle) => handle.turns.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// History folded into `{user, responder}` exchanges.
    pub async fn paired_history(&self, id: &SessionId) -> Vec<PairedTurn> {
        match self.existing(id).await {
            Some(handle) => pair_turns(&handle.turns.lock().await),
            None => Vec::new(),
        }
    }

    /// Empty a session's history but keep the session itself.
    pub async fn clear(&self, id: &SessionId) {
        if let Some(handle) = self.existing(id).await {
            handle.turns.lock().await.clear();
        }
    }

    /// Forget a session entirely. No-op for an unknown id.
    pub async fn delete(&self, id: &SessionId) {
        if self.sessions.write().await.remove(id).is_some() {
            debug!(session_id = %id, "Deleted session");
        }
    }

    /// Ids of all live sessions, sorted.
    pub async fn list(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn contains(&self, id: &SessionId) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    async fn existing(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    async fn handle(&self, id: &SessionId) -> SessionHandle {
        if let Some(handle) = self.existing(id).await {
            return handle;
        }
        self.sessions
            .write()
            .await
            .entry(id.clone())
            .or_insert_with(|| {
                debug!(session_id = %id, "Created session");
                Arc::new(Session::default())
            })
            .clone()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routewise_core::message::Speaker;

    #[tokio::test]
    async fn create_without_id_generates_unique_ids() {
        let store = SessionStore::new(10);
        let a = store.create_session(None).await;
        let b = store.create_session(None).await;
        assert_ne!(a, b);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn create_with_known_id_is_noop() {
        let store = SessionStore::new(10);
        let id = SessionId::from("abc");
        store.create_session(Some(id.clone())).await;
        store.append_turn(&id, Turn::user("hello")).await;

        let again = store.create_session(Some(id.clone())).await;
        assert_eq!(again, id);
        assert_eq!(store.history(&id).await.len(), 1);
    }

    #[tokio::test]
    async fn append_creates_unknown_session() {
        let store = SessionStore::new(10);
        let id = SessionId::from("implicit");
        assert!(!store.contains(&id).await);

        store.append_turn(&id, Turn::user("hi")).await;
        assert!(store.contains(&id).await);
        assert_eq!(store.history(&id).await[0].content, "hi");
    }

    #[tokio::test]
    async fn unknown_session_reads_as_empty() {
        let store = SessionStore::new(10);
        let id = SessionId::from("nope");
        assert!(store.history(&id).await.is_empty());
        assert!(store.paired_history(&id).await.is_empty());
        assert!(!store.contains(&id).await);
    }

    #[tokio::test]
    async fn history_is_capped_to_most_recent_suffix() {
        let store = SessionStore::new(3);
        let id = SessionId::from("cap");

        for i in 0..20 {
            store.append_turn(&id, Turn::user(format!("q{i}"))).await;
            store.append_turn(&id, Turn::responder(format!("a{i}"))).await;
            assert!(store.history(&id).await.len() <= 6);
        }

        let contents: Vec<String> = store
            .history(&id)
            .await
            .into_iter()
            .map(|t| t.content)
            .collect();
        assert_eq!(contents, vec!["q17", "a17", "q18", "a18", "q19", "a19"]);
    }

    #[tokio::test]
    async fn eviction_keeps_pairs_aligned() {
        let store = SessionStore::new(2);
        let id = SessionId::from("pairs");
        for i in 0..5 {
            store.append_turn(&id, Turn::user(format!("q{i}"))).await;
            store.append_turn(&id, Turn::responder(format!("a{i}"))).await;
        }
        let history = store.history(&id).await;
        assert_eq!(history[0].speaker, Speaker::User);
        assert_eq!(store.paired_history(&id).await.len(), 2);
    }

    #[tokio::test]
    async fn clear_and_delete_are_idempotent() {
        let store = SessionStore::new(10);
        let id = SessionId::from("x");
        store.append_turn(&id, Turn::user("one")).await;

        store.clear(&id).await;
        store.clear(&id).await;
        assert!(store.history(&id).await.is_empty());
        assert!(store.contains(&id).await);

        store.delete(&id).await;
        store.delete(&id).await;
        assert!(!store.contains(&id).await);

        store.clear(&SessionId::from("never")).await;
        store.delete(&SessionId::from("never")).await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn list_returns_sorted_ids() {
        let store = SessionStore::new(10);
        store.create_session(Some("b".into())).await;
        store.create_session(Some("a".into())).await;
        let ids: Vec<String> = store.list().await.into_iter().map(|s| s.0).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn paired_history_skips_dangling_user_turn() {
        let store = SessionStore::new(10);
        let id = SessionId::from("p");
        store.append_turn(&id, Turn::user("q1")).await;
        store.append_turn(&id, Turn::responder("a1")).await;
        store.append_turn(&id, Turn::user("q2")).await;

        let paired = store.paired_history(&id).await;
        assert_eq!(paired.len(), 1);
        assert_eq!(paired[0].user, "q1");
        assert_eq!(paired[0].responder, "a1");
    }

    #[tokio::test]
    async fn concurrent_appends_to_one_session_are_serialized() {
        let store = Arc::new(SessionStore::new(100));
        let id = SessionId::from("shared");

        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let store = Arc::clone(&store);
                let id = id.clone();
                tokio::spawn(async move {
                    store.append_turn(&id, Turn::user(format!("m{i}"))).await;
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.history(&id).await.len(), 50);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_sessions_are_independent() {
        let store = Arc::new(SessionStore::new(10));

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let id = SessionId::from(format!("s{i}"));
                    store.append_turn(&id, Turn::user("q")).await;
                    store.append_turn(&id, Turn::responder("a")).await;
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.len().await, 20);
        for id in store.list().await {
            assert_eq!(store.history(&id).await.len(), 2);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exchange_guard_excludes_only_its_own_session() {
        use std::time::Duration;

        let store = SessionStore::new(10);
        let a = SessionId::from("a");
        let guard = store.begin_exchange(&a).await;
        assert!(store.contains(&a).await);

        let blocked = tokio::time::timeout(Duration::from_millis(10), store.begin_exchange(&a)).await;
        assert!(blocked.is_err());

        let other = tokio::time::timeout(
            Duration::from_millis(10),
            store.begin_exchange(&SessionId::from("b")),
        )
        .await;
        assert!(other.is_ok());

        store.append_turn(&a, Turn::user("still writable")).await;
        drop(guard);
        let again = tokio::time::timeout(Duration::from_millis(10), store.begin_exchange(&a)).await;
        assert!(again.is_ok());
    }
}
