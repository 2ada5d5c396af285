//! The session store: a minimal keyed record store.
//!
//! The store contract is deliberately thin — `get` and `set` by string
//! key, whole-record overwrite, last-write-wins. There is no delete:
//! records live as long as the store does. Anything smarter (TTLs,
//! versioning, external databases) belongs in an alternative
//! implementation of the trait.

use std::collections::HashMap;

use accord_protocol::SwapSession;
use tokio::sync::Mutex;

use crate::SessionError;

/// Builds the store key for a session id.
///
/// Every record lives under a `session-` prefix, leaving the rest of
/// the keyspace free for other record kinds.
pub fn storage_key(session_id: &str) -> String {
    format!("session-{session_id}")
}

/// A keyed store of swap-session records.
///
/// Implementations must be shareable across connection handler tasks.
/// The returned futures must be `Send` for the same reason — handlers
/// run on whatever worker thread Tokio picks.
pub trait SessionStore: Send + Sync + 'static {
    /// Loads the record stored under `key`, if any.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<SwapSession>, SessionError>> + Send;

    /// Stores `record` under `key`, replacing any previous value.
    fn set(
        &self,
        key: &str,
        record: SwapSession,
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// An in-process [`SessionStore`] backed by a `HashMap`.
///
/// Cloning is cheap and every clone sees the same records — the map
/// lives behind an `Arc`. Records are never evicted; they die with the
/// process.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: std::sync::Arc<Mutex<HashMap<String, SwapSession>>>,
}

impl MemoryStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<SwapSession>, SessionError> {
        Ok(self.records.lock().await.get(key).cloned())
    }

    async fn set(
        &self,
        key: &str,
        record: SwapSession,
    ) -> Result<(), SessionError> {
        self.records.lock().await.insert(key.to_string(), record);
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================
