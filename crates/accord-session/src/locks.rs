//! Per-session mutation locks.
//!
//! The store overwrites whole records with no version check, so two
//! interleaved read-modify-write cycles on the same session would
//! silently clobber each other's slot. [`SessionLocks`] serializes
//! those cycles: callers take the session's mutex before reading and
//! hold it until the write lands.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A registry handing out one async mutex per session id.
///
/// Lock entries are created on first use and kept for the life of the
/// process — the same lifetime as the records they guard.
#[derive(Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex guarding the given session.
    ///
    /// The caller locks the returned mutex around its whole
    /// read-modify-write cycle:
    ///
    /// ```rust,ignore
    /// let lock = locks.for_session(&session_id);
    /// let _guard = lock.lock().await;
    /// // get → mutate → set, atomically w.r.t. this session
    /// ```
    pub fn for_session(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock registry poisoned");
        Arc::clone(
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }
}

// =========================================================================
// Tests
// =========================================================================
