//! Error types for the session layer.

/// Errors that can occur around session storage and join resolution.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No record exists for the given session id. At join time this
    /// means the connection is rejected — sessions must be created
    /// through the HTTP surface before anyone can join them.
    #[error("session {0} not found")]
    NotFound(String),

    /// The backing store failed. Never produced by
    /// [`MemoryStore`](crate::MemoryStore), but external backends can
    /// fail.
    #[error("session store failure: {0}")]
    Store(String),
}
