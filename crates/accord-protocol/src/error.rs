//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, an unknown event tag, or missing
    /// payload fields.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The event is invalid at the protocol level — it decoded fine but
    /// violates protocol rules.
    #[error("invalid event: {0}")]
    InvalidEvent(String),
}
