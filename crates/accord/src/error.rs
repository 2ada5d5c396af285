//! Unified error type for the Accord server.

use accord_protocol::ProtocolError;
use accord_room::RoomError;
use accord_session::SessionError;
use accord_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `accord` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attributes let the `?` operator convert sub-crate errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum AccordError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid event).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown session, store failure).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (room actor unavailable).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The HTTP surface failed to bind or serve.
    #[error("http surface error: {0}")]
    Http(#[source] std::io::Error),
}
