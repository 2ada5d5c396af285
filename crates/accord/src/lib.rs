//! # Accord
//!
//! Real-time coordination server for two-party atomic-swap handshakes.
//!
//! Two participants join a shared session, each selects an asset to
//! offer, each approves the counterpart's offer, and once both
//! approvals are in, the side that completed the handshake is signalled
//! to proceed with the swap. Accord orchestrates only the handshake —
//! it does not move assets, verify ownership, or guarantee atomicity
//! on-chain.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use accord::prelude::*;
//!
//! # async fn run() -> Result<(), AccordError> {
//! let server = AccordServerBuilder::new()
//!     .bind("0.0.0.0:6001")        // WebSocket transport
//!     .http_bind("0.0.0.0:6000")   // session create/lookup
//!     .build(MemoryStore::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod http;
mod server;

pub use error::AccordError;
pub use server::{AccordServer, AccordServerBuilder};

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::{AccordError, AccordServer, AccordServerBuilder};
    pub use accord_protocol::{
        AssetRef, ClientEvent, Codec, JsonCodec, PartySlot, Recipient,
        Role, ServerEvent, SwapSession,
    };
    pub use accord_session::{
        resolve_join, storage_key, JoinOutcome, MemoryStore, SessionLocks,
        SessionStore,
    };
}
