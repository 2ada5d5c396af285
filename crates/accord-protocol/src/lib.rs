//! Wire protocol for Accord.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`SwapSession`], etc.)
//!   — the structures that travel on the wire and in the session store.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those events are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! The protocol layer sits between transport (raw bytes) and session
//! (slot bookkeeping). It doesn't know about connections or rooms.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AssetRef, ClientEvent, PartySlot, Recipient, Role, ServerEvent,
    SwapSession,
};
