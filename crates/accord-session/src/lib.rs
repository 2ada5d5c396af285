//! Session persistence and lifecycle for Accord.
//!
//! This crate handles everything around the stored negotiation record:
//!
//! 1. **Storage** — the [`SessionStore`] trait: a plain get/set keyed by
//!    string, last-write-wins. [`MemoryStore`] is the in-process default.
//! 2. **Serialization of mutations** — [`SessionLocks`] hands out one
//!    async mutex per session id so every read-modify-write cycle on a
//!    record appears atomic, even though the store itself has no
//!    transactions or compare-and-swap.
//! 3. **Join resolution** — [`resolve_join`] turns a connecting
//!    (session id, address) pair into a party slot, or rejects it.
//!
//! # How it fits in the stack
//!
//! ```text
//! Negotiation handler (above)  ← mutates records through store + locks
//!     ↕
//! Session layer (this crate)   ← owns the record lifecycle
//!     ↕
//! Protocol layer (below)       ← provides the SwapSession record type
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod lifecycle;
mod locks;
mod store;

pub use error::SessionError;
pub use lifecycle::{resolve_join, JoinOutcome};
pub use locks::SessionLocks;
pub use store::{storage_key, MemoryStore, SessionStore};
