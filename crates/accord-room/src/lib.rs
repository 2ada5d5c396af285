//! Broadcast rooms for Accord.
//!
//! A room groups the live connections of one swap session. Each room
//! runs as an isolated Tokio task (actor model) and supports the full
//! broadcast-channel contract: deliver an event to everyone, to one
//! member, or to all-but-one; enumerate members with their declared
//! addresses; and evict a duplicate connection when an address joins
//! twice.
//!
//! # Key types
//!
//! - [`RoomManager`] — creates/destroys rooms, keyed by session id
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`RoomOutbound`] — what a member's handler receives (an event, or
//!   an eviction marker)

mod error;
mod manager;
mod room;

pub use error::RoomError;
pub use manager::RoomManager;
pub use room::{MemberSender, RoomHandle, RoomOutbound};
