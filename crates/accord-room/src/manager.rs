//! Room manager: creates rooms on demand and tears them down when
//! they empty.
//!
//! Rooms are keyed by session id — the room IS the session's broadcast
//! channel. Unlike the store (where records live forever), a room only
//! exists while at least one connection is in it.

use std::collections::HashMap;

use accord_transport::ConnectionId;

use crate::room::spawn_room;
use crate::RoomHandle;

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Manages all live rooms, keyed by session id.
pub struct RoomManager<E> {
    rooms: HashMap<String, RoomHandle<E>>,
}

impl<E: Clone + Send + 'static> RoomManager<E> {
    /// Creates a new, empty room manager.
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
        }
    }

    /// Returns the room for a session, spawning it on first use.
    pub fn get_or_create(&mut self, session_id: &str) -> RoomHandle<E> {
        if let Some(handle) = self.rooms.get(session_id) {
            return handle.clone();
        }
        let handle =
            spawn_room(session_id.to_string(), DEFAULT_CHANNEL_SIZE);
        self.rooms.insert(session_id.to_string(), handle.clone());
        tracing::info!(session_id, "room created");
        handle
    }

    /// Returns the room for a session, if one is live.
    pub fn get(&self, session_id: &str) -> Option<RoomHandle<E>> {
        self.rooms.get(session_id).cloned()
    }

    /// Removes a member from its room, shutting the room down when the
    /// last member leaves.
    pub async fn leave(&mut self, session_id: &str, conn_id: ConnectionId) {
        let Some(handle) = self.rooms.get(session_id).cloned() else {
            return;
        };
        match handle.leave(conn_id).await {
            Ok(0) => {
                let _ = handle.shutdown().await;
                self.rooms.remove(session_id);
                tracing::info!(session_id, "room emptied, destroyed");
            }
            Ok(_) => {}
            Err(e) => {
                // Actor already gone — drop the stale handle.
                tracing::debug!(session_id, error = %e, "leave on dead room");
                self.rooms.remove(session_id);
            }
        }
    }

    /// Returns the number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl<E: Clone + Send + 'static> Default for RoomManager<E> {
    fn default() -> Self {
        Self::new()
    }
}
