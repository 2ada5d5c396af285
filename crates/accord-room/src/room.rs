//! Room actor: an isolated Tokio task that owns one session's live
//! connections.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel — no shared mutable state, just message
//! passing. The room knows nothing about negotiation semantics; it only
//! tracks members (connection id + declared address) and delivers
//! events to the requested recipients.

use std::collections::HashMap;

use accord_protocol::Recipient;
use accord_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::RoomError;

/// An outbound item delivered to a member's connection handler.
#[derive(Debug)]
pub enum RoomOutbound<E> {
    /// An event to forward to the client.
    Event(E),

    /// The member was evicted — a newer connection declared the same
    /// address. The handler should close its connection and exit.
    Evicted,
}

impl<E: Clone> Clone for RoomOutbound<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Event(e) => Self::Event(e.clone()),
            Self::Evicted => Self::Evicted,
        }
    }
}

/// Channel sender for delivering outbound items to one member.
pub type MemberSender<E> = mpsc::UnboundedSender<RoomOutbound<E>>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand<E> {
    /// Add a member, evicting any existing member with the same
    /// declared address first. Replies with the address snapshot of all
    /// members after admission (the joiner included).
    Join {
        conn_id: ConnectionId,
        address: String,
        sender: MemberSender<E>,
        reply: oneshot::Sender<Vec<String>>,
    },

    /// Remove a member. Replies with the number of members remaining.
    /// Removing an absent member is a no-op (eviction may already have
    /// taken it out).
    Leave {
        conn_id: ConnectionId,
        reply: oneshot::Sender<usize>,
    },

    /// Deliver an event to the given recipients.
    Broadcast { recipient: Recipient, event: E },

    /// Enumerate current members and their declared addresses.
    Members {
        reply: oneshot::Sender<Vec<(ConnectionId, String)>>,
    },

    /// Shut down the room.
    Shutdown,
}

/// Handle to a running room actor. Cheap to clone.
pub struct RoomHandle<E> {
    session_id: String,
    sender: mpsc::Sender<RoomCommand<E>>,
}

impl<E> Clone for RoomHandle<E> {
    fn clone(&self) -> Self {
        Self {
            session_id: self.session_id.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<E: Clone + Send + 'static> RoomHandle<E> {
    /// Returns the session id this room belongs to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Adds a member to the room, evicting any duplicate of its address.
    ///
    /// Returns the member address snapshot after admission.
    pub async fn join(
        &self,
        conn_id: ConnectionId,
        address: String,
        sender: MemberSender<E>,
    ) -> Result<Vec<String>, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                conn_id,
                address,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.session_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.session_id.clone()))
    }

    /// Removes a member. Returns the number of members remaining.
    pub async fn leave(
        &self,
        conn_id: ConnectionId,
    ) -> Result<usize, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave {
                conn_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.session_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.session_id.clone()))
    }

    /// Delivers an event to the given recipients (fire-and-forget).
    pub async fn broadcast(
        &self,
        recipient: Recipient,
        event: E,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Broadcast { recipient, event })
            .await
            .map_err(|_| RoomError::Unavailable(self.session_id.clone()))
    }

    /// Enumerates current members and their declared addresses.
    pub async fn members(
        &self,
    ) -> Result<Vec<(ConnectionId, String)>, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Members { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.session_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.session_id.clone()))
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.session_id.clone()))
    }
}

/// One admitted connection.
struct Member<E> {
    address: String,
    sender: MemberSender<E>,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<E> {
    session_id: String,
    members: HashMap<ConnectionId, Member<E>>,
    receiver: mpsc::Receiver<RoomCommand<E>>,
}

impl<E: Clone + Send + 'static> RoomActor<E> {
    /// Runs the actor loop, processing commands until shutdown.
    async fn run(mut self) {
        tracing::debug!(session_id = %self.session_id, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    conn_id,
                    address,
                    sender,
                    reply,
                } => {
                    let snapshot = self.handle_join(conn_id, address, sender);
                    let _ = reply.send(snapshot);
                }
                RoomCommand::Leave { conn_id, reply } => {
                    let remaining = self.handle_leave(conn_id);
                    let _ = reply.send(remaining);
                }
                RoomCommand::Broadcast { recipient, event } => {
                    self.dispatch(recipient, event);
                }
                RoomCommand::Members { reply } => {
                    let members = self
                        .members
                        .iter()
                        .map(|(id, m)| (*id, m.address.clone()))
                        .collect();
                    let _ = reply.send(members);
                }
                RoomCommand::Shutdown => {
                    tracing::debug!(
                        session_id = %self.session_id,
                        "room shutting down"
                    );
                    break;
                }
            }
        }

        tracing::debug!(session_id = %self.session_id, "room actor stopped");
    }

    /// Admits a member, evicting any existing member with the same
    /// declared address first. At most one live connection per
    /// (session, address) pair.
    fn handle_join(
        &mut self,
        conn_id: ConnectionId,
        address: String,
        sender: MemberSender<E>,
    ) -> Vec<String> {
        let duplicate = self
            .members
            .iter()
            .find(|(id, m)| m.address == address && **id != conn_id)
            .map(|(id, _)| *id);
        if let Some(old_id) = duplicate {
            if let Some(old) = self.members.remove(&old_id) {
                let _ = old.sender.send(RoomOutbound::Evicted);
                tracing::info!(
                    session_id = %self.session_id,
                    conn_id = %old_id,
                    address = %address,
                    "evicted duplicate connection"
                );
            }
        }

        self.members.insert(conn_id, Member { address, sender });
        tracing::info!(
            session_id = %self.session_id,
            %conn_id,
            members = self.members.len(),
            "member joined"
        );

        self.members.values().map(|m| m.address.clone()).collect()
    }

    fn handle_leave(&mut self, conn_id: ConnectionId) -> usize {
        if self.members.remove(&conn_id).is_some() {
            tracing::info!(
                session_id = %self.session_id,
                %conn_id,
                members = self.members.len(),
                "member left"
            );
        }
        self.members.len()
    }

    /// Delivers an event to the requested recipients.
    fn dispatch(&self, recipient: Recipient, event: E) {
        match recipient {
            Recipient::All => {
                for id in self.members.keys() {
                    self.send_to(*id, RoomOutbound::Event(event.clone()));
                }
            }
            Recipient::Member(id) => {
                self.send_to(id, RoomOutbound::Event(event));
            }
            Recipient::AllExcept(excluded) => {
                for id in self.members.keys() {
                    if *id != excluded {
                        self.send_to(
                            *id,
                            RoomOutbound::Event(event.clone()),
                        );
                    }
                }
            }
        }
    }

    /// Sends an outbound item to a single member. Silently drops if the
    /// receiver is gone (member disconnected).
    fn send_to(&self, conn_id: ConnectionId, item: RoomOutbound<E>) {
        if let Some(member) = self.members.get(&conn_id) {
            let _ = member.sender.send(item);
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
///
/// `channel_size` bounds the command channel — senders wait when the
/// actor falls behind.
pub(crate) fn spawn_room<E: Clone + Send + 'static>(
    session_id: String,
    channel_size: usize,
) -> RoomHandle<E> {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor::<E> {
        session_id: session_id.clone(),
        members: HashMap::new(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        session_id,
        sender: tx,
    }
}
