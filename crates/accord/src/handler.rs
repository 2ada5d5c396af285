//! Per-connection handler: join resolution, then the negotiation loop.
//!
//! Each accepted connection gets its own Tokio task running this
//! handler. The flow is:
//!   1. Resolve the declared (session id, address) into a party slot —
//!      or close the connection if the session was never created.
//!   2. Join the session's room (evicting any older connection that
//!      declared the same address) and exchange the join events.
//!   3. Loop: react to select/approve/swapped events, mutating the
//!      stored record under the session's mutation lock and fanning
//!      events out through the room.

use std::sync::Arc;

use accord_protocol::{
    AssetRef, ClientEvent, Codec, Recipient, ServerEvent, SwapSession,
};
use accord_room::{RoomHandle, RoomOutbound};
use accord_session::{
    resolve_join, storage_key, SessionError, SessionStore,
};
use accord_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::ServerState;
use crate::AccordError;

/// Drop guard that removes the connection from its room when the
/// handler exits, however it exits. `Drop` is synchronous, so the
/// actual leave runs in a fire-and-forget task.
struct RoomGuard<S: SessionStore, C: Codec> {
    conn_id: ConnectionId,
    session_id: String,
    state: Arc<ServerState<S, C>>,
}

impl<S: SessionStore, C: Codec> Drop for RoomGuard<S, C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let session_id = std::mem::take(&mut self.session_id);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut rooms = state.rooms.lock().await;
            rooms.leave(&session_id, conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, C>>,
) -> Result<(), AccordError>
where
    S: SessionStore,
    C: Codec,
{
    let conn_id = conn.id();
    let identity = conn.identity().clone();
    let session_id = identity.session_id;
    let address = identity.address;

    // --- Step 1: Resolve the session ---
    // Sessions must pre-exist; an unknown id means reject and close.
    let outcome = match resolve_join(
        &state.store,
        &state.locks,
        &session_id,
        &address,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(SessionError::NotFound(_)) => {
            tracing::info!(
                %conn_id,
                %session_id,
                "join rejected: session does not exist"
            );
            let _ = conn.close().await;
            return Ok(());
        }
        Err(e) => return Err(AccordError::Session(e)),
    };

    tracing::info!(
        %conn_id,
        %session_id,
        %address,
        role = ?outcome.role,
        reconnected = outcome.reconnected,
        "participant joined"
    );

    // --- Step 2: Join the room ---
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let room = {
        let mut rooms = state.rooms.lock().await;
        rooms.get_or_create(&session_id)
    };
    let addresses = room
        .join(conn_id, address.clone(), outbound_tx)
        .await
        .map_err(AccordError::Room)?;

    let _guard = RoomGuard {
        conn_id,
        session_id: session_id.clone(),
        state: Arc::clone(&state),
    };

    // Snapshot to the joiner only; announcement to everyone else.
    send_event(
        &conn,
        &state.codec,
        &ServerEvent::Participants { addresses },
    )
    .await?;
    room.broadcast(
        Recipient::AllExcept(conn_id),
        ServerEvent::NewParticipant {
            address: address.clone(),
        },
    )
    .await
    .map_err(AccordError::Room)?;

    // --- Step 3: Negotiation loop ---
    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => match outbound {
                Some(RoomOutbound::Event(event)) => {
                    send_event(&conn, &state.codec, &event).await?;
                }
                Some(RoomOutbound::Evicted) => {
                    tracing::info!(
                        %conn_id,
                        %session_id,
                        "evicted: newer connection declared this address"
                    );
                    let _ = conn.close().await;
                    break;
                }
                None => break,
            },
            inbound = conn.recv() => match inbound {
                Ok(Some(data)) => {
                    let event: ClientEvent = match state.codec.decode(&data) {
                        Ok(event) => event,
                        Err(e) => {
                            tracing::debug!(
                                %conn_id,
                                error = %e,
                                "rejecting malformed event"
                            );
                            send_event(
                                &conn,
                                &state.codec,
                                &ServerEvent::Error {
                                    code: 400,
                                    message: format!("malformed event: {e}"),
                                },
                            )
                            .await?;
                            continue;
                        }
                    };
                    handle_event(
                        &conn, &state, &room, conn_id, &session_id,
                        &address, event,
                    )
                    .await?;
                }
                Ok(None) => {
                    tracing::info!(%conn_id, "connection closed cleanly");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "recv error");
                    break;
                }
            },
        }
    }

    // _guard drops here → room leave fires.
    Ok(())
}

/// Outcome of one read-modify-write cycle on the session record.
enum Mutation {
    /// The record was updated and persisted. `ready` is `true` when an
    /// approval completed the handshake (counterpart already approved).
    Applied { ready: bool, session: SwapSession },

    /// The issuing address holds no slot in this session.
    NoSlot,

    /// The record disappeared between join and this event.
    Vanished,
}

/// Processes one decoded client event.
async fn handle_event<S, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<S, C>>,
    room: &RoomHandle<ServerEvent>,
    conn_id: ConnectionId,
    session_id: &str,
    address: &str,
    event: ClientEvent,
) -> Result<(), AccordError>
where
    S: SessionStore,
    C: Codec,
{
    match event {
        ClientEvent::NftSelected(asset) => {
            tracing::debug!(%conn_id, session_id, "nft selected");
            match mutate_slot(state, session_id, address, &asset, false)
                .await?
            {
                Mutation::Applied { .. } => {
                    room.broadcast(
                        Recipient::AllExcept(conn_id),
                        ServerEvent::TargetNftSelected(asset),
                    )
                    .await
                    .map_err(AccordError::Room)?;
                }
                Mutation::NoSlot => {
                    send_no_slot_error(conn, state).await?;
                }
                Mutation::Vanished => {
                    tracing::warn!(
                        session_id,
                        "select dropped: session record vanished"
                    );
                }
            }
        }

        ClientEvent::NftApproved(asset) => {
            tracing::debug!(%conn_id, session_id, "nft approved");
            match mutate_slot(state, session_id, address, &asset, true)
                .await?
            {
                Mutation::Applied { ready, session } => {
                    // Only the side whose approval completed the
                    // handshake is told to proceed; the first approver
                    // gets no trigger.
                    if ready {
                        tracing::info!(
                            %conn_id,
                            session_id,
                            "both sides approved, signalling swap"
                        );
                        send_event(
                            conn,
                            &state.codec,
                            &ServerEvent::ProcessSwap(session),
                        )
                        .await?;
                    }
                    room.broadcast(
                        Recipient::AllExcept(conn_id),
                        ServerEvent::TargetNftApproved(asset),
                    )
                    .await
                    .map_err(AccordError::Room)?;
                }
                Mutation::NoSlot => {
                    send_no_slot_error(conn, state).await?;
                }
                Mutation::Vanished => {
                    tracing::warn!(
                        session_id,
                        "approve dropped: session record vanished"
                    );
                }
            }
        }

        ClientEvent::Swapped(payload) => {
            // Best-effort "done" notification, relayed verbatim to the
            // whole room — sender included, nothing verified.
            tracing::debug!(%conn_id, session_id, "swap completion relayed");
            room.broadcast(Recipient::All, ServerEvent::Swapped(payload))
                .await
                .map_err(AccordError::Room)?;
        }
    }

    Ok(())
}

/// Runs one select/approve cycle on the stored record, under the
/// session's mutation lock: load → locate slot → mutate → persist.
///
/// Nothing is broadcast from here; callers decide what the outcome
/// means for the room. A vanished record or a slotless issuer leaves
/// the store untouched.
async fn mutate_slot<S, C>(
    state: &Arc<ServerState<S, C>>,
    session_id: &str,
    address: &str,
    asset: &AssetRef,
    approve: bool,
) -> Result<Mutation, AccordError>
where
    S: SessionStore,
    C: Codec,
{
    let lock = state.locks.for_session(session_id);
    let _guard = lock.lock().await;

    let key = storage_key(session_id);
    let Some(mut session) =
        state.store.get(&key).await.map_err(AccordError::Session)?
    else {
        return Ok(Mutation::Vanished);
    };
    let Some(role) = session.role_of(address) else {
        return Ok(Mutation::NoSlot);
    };

    let ready = if approve {
        session.apply_approval(role, asset)
    } else {
        session.apply_selection(role, asset);
        false
    };

    state
        .store
        .set(&key, session.clone())
        .await
        .map_err(AccordError::Session)?;

    Ok(Mutation::Applied { ready, session })
}

/// Tells the issuer its event was ignored because it holds no slot.
async fn send_no_slot_error<S, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<S, C>>,
) -> Result<(), AccordError>
where
    S: SessionStore,
    C: Codec,
{
    send_event(
        conn,
        &state.codec,
        &ServerEvent::Error {
            code: 403,
            message: "no negotiating slot in this session".into(),
        },
    )
    .await
}

/// Encodes and sends a server event on this connection.
async fn send_event<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
    event: &ServerEvent,
) -> Result<(), AccordError> {
    let bytes = codec.encode(event).map_err(AccordError::Protocol)?;
    conn.send(&bytes).await.map_err(AccordError::Transport)?;
    Ok(())
}
