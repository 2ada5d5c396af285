//! Join resolution: turning a connecting (session id, address) pair
//! into a party slot.
//!
//! This is the session lifecycle manager's core operation. Sessions are
//! created out-of-band (HTTP surface); by the time a participant
//! connects, the record must already exist or the connection is
//! rejected.

use accord_protocol::{Role, SwapSession};

use crate::{storage_key, SessionError, SessionLocks, SessionStore};

/// The result of resolving a join.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// The session record as persisted after resolution.
    pub session: SwapSession,

    /// The slot bound to this address. `None` means both slots were
    /// already occupied by other addresses — the connection is admitted
    /// to the room but holds no negotiating slot.
    pub role: Option<Role>,

    /// `true` if the address was already bound to a slot (a browser
    /// refresh or network-drop reconnect). Reconnection never mutates
    /// the record.
    pub reconnected: bool,
}

/// Resolves a connecting participant into a slot.
///
/// Runs the whole load-classify-bind-persist cycle under the session's
/// mutation lock, so two participants joining simultaneously cannot
/// both grab slot X. The record is persisted back before returning,
/// guaranteeing a consistent base state before any negotiation event
/// from this connection is processed.
///
/// # Errors
/// - [`SessionError::NotFound`] — no record for this session id; the
///   caller must reject (close) the connection.
/// - [`SessionError::Store`] — the backing store failed.
pub async fn resolve_join<S: SessionStore>(
    store: &S,
    locks: &SessionLocks,
    session_id: &str,
    address: &str,
) -> Result<JoinOutcome, SessionError> {
    let lock = locks.for_session(session_id);
    let _guard = lock.lock().await;

    let key = storage_key(session_id);
    let mut session = store
        .get(&key)
        .await?
        .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

    let (role, reconnected) = match session.role_of(address) {
        Some(existing) => (Some(existing), true),
        None => (session.bind(address), false),
    };

    store.set(&key, session.clone()).await?;

    tracing::info!(
        session_id,
        address,
        ?role,
        reconnected,
        "join resolved"
    );

    Ok(JoinOutcome {
        session,
        role,
        reconnected,
    })
}

// =========================================================================
// Tests
// =========================================================================
