//! Core protocol types: the swap-session record and the events that
//! travel on the wire.
//!
//! Everything here is serialized to JSON and crossed with a browser
//! client, so the serde attributes pin the exact wire shape: event tags
//! are kebab-case (`"nft-selected"`), payload fields are camelCase
//! (`"contractAddress"`). The session record uses the same shape in the
//! store, over HTTP, and inside the `process-swap` event.

use serde::{Deserialize, Serialize};
use std::fmt;

use accord_transport::ConnectionId;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// One of the two symmetric party roles within a session.
///
/// The first distinct address to join a session occupies `X`, the second
/// occupies `Y`. Roles never change once bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    X,
    Y,
}

impl Role {
    /// Returns the other party's role.
    pub fn counterpart(self) -> Role {
        match self {
            Role::X => Role::Y,
            Role::Y => Role::X,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::X => write!(f, "x"),
            Role::Y => write!(f, "y"),
        }
    }
}

// ---------------------------------------------------------------------------
// AssetRef
// ---------------------------------------------------------------------------

/// Identifies the asset a party offers: a contract address plus a token
/// id within that contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRef {
    pub contract_address: String,
    pub token_id: String,
}

// ---------------------------------------------------------------------------
// PartySlot / SwapSession
// ---------------------------------------------------------------------------

/// One party's half of the negotiation.
///
/// An empty `addr` means the slot is unassigned; empty asset fields mean
/// nothing has been selected yet. `approved` is only meaningful relative
/// to the current selection — changing the selection clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartySlot {
    pub addr: String,
    pub contract_addr: String,
    pub token_id: String,
    pub approved: bool,
}

impl PartySlot {
    /// Returns `true` if no address has been bound to this slot.
    pub fn is_unassigned(&self) -> bool {
        self.addr.is_empty()
    }
}

/// The shared negotiation record for one swap attempt.
///
/// Slot state machine, per side:
///
/// ```text
/// EMPTY ──(select)──→ SELECTED(approved=false) ──(approve)──→ APPROVED
///                            ↑                                    │
///                            └────────────(select)────────────────┘
/// ```
///
/// Swap readiness is the derived condition `x.approved && y.approved`;
/// it is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapSession {
    /// Creation time in wall-clock milliseconds. Informational only.
    pub timestamp: u64,
    pub x: PartySlot,
    pub y: PartySlot,
}

impl SwapSession {
    /// Creates a fresh record: both slots unassigned and unapproved.
    pub fn new(timestamp: u64) -> Self {
        Self {
            timestamp,
            x: PartySlot::default(),
            y: PartySlot::default(),
        }
    }

    /// Returns the slot for the given role.
    pub fn slot(&self, role: Role) -> &PartySlot {
        match role {
            Role::X => &self.x,
            Role::Y => &self.y,
        }
    }

    /// Returns the slot for the given role, mutably.
    pub fn slot_mut(&mut self, role: Role) -> &mut PartySlot {
        match role {
            Role::X => &mut self.x,
            Role::Y => &mut self.y,
        }
    }

    /// Returns the role bound to `addr`, if any.
    ///
    /// An empty address never matches — empty means unassigned.
    pub fn role_of(&self, addr: &str) -> Option<Role> {
        if addr.is_empty() {
            return None;
        }
        if self.x.addr == addr {
            Some(Role::X)
        } else if self.y.addr == addr {
            Some(Role::Y)
        } else {
            None
        }
    }

    /// Binds `addr` to the first unassigned slot, X before Y.
    ///
    /// Returns `None` when both slots are already occupied by other
    /// addresses. Callers should check [`role_of`](Self::role_of) first
    /// to distinguish reconnection from a fresh join.
    pub fn bind(&mut self, addr: &str) -> Option<Role> {
        if self.x.is_unassigned() {
            self.x.addr = addr.to_string();
            Some(Role::X)
        } else if self.y.is_unassigned() {
            self.y.addr = addr.to_string();
            Some(Role::Y)
        } else {
            None
        }
    }

    /// Records a selection for one side.
    ///
    /// Always clears that side's approval — a new selection invalidates
    /// any approval given for the previous one. The counterpart's slot
    /// is untouched.
    pub fn apply_selection(&mut self, role: Role, asset: &AssetRef) {
        let slot = self.slot_mut(role);
        slot.contract_addr = asset.contract_address.clone();
        slot.token_id = asset.token_id.clone();
        slot.approved = false;
    }

    /// Records an approval for one side.
    ///
    /// Returns `true` if the counterpart was already approved — i.e.
    /// this approval completes the handshake and the caller should
    /// signal swap readiness.
    pub fn apply_approval(&mut self, role: Role, asset: &AssetRef) -> bool {
        let slot = self.slot_mut(role);
        slot.contract_addr = asset.contract_address.clone();
        slot.token_id = asset.token_id.clone();
        slot.approved = true;
        self.slot(role.counterpart()).approved
    }

    /// Returns `true` when both sides have approved.
    pub fn both_approved(&self) -> bool {
        self.x.approved && self.y.approved
    }
}

// ---------------------------------------------------------------------------
// Recipient — who should receive an event?
// ---------------------------------------------------------------------------

/// Specifies which room members should receive a server event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every member of the room, including the sender.
    All,

    /// One specific connection.
    Member(ConnectionId),

    /// Everyone except the specified connection. Used for "your
    /// counterpart did something" broadcasts.
    AllExcept(ConnectionId),
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events a client sends to the server.
///
/// `#[serde(tag = "event", content = "data")]` produces adjacently
/// tagged JSON matching the wire format:
///   `{ "event": "nft-selected", "data": { "contractAddress": ..., "tokenId": ... } }`
///
/// Anything that fails to decode into one of these variants is rejected
/// at the boundary with an error event — malformed payloads never reach
/// the negotiation logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// The sender declares which asset it offers.
    NftSelected(AssetRef),

    /// The sender approves; carries the asset the approval refers to.
    NftApproved(AssetRef),

    /// Best-effort "swap done" notification. The payload is opaque and
    /// relayed verbatim to the whole room.
    Swapped(serde_json::Value),
}

/// Events the server sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// A participant joined the room. Sent to everyone else.
    NewParticipant { address: String },

    /// Snapshot of all member addresses. Sent to the joiner only.
    Participants { addresses: Vec<String> },

    /// The counterpart selected an asset. Sent to all-but-sender.
    TargetNftSelected(AssetRef),

    /// The counterpart approved. Sent to all-but-sender.
    TargetNftApproved(AssetRef),

    /// Both sides have approved; the receiving side should proceed with
    /// the swap. Sent to the connection whose approval completed the
    /// handshake, carrying the full session record.
    ProcessSwap(SwapSession),

    /// Relayed "swap done" payload, to the whole room including sender.
    Swapped(serde_json::Value),

    /// A request was malformed or not applicable. `code` follows
    /// HTTP-style conventions (400 = malformed, 403 = no slot).
    Error { code: u16, message: String },
}

// =========================================================================
// Tests
// =========================================================================
