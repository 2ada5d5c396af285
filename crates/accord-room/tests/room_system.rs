//! Integration tests for the room system: admission, eviction,
//! recipient-addressed dispatch, and teardown on empty.

use accord_protocol::Recipient;
use accord_room::{MemberSender, RoomManager, RoomOutbound};
use accord_transport::ConnectionId;
use tokio::sync::mpsc;

type Outbound = mpsc::UnboundedReceiver<RoomOutbound<String>>;

fn member_channel() -> (MemberSender<String>, Outbound) {
    mpsc::unbounded_channel()
}

fn cid(id: u64) -> ConnectionId {
    ConnectionId::new(id)
}

/// Drains the next outbound item, panicking if none arrives in time.
async fn next_item(rx: &mut Outbound) -> RoomOutbound<String> {
    tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for outbound item")
        .expect("channel closed")
}

fn expect_event(item: RoomOutbound<String>) -> String {
    match item {
        RoomOutbound::Event(e) => e,
        RoomOutbound::Evicted => panic!("expected event, got eviction"),
    }
}

// =========================================================================
// Admission and snapshots
// =========================================================================

#[tokio::test]
async fn test_join_returns_snapshot_including_joiner() {
    let mut mgr: RoomManager<String> = RoomManager::new();
    let room = mgr.get_or_create("abc");

    let (tx1, _rx1) = member_channel();
    let snapshot = room.join(cid(1), "0xA".into(), tx1).await.unwrap();
    assert_eq!(snapshot, vec!["0xA".to_string()]);

    let (tx2, _rx2) = member_channel();
    let mut snapshot = room.join(cid(2), "0xB".into(), tx2).await.unwrap();
    snapshot.sort();
    assert_eq!(snapshot, vec!["0xA".to_string(), "0xB".to_string()]);
}

#[tokio::test]
async fn test_members_enumerates_addresses() {
    let mut mgr: RoomManager<String> = RoomManager::new();
    let room = mgr.get_or_create("abc");

    let (tx1, _rx1) = member_channel();
    let (tx2, _rx2) = member_channel();
    room.join(cid(1), "0xA".into(), tx1).await.unwrap();
    room.join(cid(2), "0xB".into(), tx2).await.unwrap();

    let mut members = room.members().await.unwrap();
    members.sort_by_key(|(id, _)| id.into_inner());
    assert_eq!(
        members,
        vec![(cid(1), "0xA".to_string()), (cid(2), "0xB".to_string())]
    );
}

#[tokio::test]
async fn test_get_or_create_reuses_live_room() {
    let mut mgr: RoomManager<String> = RoomManager::new();
    let a = mgr.get_or_create("abc");
    let b = mgr.get_or_create("abc");

    let (tx, _rx) = member_channel();
    a.join(cid(1), "0xA".into(), tx).await.unwrap();

    // The second handle sees the member joined through the first.
    let members = b.members().await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(mgr.room_count(), 1);
}

// =========================================================================
// Eviction
// =========================================================================

#[tokio::test]
async fn test_duplicate_address_evicts_older_connection() {
    let mut mgr: RoomManager<String> = RoomManager::new();
    let room = mgr.get_or_create("abc");

    let (tx_old, mut rx_old) = member_channel();
    room.join(cid(1), "0xA".into(), tx_old).await.unwrap();

    // Same address joins again on a new connection.
    let (tx_new, _rx_new) = member_channel();
    let snapshot = room.join(cid(2), "0xA".into(), tx_new).await.unwrap();

    // The old connection gets the eviction marker...
    assert!(matches!(next_item(&mut rx_old).await, RoomOutbound::Evicted));
    // ...and the snapshot holds exactly one entry for the address.
    assert_eq!(snapshot, vec!["0xA".to_string()]);

    let members = room.members().await.unwrap();
    assert_eq!(members, vec![(cid(2), "0xA".to_string())]);
}

#[tokio::test]
async fn test_eviction_spares_other_addresses() {
    let mut mgr: RoomManager<String> = RoomManager::new();
    let room = mgr.get_or_create("abc");

    let (tx_a, mut rx_a) = member_channel();
    let (tx_b, _rx_b) = member_channel();
    room.join(cid(1), "0xA".into(), tx_a).await.unwrap();
    room.join(cid(2), "0xB".into(), tx_b).await.unwrap();

    // B reconnects; A must not be disturbed.
    let (tx_b2, _rx_b2) = member_channel();
    room.join(cid(3), "0xB".into(), tx_b2).await.unwrap();

    room.broadcast(Recipient::Member(cid(1)), "ping".into())
        .await
        .unwrap();
    assert_eq!(expect_event(next_item(&mut rx_a).await), "ping");
}

// =========================================================================
// Dispatch
// =========================================================================

#[tokio::test]
async fn test_broadcast_all_reaches_every_member() {
    let mut mgr: RoomManager<String> = RoomManager::new();
    let room = mgr.get_or_create("abc");

    let (tx1, mut rx1) = member_channel();
    let (tx2, mut rx2) = member_channel();
    room.join(cid(1), "0xA".into(), tx1).await.unwrap();
    room.join(cid(2), "0xB".into(), tx2).await.unwrap();

    room.broadcast(Recipient::All, "swapped".into()).await.unwrap();

    assert_eq!(expect_event(next_item(&mut rx1).await), "swapped");
    assert_eq!(expect_event(next_item(&mut rx2).await), "swapped");
}

#[tokio::test]
async fn test_broadcast_all_except_skips_sender() {
    let mut mgr: RoomManager<String> = RoomManager::new();
    let room = mgr.get_or_create("abc");

    let (tx1, mut rx1) = member_channel();
    let (tx2, mut rx2) = member_channel();
    room.join(cid(1), "0xA".into(), tx1).await.unwrap();
    room.join(cid(2), "0xB".into(), tx2).await.unwrap();

    room.broadcast(Recipient::AllExcept(cid(1)), "selected".into())
        .await
        .unwrap();

    assert_eq!(expect_event(next_item(&mut rx2).await), "selected");

    // Deliver a follow-up to member 1 and verify it arrives FIRST —
    // proving the AllExcept event was never queued for it.
    room.broadcast(Recipient::Member(cid(1)), "direct".into())
        .await
        .unwrap();
    assert_eq!(expect_event(next_item(&mut rx1).await), "direct");
}

#[tokio::test]
async fn test_broadcast_member_targets_one_connection() {
    let mut mgr: RoomManager<String> = RoomManager::new();
    let room = mgr.get_or_create("abc");

    let (tx1, mut rx1) = member_channel();
    let (tx2, mut rx2) = member_channel();
    room.join(cid(1), "0xA".into(), tx1).await.unwrap();
    room.join(cid(2), "0xB".into(), tx2).await.unwrap();

    room.broadcast(Recipient::Member(cid(2)), "process-swap".into())
        .await
        .unwrap();
    room.broadcast(Recipient::Member(cid(1)), "other".into())
        .await
        .unwrap();

    assert_eq!(expect_event(next_item(&mut rx2).await), "process-swap");
    assert_eq!(expect_event(next_item(&mut rx1).await), "other");
}

#[tokio::test]
async fn test_broadcast_to_departed_member_is_dropped() {
    let mut mgr: RoomManager<String> = RoomManager::new();
    let room = mgr.get_or_create("abc");

    let (tx1, _rx1) = member_channel();
    let (tx2, mut rx2) = member_channel();
    room.join(cid(1), "0xA".into(), tx1).await.unwrap();
    room.join(cid(2), "0xB".into(), tx2).await.unwrap();

    room.leave(cid(1)).await.unwrap();
    room.broadcast(Recipient::All, "late".into()).await.unwrap();

    // Only the remaining member receives it.
    assert_eq!(expect_event(next_item(&mut rx2).await), "late");
}

// =========================================================================
// Teardown
// =========================================================================

#[tokio::test]
async fn test_room_destroyed_when_last_member_leaves() {
    let mut mgr: RoomManager<String> = RoomManager::new();
    let room = mgr.get_or_create("abc");

    let (tx, _rx) = member_channel();
    room.join(cid(1), "0xA".into(), tx).await.unwrap();
    assert_eq!(mgr.room_count(), 1);

    mgr.leave("abc", cid(1)).await;
    assert_eq!(mgr.room_count(), 0);
}

#[tokio::test]
async fn test_room_survives_while_members_remain() {
    let mut mgr: RoomManager<String> = RoomManager::new();
    let room = mgr.get_or_create("abc");

    let (tx1, _rx1) = member_channel();
    let (tx2, _rx2) = member_channel();
    room.join(cid(1), "0xA".into(), tx1).await.unwrap();
    room.join(cid(2), "0xB".into(), tx2).await.unwrap();

    mgr.leave("abc", cid(1)).await;
    assert_eq!(mgr.room_count(), 1);

    let members = mgr.get("abc").unwrap().members().await.unwrap();
    assert_eq!(members, vec![(cid(2), "0xB".to_string())]);
}

#[tokio::test]
async fn test_leave_unknown_room_is_noop() {
    let mut mgr: RoomManager<String> = RoomManager::new();
    mgr.leave("never-created", cid(1)).await;
    assert_eq!(mgr.room_count(), 0);
}
