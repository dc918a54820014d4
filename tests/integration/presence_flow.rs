//! End-to-end presence: snapshots, online/offline broadcasts, and the
//! multi-connection rule (a user stays online until its last connection
//! drops).

use std::time::Duration;

use taskdeck::roster::Roster;
use taskdeck::sync::{SyncConnection, SyncError, SyncEvent};
use taskdeck_proto::auth;
use taskdeck_proto::event::ServerEvent;
use taskdeck_proto::task::UserId;

const SECRET: &[u8] = b"presence-flow-secret";

async fn start_server() -> std::net::SocketAddr {
    let (addr, _handle) = taskdeck_server::server::start_server("127.0.0.1:0", SECRET)
        .await
        .expect("server should start");
    addr
}

fn token(user: &str) -> String {
    auth::issue_token(&UserId::new(user), SECRET, 3600).expect("token should issue")
}

async fn connect(addr: std::net::SocketAddr, user: &str) -> SyncConnection {
    SyncConnection::connect(&format!("ws://{addr}/ws"), &token(user))
        .await
        .expect("connection should authenticate")
}

async fn next_event(conn: &mut SyncConnection) -> ServerEvent {
    let item = tokio::time::timeout(Duration::from_secs(5), conn.next_event())
        .await
        .expect("timed out waiting for event")
        .expect("stream should be open");
    match item {
        SyncEvent::Event(event) => event,
        SyncEvent::Disconnected => panic!("unexpected disconnect"),
    }
}

#[tokio::test]
async fn first_client_receives_empty_then_growing_snapshot() {
    let addr = start_server().await;

    // Nobody is online yet, so the first snapshot is empty.
    let mut alice = connect(addr, "alice").await;
    assert_eq!(
        next_event(&mut alice).await,
        ServerEvent::OnlineMembers { users: vec![] }
    );

    let mut bob = connect(addr, "bob").await;
    assert_eq!(
        next_event(&mut bob).await,
        ServerEvent::OnlineMembers {
            users: vec![UserId::new("alice")]
        }
    );

    // Alice learns about Bob through the broadcast, not a snapshot.
    assert_eq!(
        next_event(&mut alice).await,
        ServerEvent::MemberConnected {
            user: UserId::new("bob")
        }
    );
}

#[tokio::test]
async fn disconnect_broadcasts_member_offline_with_timestamp() {
    let addr = start_server().await;

    let mut alice = connect(addr, "alice").await;
    let _snapshot = next_event(&mut alice).await;

    let bob = connect(addr, "bob").await;
    let _bob_connected = next_event(&mut alice).await;

    bob.close().await;

    match next_event(&mut alice).await {
        ServerEvent::MemberDisconnected { user, last_active } => {
            assert_eq!(user, UserId::new("bob"));
            assert!(last_active.as_millis() > 0);
        }
        other => panic!("expected MemberDisconnected, got {other:?}"),
    }
}

#[tokio::test]
async fn user_with_two_connections_stays_online_until_both_close() {
    let addr = start_server().await;

    let mut alice = connect(addr, "alice").await;
    let _snapshot = next_event(&mut alice).await;

    let bob_first = connect(addr, "bob").await;
    assert_eq!(
        next_event(&mut alice).await,
        ServerEvent::MemberConnected {
            user: UserId::new("bob")
        }
    );

    // Second connection for the same user: no second online broadcast.
    let bob_second = connect(addr, "bob").await;

    // Closing one of Bob's connections must not mark him offline either; the
    // next thing Alice sees is Carol coming online.
    bob_first.close().await;
    let _carol = connect(addr, "carol").await;
    assert_eq!(
        next_event(&mut alice).await,
        ServerEvent::MemberConnected {
            user: UserId::new("carol")
        }
    );

    // Closing the last connection finally takes Bob offline.
    bob_second.close().await;
    match next_event(&mut alice).await {
        ServerEvent::MemberDisconnected { user, .. } => {
            assert_eq!(user, UserId::new("bob"));
        }
        other => panic!("expected MemberDisconnected, got {other:?}"),
    }
}

#[tokio::test]
async fn roster_tracks_presence_events() {
    let addr = start_server().await;

    let _alice = connect(addr, "alice").await;

    // Bob joins second: his snapshot already holds Alice.
    let mut bob = connect(addr, "bob").await;
    let mut roster = Roster::new();
    roster.apply_event(&next_event(&mut bob).await);
    assert!(roster.is_online(&UserId::new("alice")));

    let carol = connect(addr, "carol").await;
    roster.apply_event(&next_event(&mut bob).await);
    assert!(roster.is_online(&UserId::new("carol")));

    carol.close().await;
    roster.apply_event(&next_event(&mut bob).await);
    assert!(!roster.is_online(&UserId::new("carol")));
    assert!(roster.last_active(&UserId::new("carol")).is_some());
}

#[tokio::test]
async fn rejected_token_cannot_connect() {
    let addr = start_server().await;

    let result = SyncConnection::connect(&format!("ws://{addr}/ws"), "not-a-token").await;
    match result {
        Err(SyncError::AuthRefused(_)) => {}
        other => panic!("expected AuthRefused, got {other:?}"),
    }

    // The refused connection left no presence state behind.
    let mut alice = connect(addr, "alice").await;
    assert_eq!(
        next_event(&mut alice).await,
        ServerEvent::OnlineMembers { users: vec![] }
    );
}

#[tokio::test]
async fn token_signed_with_other_secret_is_refused() {
    let addr = start_server().await;

    let forged =
        auth::issue_token(&UserId::new("alice"), b"some-other-secret", 3600).expect("token");
    let result = SyncConnection::connect(&format!("ws://{addr}/ws"), &forged).await;
    assert!(matches!(result, Err(SyncError::AuthRefused(_))));
}
