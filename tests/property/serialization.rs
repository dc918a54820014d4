//! Property-based serialization round-trip tests for the wire protocol.
//!
//! Uses proptest to verify:
//! 1. Any valid `ServerEvent` survives encode → decode round-trip.
//! 2. Any valid handshake message survives a round-trip in both directions.
//! 3. Random bytes never cause a panic in decode (they return `Err`).
//! 4. `TaskPatch` keeps its absent / explicit-null distinction through JSON.

use proptest::prelude::*;
use taskdeck_proto::event::{Notification, NotificationKind, ServerEvent};
use taskdeck_proto::task::{
    Comment, CommentId, Priority, Task, TaskId, TaskPatch, TaskStatus, Timestamp, UserId,
};
use taskdeck_proto::wire::{self, ClientMessage, ServerMessage};
use uuid::Uuid;

// --- Strategies for protocol types ---

/// Strategy for generating arbitrary `TaskId` values.
fn arb_task_id() -> impl Strategy<Value = TaskId> {
    any::<u128>().prop_map(|n| TaskId::from_uuid(Uuid::from_u128(n)))
}

/// Strategy for generating arbitrary `CommentId` values.
fn arb_comment_id() -> impl Strategy<Value = CommentId> {
    any::<u128>().prop_map(|n| CommentId::from_uuid(Uuid::from_u128(n)))
}

/// Strategy for generating arbitrary `UserId` values.
fn arb_user_id() -> impl Strategy<Value = UserId> {
    "[a-z0-9-]{1,24}".prop_map(UserId::new)
}

/// Strategy for generating arbitrary `Timestamp` values.
fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
    any::<u64>().prop_map(Timestamp::from_millis)
}

/// Strategy for generating arbitrary `TaskStatus` values.
fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Todo),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Review),
        Just(TaskStatus::Completed),
    ]
}

/// Strategy for generating arbitrary `Priority` values.
fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
        Just(Priority::Urgent),
    ]
}

/// Strategy for generating arbitrary `Comment` values.
fn arb_comment() -> impl Strategy<Value = Comment> {
    (arb_comment_id(), "[^\x00]{0,256}", arb_user_id(), arb_timestamp()).prop_map(
        |(id, content, author, created_at)| Comment {
            id,
            content,
            author,
            created_at,
        },
    )
}

/// Strategy for generating arbitrary `Task` values.
fn arb_task() -> impl Strategy<Value = Task> {
    (
        (
            arb_task_id(),
            "[^\x00]{1,64}",
            "[^\x00]{0,256}",
            arb_status(),
            arb_priority(),
        ),
        (
            prop::option::of(arb_user_id()),
            arb_user_id(),
            prop::option::of(arb_timestamp()),
            prop::collection::vec(arb_comment(), 0..4),
            arb_timestamp(),
            arb_timestamp(),
        ),
    )
        .prop_map(
            |(
                (id, title, description, status, priority),
                (assignee, creator, due, comments, created_at, updated_at),
            )| Task {
                id,
                title,
                description,
                status,
                priority,
                assignee,
                creator,
                due,
                comments,
                created_at,
                updated_at,
            },
        )
}

/// Strategy for generating arbitrary `Notification` values.
fn arb_notification() -> impl Strategy<Value = Notification> {
    (
        prop_oneof![
            Just(NotificationKind::Assigned),
            Just(NotificationKind::Updated),
            Just(NotificationKind::Completed),
            Just(NotificationKind::Commented),
        ],
        "[^\x00]{0,128}",
        arb_task_id(),
    )
        .prop_map(|(kind, message, task_id)| Notification {
            kind,
            message,
            task_id,
        })
}

/// Strategy for generating arbitrary `ServerEvent` values.
fn arb_server_event() -> impl Strategy<Value = ServerEvent> {
    prop_oneof![
        prop::collection::vec(arb_user_id(), 0..8)
            .prop_map(|users| ServerEvent::OnlineMembers { users }),
        arb_user_id().prop_map(|user| ServerEvent::MemberConnected { user }),
        (arb_user_id(), arb_timestamp()).prop_map(|(user, last_active)| {
            ServerEvent::MemberDisconnected { user, last_active }
        }),
        arb_task().prop_map(|task| ServerEvent::TaskCreated { task }),
        arb_task().prop_map(|task| ServerEvent::TaskUpdated { task }),
        arb_task_id().prop_map(|task_id| ServerEvent::TaskDeleted { task_id }),
        (arb_task_id(), arb_comment())
            .prop_map(|(task_id, comment)| ServerEvent::CommentAdded { task_id, comment }),
        arb_notification().prop_map(ServerEvent::Notification),
    ]
}

// --- Property tests ---

proptest! {
    /// Any valid ServerEvent survives an encode → decode round-trip.
    #[test]
    fn server_event_round_trip(event in arb_server_event()) {
        let msg = ServerMessage::Event(event);
        let bytes = wire::encode_server(&msg).expect("encode should succeed");
        let decoded = wire::decode_server(&bytes).expect("decode should succeed");
        prop_assert_eq!(msg, decoded);
    }

    /// Handshake acks survive a round-trip.
    #[test]
    fn handshake_ack_round_trip(user in arb_user_id()) {
        let msg = ServerMessage::Authenticated { user };
        let bytes = wire::encode_server(&msg).expect("encode should succeed");
        let decoded = wire::decode_server(&bytes).expect("decode should succeed");
        prop_assert_eq!(msg, decoded);
    }

    /// Client handshake frames survive a round-trip for any token string.
    #[test]
    fn authenticate_round_trip(token in "[^\x00]{0,512}") {
        let msg = ClientMessage::Authenticate { token };
        let bytes = wire::encode_client(&msg).expect("encode should succeed");
        let decoded = wire::decode_client(&bytes).expect("decode should succeed");
        prop_assert_eq!(msg, decoded);
    }

    /// Random bytes never cause a panic when decoded: they return Err or a
    /// structurally valid message, never UB or panic.
    #[test]
    fn random_bytes_decode_no_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = wire::decode_server(&bytes);
        let _ = wire::decode_client(&bytes);
    }

    /// A full Task survives postcard round-trip independently of the
    /// envelope around it.
    #[test]
    fn task_postcard_round_trip(task in arb_task()) {
        let bytes = postcard::to_allocvec(&task).expect("encode should succeed");
        let decoded: Task = postcard::from_bytes(&bytes).expect("decode should succeed");
        prop_assert_eq!(task, decoded);
    }

    /// TaskPatch keeps absent vs explicit-null apart through JSON.
    #[test]
    fn task_patch_json_round_trip(
        title in prop::option::of("[^\x00]{1,32}"),
        assignee in prop::option::of(prop::option::of(arb_user_id())),
        status in prop::option::of(arb_status()),
    ) {
        let patch = TaskPatch { title, assignee, status, ..TaskPatch::default() };
        let json = serde_json::to_string(&patch).expect("serialize should succeed");
        let back: TaskPatch = serde_json::from_str(&json).expect("deserialize should succeed");
        prop_assert_eq!(patch, back);
    }
}
