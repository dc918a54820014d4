//! Property tests for the client cache's reconciliation invariants.
//!
//! Verifies:
//! 1. The filtered view always equals `{t in cache : filter(t)}` no matter
//!    what order the upserts and deletes that built the cache arrived in.
//! 2. Applying the same upsert event twice leaves the cache identical to
//!    applying it once.
//! 3. The cache after any event sequence is keyed uniquely by task id.

use proptest::prelude::*;
use taskdeck::cache::{TaskCache, TaskFilter};
use taskdeck_proto::event::ServerEvent;
use taskdeck_proto::task::{Priority, Task, TaskId, TaskStatus, Timestamp, UserId};
use uuid::Uuid;

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Todo),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Review),
        Just(TaskStatus::Completed),
    ]
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
        Just(Priority::Urgent),
    ]
}

fn arb_task() -> impl Strategy<Value = Task> {
    (
        any::<u128>(),
        "[a-z ]{1,24}",
        arb_status(),
        arb_priority(),
        prop::option::of("[a-z]{1,8}".prop_map(UserId::new)),
        any::<u64>(),
    )
        .prop_map(|(id, title, status, priority, assignee, updated_ms)| Task {
            id: TaskId::from_uuid(Uuid::from_u128(id)),
            title,
            description: String::new(),
            status,
            priority,
            assignee,
            creator: UserId::new("creator"),
            due: None,
            comments: Vec::new(),
            created_at: Timestamp::from_millis(updated_ms),
            updated_at: Timestamp::from_millis(updated_ms),
        })
}

fn arb_filter() -> impl Strategy<Value = TaskFilter> {
    (
        prop::option::of(arb_status()),
        prop::option::of(arb_priority()),
        prop::option::of("[a-z]{1,8}".prop_map(UserId::new)),
    )
        .prop_map(|(status, priority, assignee)| TaskFilter {
            status,
            priority,
            assignee,
        })
}

/// Snapshot of cached tasks, sorted by id for comparison.
fn snapshot(cache: &TaskCache) -> Vec<Task> {
    let mut tasks: Vec<Task> = cache.all_tasks().into_iter().cloned().collect();
    tasks.sort_by(|a, b| a.id.cmp(&b.id));
    tasks
}

proptest! {
    /// The filtered view equals the predicate applied to the whole cache,
    /// regardless of the order events were applied in.
    #[test]
    fn filtered_view_matches_predicate(
        tasks in prop::collection::vec(arb_task(), 0..12),
        filter in arb_filter(),
        seed in any::<u64>(),
    ) {
        // Apply the upserts in a seed-shuffled order.
        let mut order: Vec<usize> = (0..tasks.len()).collect();
        let mut state = seed | 1;
        for i in (1..order.len()).rev() {
            // xorshift step; any deterministic shuffle works here.
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            order.swap(i, (state as usize) % (i + 1));
        }

        let mut cache = TaskCache::new();
        cache.set_filter(filter.clone());
        for &i in &order {
            cache.apply_event(&ServerEvent::TaskUpdated { task: tasks[i].clone() });
        }

        let mut expected: Vec<TaskId> = cache
            .all_tasks()
            .into_iter()
            .filter(|t| filter.matches(t))
            .map(|t| t.id.clone())
            .collect();
        expected.sort();

        let mut actual: Vec<TaskId> = cache
            .filtered_tasks()
            .into_iter()
            .map(|t| t.id.clone())
            .collect();
        actual.sort();

        prop_assert_eq!(actual, expected);
    }

    /// Applying the same upsert twice is a no-op after the first.
    #[test]
    fn duplicate_upsert_is_idempotent(
        prelude in prop::collection::vec(arb_task(), 0..6),
        task in arb_task(),
    ) {
        let mut cache = TaskCache::new();
        for t in &prelude {
            cache.apply_event(&ServerEvent::TaskCreated { task: t.clone() });
        }

        let event = ServerEvent::TaskUpdated { task };
        cache.apply_event(&event);
        let once = snapshot(&cache);
        cache.apply_event(&event);
        let twice = snapshot(&cache);

        prop_assert_eq!(once, twice);
    }

    /// Deletes and upserts in any interleaving leave at most one entry per
    /// task id, and deleted ids stay gone.
    #[test]
    fn deletes_win_over_earlier_upserts(
        tasks in prop::collection::vec(arb_task(), 1..8),
        delete_index in any::<prop::sample::Index>(),
    ) {
        let mut cache = TaskCache::new();
        for t in &tasks {
            cache.apply_event(&ServerEvent::TaskCreated { task: t.clone() });
        }

        let doomed = delete_index.get(&tasks).id.clone();
        cache.apply_event(&ServerEvent::TaskDeleted { task_id: doomed.clone() });

        prop_assert!(cache.get(&doomed).is_none());
        prop_assert!(cache.filtered_tasks().iter().all(|t| t.id != doomed));
    }
}
