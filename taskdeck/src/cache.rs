//! Local task cache: reconciles fetch results with pushed events.
//!
//! The cache is the union of the last full fetch and every push event applied
//! since, deduplicated by task id with last-write-wins by arrival order. Task
//! events are idempotent upserts, so the same event can arrive before or
//! after the HTTP response for the mutation that produced it (or not at all,
//! for the originating client) without corrupting state.
//!
//! The filtered view is never patched incrementally: every change re-applies
//! the current predicate over the full cache, which keeps it correct under
//! any event ordering.

use std::collections::HashMap;

use taskdeck_proto::event::ServerEvent;
use taskdeck_proto::task::{Comment, Priority, Task, TaskId, TaskStatus, UserId};

/// Equality predicate over tasks. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Keep tasks with this status.
    pub status: Option<TaskStatus>,
    /// Keep tasks with this priority.
    pub priority: Option<Priority>,
    /// Keep tasks assigned to this user.
    pub assignee: Option<UserId>,
}

impl TaskFilter {
    /// Returns whether a task passes the predicate.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status
            && task.status != status
        {
            return false;
        }
        if let Some(priority) = self.priority
            && task.priority != priority
        {
            return false;
        }
        if let Some(assignee) = &self.assignee
            && task.assignee.as_ref() != Some(assignee)
        {
            return false;
        }
        true
    }
}

/// Client-side authoritative view of shared task state.
#[derive(Debug, Default)]
pub struct TaskCache {
    tasks: HashMap<TaskId, Task>,
    filter: TaskFilter,
    filtered: Vec<TaskId>,
    current: Option<TaskId>,
}

impl TaskCache {
    /// Creates an empty cache with a pass-everything filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the entire cache with a full fetch result.
    ///
    /// Entries not present in the response are dropped; a stale detail
    /// reference is cleared.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks.into_iter().map(|t| (t.id.clone(), t)).collect();
        let current_gone = self
            .current
            .as_ref()
            .is_some_and(|id| !self.tasks.contains_key(id));
        if current_gone {
            self.current = None;
        }
        self.recompute();
    }

    /// Applies one push event.
    ///
    /// Presence events and notifications are not cache state; they fall
    /// through untouched for the roster and the notification surface.
    pub fn apply_event(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::TaskCreated { task } | ServerEvent::TaskUpdated { task } => {
                self.upsert(task.clone());
            }
            ServerEvent::TaskDeleted { task_id } => {
                self.remove(task_id);
            }
            ServerEvent::CommentAdded { task_id, comment } => {
                self.append_comment(task_id, comment.clone());
            }
            ServerEvent::OnlineMembers { .. }
            | ServerEvent::MemberConnected { .. }
            | ServerEvent::MemberDisconnected { .. }
            | ServerEvent::Notification(_) => {}
        }
    }

    /// Inserts or replaces a task by id.
    ///
    /// This is also how a mutation's own HTTP response is folded in, so the
    /// push echo and the response reconcile to the same state in either
    /// arrival order.
    pub fn upsert(&mut self, task: Task) {
        self.tasks.insert(task.id.clone(), task);
        self.recompute();
    }

    /// Removes a task by id, clearing the detail reference if it pointed at
    /// the removed task.
    pub fn remove(&mut self, id: &TaskId) {
        if self.tasks.remove(id).is_some() {
            tracing::debug!(task = %id, "task removed from cache");
        }
        if self.current.as_ref() == Some(id) {
            self.current = None;
        }
        self.recompute();
    }

    /// Appends a comment to a cached task.
    ///
    /// Dropped when the task is absent (the next full fetch catches up) or
    /// when a comment with the same id is already present (the push echo of
    /// a comment the client itself added).
    pub fn append_comment(&mut self, task_id: &TaskId, comment: Comment) {
        let Some(task) = self.tasks.get_mut(task_id) else {
            tracing::debug!(task = %task_id, "comment for uncached task dropped");
            return;
        };
        if task.comments.iter().any(|c| c.id == comment.id) {
            return;
        }
        task.comments.push(comment);
    }

    /// Sets the filter predicate and recomputes the filtered view.
    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
        self.recompute();
    }

    /// Resets the filter to pass everything.
    pub fn clear_filter(&mut self) {
        self.set_filter(TaskFilter::default());
    }

    /// The current filter predicate.
    #[must_use]
    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    /// Marks a task as open in a detail view.
    ///
    /// Ignored for tasks not in the cache.
    pub fn open_detail(&mut self, id: &TaskId) {
        if self.tasks.contains_key(id) {
            self.current = Some(id.clone());
        }
    }

    /// Clears the detail reference.
    pub fn close_detail(&mut self) {
        self.current = None;
    }

    /// The task currently open in a detail view, if any.
    #[must_use]
    pub fn current_task(&self) -> Option<&Task> {
        self.current.as_ref().and_then(|id| self.tasks.get(id))
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Number of cached tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The filtered view, most recently updated first.
    #[must_use]
    pub fn filtered_tasks(&self) -> Vec<&Task> {
        self.filtered.iter().filter_map(|id| self.tasks.get(id)).collect()
    }

    /// All cached tasks, most recently updated first.
    #[must_use]
    pub fn all_tasks(&self) -> Vec<&Task> {
        let mut all: Vec<&Task> = self.tasks.values().collect();
        sort_newest_first(&mut all);
        all
    }

    /// Re-applies the current predicate over the whole cache.
    fn recompute(&mut self) {
        let mut matching: Vec<&Task> =
            self.tasks.values().filter(|t| self.filter.matches(t)).collect();
        sort_newest_first(&mut matching);
        self.filtered = matching.into_iter().map(|t| t.id.clone()).collect();
    }
}

/// Orders by `updated_at` descending, task id as a deterministic tiebreak.
fn sort_newest_first(tasks: &mut [&Task]) {
    tasks.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
}
