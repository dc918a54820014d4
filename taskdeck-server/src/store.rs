//! In-memory task store: the CRUD collaborator behind the sync core.
//!
//! The sync layer only ever observes full post-mutation entities, so every
//! mutating operation here returns the complete task for republication.
//! Durability is explicitly out of scope; state lives for the lifetime of
//! the server instance.

use std::collections::HashMap;

use taskdeck_proto::task::{
    Comment, CommentId, MAX_TITLE_LENGTH, NewTask, Task, TaskId, TaskPatch, Timestamp, UserId,
};
use tokio::sync::RwLock;

/// Errors raised by task store operations.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The addressed task does not exist.
    #[error("task not found")]
    TaskNotFound,
    /// A task title must be non-empty.
    #[error("task title is empty")]
    TitleEmpty,
    /// A task title may not exceed [`MAX_TITLE_LENGTH`] characters.
    #[error("task title too long (max {MAX_TITLE_LENGTH} characters)")]
    TitleTooLong,
}

/// Process-local task storage.
pub struct TaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Returns all tasks, most recently updated first.
    pub async fn list(&self) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        let mut all: Vec<Task> = tasks.values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Returns a single task by id.
    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        let tasks = self.tasks.read().await;
        tasks.get(id).cloned()
    }

    /// Creates a task owned by `creator`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TitleEmpty`] or [`StoreError::TitleTooLong`]
    /// if the title fails validation.
    pub async fn create(&self, creator: &UserId, new: NewTask) -> Result<Task, StoreError> {
        validate_title(&new.title)?;

        let now = Timestamp::now();
        let task = Task {
            id: TaskId::new(),
            title: new.title,
            description: new.description,
            status: new.status,
            priority: new.priority,
            assignee: new.assignee,
            creator: creator.clone(),
            due: new.due,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let mut tasks = self.tasks.write().await;
        tasks.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    /// Applies a partial update, bumping `updated_at`.
    ///
    /// Returns the task as it was before the patch alongside the full
    /// post-mutation entity; the notification router needs both to detect
    /// assignee and status transitions.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskNotFound`] for an unknown id, or a title
    /// validation error if the patch sets an invalid title.
    pub async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<(Task, Task), StoreError> {
        if let Some(title) = &patch.title {
            validate_title(title)?;
        }

        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(id).ok_or(StoreError::TaskNotFound)?;
        let before = task.clone();

        if let Some(title) = &patch.title {
            task.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            task.description.clone_from(description);
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(assignee) = &patch.assignee {
            task.assignee.clone_from(assignee);
        }
        if let Some(due) = patch.due {
            task.due = due;
        }
        task.updated_at = Timestamp::now();

        Ok((before, task.clone()))
    }

    /// Removes a task, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskNotFound`] for an unknown id.
    pub async fn delete(&self, id: &TaskId) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        tasks.remove(id).ok_or(StoreError::TaskNotFound)
    }

    /// Appends a comment authored by `author`, bumping `updated_at`.
    ///
    /// Returns the full post-mutation task and the new comment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskNotFound`] for an unknown id.
    pub async fn add_comment(
        &self,
        id: &TaskId,
        author: &UserId,
        content: String,
    ) -> Result<(Task, Comment), StoreError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(id).ok_or(StoreError::TaskNotFound)?;

        let comment = Comment {
            id: CommentId::new(),
            content,
            author: author.clone(),
            created_at: Timestamp::now(),
        };
        task.comments.push(comment.clone());
        task.updated_at = Timestamp::now();

        Ok((task.clone(), comment))
    }

    /// Drops every task. Part of the explicit lifecycle.
    pub async fn clear(&self) {
        let mut tasks = self.tasks.write().await;
        tasks.clear();
    }
}

fn validate_title(title: &str) -> Result<(), StoreError> {
    if title.is_empty() {
        return Err(StoreError::TitleEmpty);
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(StoreError::TitleTooLong);
    }
    Ok(())
}
