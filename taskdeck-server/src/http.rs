//! HTTP JSON API for task CRUD.
//!
//! Every successful mutation responds with the full post-mutation entity and
//! then republishes it through the broadcaster and, where a target set
//! exists, the notification router. Emission runs after the store commit and
//! can only log; it never alters the response already owed to the caller.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use taskdeck_proto::event::ServerEvent;
use taskdeck_proto::task::{Comment, NewTask, Task, TaskId, TaskPatch};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::broadcast;
use crate::notify;
use crate::server::AppState;
use crate::store::StoreError;

/// Errors returned by the task API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The addressed task does not exist.
    #[error("Task not found")]
    NotFound,
    /// The request body failed validation.
    #[error("{0}")]
    Invalid(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TaskNotFound => Self::NotFound,
            StoreError::TitleEmpty | StoreError::TitleTooLong => Self::Invalid(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        let body = Json(serde_json::json!({ "message": self.to_string() }));
        (status, body).into_response()
    }
}

/// Request body for appending a comment.
#[derive(Debug, Deserialize)]
pub struct NewComment {
    /// Comment body.
    pub content: String,
}

/// Liveness probe. The only unauthenticated route.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /api/tasks`: the full fetch clients build their cache from.
pub async fn list_tasks(State(state): State<Arc<AppState>>, _user: AuthUser) -> Json<Vec<Task>> {
    Json(state.store.list().await)
}

/// `GET /api/tasks/{id}`
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .store
        .get(&TaskId::from_uuid(id))
        .await
        .ok_or(ApiError::NotFound)?;
    Ok(Json(task))
}

/// `POST /api/tasks`
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state.store.create(&user, body).await?;
    tracing::info!(task = %task.id, creator = %user, "task created");

    broadcast::broadcast_all(
        &state.sessions,
        &ServerEvent::TaskCreated { task: task.clone() },
    )
    .await;
    if let Some((target, notification)) = notify::creation_notice(&task) {
        notify::deliver(&state.sessions, &target, notification).await;
    }

    Ok((StatusCode::CREATED, Json(task)))
}

/// `PUT /api/tasks/{id}`
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, ApiError> {
    let id = TaskId::from_uuid(id);
    let (before, after) = state.store.update(&id, &patch).await?;
    tracing::info!(task = %id, actor = %user, "task updated");

    broadcast::broadcast_all(
        &state.sessions,
        &ServerEvent::TaskUpdated { task: after.clone() },
    )
    .await;
    notify::deliver_all(&state.sessions, notify::update_notices(&before, &after)).await;

    Ok(Json(after))
}

/// `DELETE /api/tasks/{id}`
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = TaskId::from_uuid(id);
    state.store.delete(&id).await?;
    tracing::info!(task = %id, actor = %user, "task deleted");

    broadcast::broadcast_all(&state.sessions, &ServerEvent::TaskDeleted { task_id: id }).await;

    Ok(Json(serde_json::json!({ "message": "Task deleted" })))
}

/// `POST /api/tasks/{id}/comments`
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<NewComment>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let id = TaskId::from_uuid(id);
    let (task, comment) = state.store.add_comment(&id, &user, body.content).await?;
    tracing::info!(task = %id, author = %user, "comment added");

    broadcast::broadcast_all(
        &state.sessions,
        &ServerEvent::CommentAdded {
            task_id: id,
            comment: comment.clone(),
        },
    )
    .await;
    notify::deliver_all(&state.sessions, notify::comment_notices(&task, &user)).await;

    Ok((StatusCode::CREATED, Json(comment)))
}
