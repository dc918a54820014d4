//! HTTP client for the task API.
//!
//! Every mutation returns the full post-mutation entity, which callers fold
//! into the [`crate::cache::TaskCache`] as an upsert; the matching push echo
//! reconciles to the same state whichever arrives first.

use serde::Deserialize;
use taskdeck_proto::task::{Comment, NewTask, Task, TaskId, TaskPatch};

/// Errors raised by task API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The bearer token was missing, expired, or invalid.
    #[error("not authorized: {0}")]
    Unauthorized(String),
    /// The addressed task does not exist.
    #[error("task not found")]
    NotFound,
    /// The server rejected the request body.
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The server failed.
    #[error("server error: {0}")]
    Server(String),
    /// The request never completed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Error body shape the server uses for all failures.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Bearer-authenticated client for one `TaskDeck` server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    /// Creates a client for the server at `base_url` (e.g.
    /// `http://127.0.0.1:7180`), presenting `token` on every request.
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.into(),
        }
    }

    /// `GET /api/tasks`: the full fetch the cache is rebuilt from.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on auth failure or transport trouble.
    pub async fn fetch_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let response = self
            .http
            .get(self.url("/api/tasks"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    /// `GET /api/tasks/{id}`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown task.
    pub async fn fetch_task(&self, id: &TaskId) -> Result<Task, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/api/tasks/{id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    /// `POST /api/tasks`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] when the body fails validation.
    pub async fn create_task(&self, new: &NewTask) -> Result<Task, ApiError> {
        let response = self
            .http
            .post(self.url("/api/tasks"))
            .bearer_auth(&self.token)
            .json(new)
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    /// `PUT /api/tasks/{id}`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown task or
    /// [`ApiError::Rejected`] for an invalid patch.
    pub async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, ApiError> {
        let response = self
            .http
            .put(self.url(&format!("/api/tasks/{id}")))
            .bearer_auth(&self.token)
            .json(patch)
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    /// `DELETE /api/tasks/{id}`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown task.
    pub async fn delete_task(&self, id: &TaskId) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(self.url(&format!("/api/tasks/{id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }

    /// `POST /api/tasks/{id}/comments`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown task.
    pub async fn add_comment(&self, id: &TaskId, content: &str) -> Result<Comment, ApiError> {
        let response = self
            .http
            .post(self.url(&format!("/api/tasks/{id}/comments")))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Maps non-success statuses to typed errors, extracting the server's
/// `{message}` body when it has one.
async fn checked(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<ErrorBody>()
        .await
        .map_or_else(|_| status.to_string(), |body| body.message);
    Err(match status {
        reqwest::StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
        reqwest::StatusCode::NOT_FOUND => ApiError::NotFound,
        reqwest::StatusCode::UNPROCESSABLE_ENTITY => ApiError::Rejected(message),
        _ => ApiError::Server(message),
    })
}
