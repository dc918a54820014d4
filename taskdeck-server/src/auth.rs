//! Bearer-token authentication for the HTTP task API.
//!
//! The push channel authenticates in-band during its handshake (see
//! [`crate::ws`]); HTTP requests carry the same token in the standard
//! `Authorization: Bearer` header, verified per request.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use taskdeck_proto::auth;
use taskdeck_proto::task::UserId;

use crate::server::AppState;

/// The authenticated caller of an HTTP request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserId);

/// Rejection for requests without a valid bearer token.
#[derive(Debug, thiserror::Error)]
pub enum AuthRejection {
    /// No `Authorization: Bearer` header present.
    #[error("Not authorized, no token")]
    MissingToken,
    /// The presented token failed verification.
    #[error("Not authorized, token failed")]
    BadToken,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = axum::Json(serde_json::json!({ "message": self.to_string() }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AuthRejection::MissingToken)?;

        let user = auth::verify_token(token, state.secret()).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            AuthRejection::BadToken
        })?;

        Ok(Self(user))
    }
}
