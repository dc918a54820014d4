//! Server assembly: shared state, router, and startup.

use std::sync::Arc;

use axum::routing::{get, post};

use crate::http;
use crate::presence::PresenceTracker;
use crate::sessions::SessionRegistry;
use crate::store::TaskStore;
use crate::ws;

/// Shared state injected into every handler.
///
/// One `AppState` owns all live connections, presence counts, and tasks for
/// a server instance; tests construct as many independent instances as they
/// need instead of sharing ambient globals.
pub struct AppState {
    /// Live, authenticated connections and the user addressing table.
    pub sessions: SessionRegistry,
    /// Per-user live-connection counts.
    pub presence: PresenceTracker,
    /// The CRUD collaborator.
    pub store: TaskStore,
    secret: Vec<u8>,
}

impl AppState {
    /// Creates a fresh state with the shared token secret.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            presence: PresenceTracker::new(),
            store: TaskStore::new(),
            secret: secret.into(),
        }
    }

    /// The shared secret bearer tokens are verified against.
    #[must_use]
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Drops all connections, presence, and tasks. Shutdown lifecycle hook.
    pub async fn clear(&self) {
        self.sessions.clear().await;
        self.presence.clear().await;
        self.store.clear().await;
    }
}

/// Builds the axum router for the push channel and the task API.
pub fn router(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/health", get(http::health))
        .route("/api/tasks", get(http::list_tasks).post(http::create_task))
        .route(
            "/api/tasks/{id}",
            get(http::get_task).put(http::update_task).delete(http::delete_task),
        )
        .route("/api/tasks/{id}/comments", post(http::add_comment))
        .with_state(state)
}

/// Starts the server with a fresh state and the given secret.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
    secret: &[u8],
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(AppState::new(secret))).await
}

/// Starts the server with a pre-built [`AppState`].
///
/// Binds the listener (use port 0 for an OS-assigned port in tests) and
/// returns the bound address plus a join handle for the serve task.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<AppState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "server error");
        }
    });

    Ok((bound_addr, handle))
}
