//! Rolegate Server
//!
//! HTTP endpoints the Idena wallet calls during a login:
//!
//! - `POST /start-session` - claim an address and receive the nonce to sign
//! - `POST /authenticate` - deliver the signature
//! - `GET /`, `GET /success` - landing pages
//! - `GET /health` - storage health

pub mod error;
pub mod handlers;
pub mod pages;
pub mod state;

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::{ServerError, ServerResult};
pub use state::AppState;

/// Build the router with all endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/success", get(handlers::success))
        .route("/favicon.ico", get(handlers::favicon))
        .route("/health", get(handlers::health))
        .route("/start-session", post(handlers::start_session))
        .route("/authenticate", post(handlers::authenticate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on `bind` until `shutdown` completes.
pub async fn serve(
    state: AppState,
    bind: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> ServerResult<()> {
    let addr: SocketAddr = bind.parse().map_err(|e: std::net::AddrParseError| {
        ServerError::InvalidBind {
            addr: bind.to_string(),
            reason: e.to_string(),
        }
    })?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: bind.to_string(),
            source,
        })?;

    info!("Login endpoints listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)
}
