//! Wallet callback handlers.
//!
//! The wallet treats any non-`success` body as a failed login, so protocol
//! errors are answered with 200 and `{"success": false, "error": ..}`. Only
//! server-side failures use an error status. A body that cannot be read keeps
//! the rejection's 4xx status but still answers with the envelope.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use rolegate_core::SessionError;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::pages::{INDEX_HTML, SUCCESS_HTML};
use crate::state::AppState;

/// Response envelope shared by both callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub token: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonceData {
    pub nonce: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateRequest {
    pub token: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedData {
    pub authenticated: bool,
}

fn session_failure<T: Serialize>(err: SessionError) -> Response {
    if err.is_user_facing() {
        (StatusCode::OK, Json(ApiResponse::<T>::failed(err.user_message()))).into_response()
    } else {
        error!("Login callback failed: {}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<T>::failed(err.user_message())),
        )
            .into_response()
    }
}

fn malformed_request<T: Serialize>(rejection: JsonRejection) -> Response {
    let reason = rejection.body_text();
    debug!("Rejected callback body: {}", reason);
    (
        rejection.status(),
        Json(ApiResponse::<T>::failed(format!("Malformed request: {}", reason))),
    )
        .into_response()
}

/// `POST /start-session`: issue the nonce the wallet must sign.
pub async fn start_session(
    State(state): State<AppState>,
    payload: Result<Json<StartSessionRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return malformed_request::<NonceData>(rejection),
    };
    match state.sessions.request_nonce(&req.token, &req.address).await {
        Ok(nonce) => Json(ApiResponse::ok(NonceData { nonce })).into_response(),
        Err(e) => session_failure::<NonceData>(e),
    }
}

/// `POST /authenticate`: check the signature and bind the address.
pub async fn authenticate(
    State(state): State<AppState>,
    payload: Result<Json<AuthenticateRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return malformed_request::<AuthenticatedData>(rejection),
    };
    match state.sessions.authenticate(&req.token, &req.signature).await {
        Ok(_) => Json(ApiResponse::ok(AuthenticatedData {
            authenticated: true,
        }))
        .into_response(),
        Err(e) => session_failure::<AuthenticatedData>(e),
    }
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn success() -> Html<&'static str> {
    Html(SUCCESS_HTML)
}

pub async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageCounts>,
}

/// Row counts reported by `/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageCounts {
    pub pending_logins: u64,
    pub bound_identities: u64,
    pub guilds: u64,
}

/// `GET /health`: 200 with row counts when storage answers.
pub async fn health(State(state): State<AppState>) -> Response {
    let version = env!("CARGO_PKG_VERSION").to_string();
    let stats = match state.db.health_check().await {
        Ok(()) => state.db.stats().await,
        Err(e) => Err(e),
    };
    match stats {
        Ok(stats) => Json(HealthResponse {
            status: "ok".to_string(),
            version,
            storage: Some(StorageCounts {
                pending_logins: stats.pending_count,
                bound_identities: stats.bound_count,
                guilds: stats.guild_count,
            }),
        })
        .into_response(),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable".to_string(),
                    version,
                    storage: None,
                }),
            )
                .into_response()
        }
    }
}
