use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use k256::ecdsa::SigningKey;
use pretty_assertions::assert_eq;
use rolegate_core::auth::verify::{address_of, challenge_digest};
use rolegate_core::{Address, MemberId, RolegateDb, SessionManager};
use rolegate_server::handlers::{
    ApiResponse, AuthenticatedData, HealthResponse, NonceData, StorageCounts,
};
use rolegate_server::{AppState, router};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app() -> (Router, SessionManager) {
    let db = RolegateDb::open_in_memory().await.unwrap();
    let sessions = SessionManager::new(db.clone());
    (router(AppState::new(db, sessions.clone())), sessions)
}

async fn post<T: DeserializeOwned>(app: &Router, uri: &str, body: Value) -> (StatusCode, T) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn sign(key: &SigningKey, nonce: &str) -> String {
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(&challenge_digest(nonce))
        .unwrap();
    let mut bytes = signature.to_bytes().to_vec();
    bytes.push(recovery_id.to_byte() + 27);
    format!("0x{}", hex::encode(bytes))
}

#[tokio::test]
async fn test_wallet_login_round_trip() {
    let (app, sessions) = app().await;
    let key = SigningKey::from_slice(&[4u8; 32]).unwrap();
    let address: Address = address_of(key.verifying_key());

    let token = sessions.start(MemberId(77)).await.unwrap();

    let (status, response): (_, ApiResponse<NonceData>) = post(
        &app,
        "/start-session",
        json!({ "token": token, "address": address.as_str() }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.success);
    let nonce = response.data.unwrap().nonce;

    let (status, response): (_, ApiResponse<AuthenticatedData>) = post(
        &app,
        "/authenticate",
        json!({ "token": token, "signature": sign(&key, &nonce) }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        response,
        ApiResponse::ok(AuthenticatedData {
            authenticated: true
        })
    );
}

#[tokio::test]
async fn test_invalid_signature_is_reported() {
    let (app, sessions) = app().await;
    let key = SigningKey::from_slice(&[4u8; 32]).unwrap();
    let other = SigningKey::from_slice(&[5u8; 32]).unwrap();
    let token = sessions.start(MemberId(1)).await.unwrap();

    let (_, response): (_, ApiResponse<NonceData>) = post(
        &app,
        "/start-session",
        json!({ "token": token, "address": address_of(key.verifying_key()).as_str() }),
    )
    .await;
    let nonce = response.data.unwrap().nonce;

    let (status, response): (_, ApiResponse<AuthenticatedData>) = post(
        &app,
        "/authenticate",
        json!({ "token": token, "signature": sign(&other, &nonce) }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, ApiResponse::failed("Invalid signature"));
}

#[tokio::test]
async fn test_unknown_token_is_reported() {
    let (app, _) = app().await;

    let (status, response): (_, ApiResponse<NonceData>) = post(
        &app,
        "/start-session",
        json!({ "token": "forged", "address": "0x1111111111111111111111111111111111111111" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!response.success);
    assert_eq!(
        response.error.as_deref(),
        Some("Session expired, please retry login")
    );
}

#[tokio::test]
async fn test_malformed_body_gets_envelope() {
    let (app, _) = app().await;

    let (status, response): (_, ApiResponse<AuthenticatedData>) =
        post(&app, "/authenticate", json!({ "token": "abc" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!response.success);
    assert!(response.error.unwrap().contains("signature"));

    // wrong content type
    let request = Request::builder()
        .method("POST")
        .uri("/start-session")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("token=abc"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let response: ApiResponse<NonceData> = serde_json::from_slice(&bytes).unwrap();
    assert!(!response.success);
    assert!(response.error.is_some());
}

#[tokio::test]
async fn test_pages_and_health() {
    let (app, sessions) = app().await;
    sessions.start(MemberId(9)).await.unwrap();

    for uri in ["/", "/success"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/html")
        );
    }

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(
        health.storage,
        Some(StorageCounts {
            pending_logins: 1,
            bound_identities: 0,
            guilds: 0,
        })
    );
}
