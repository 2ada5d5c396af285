//! The HTTP surface: session creation and lookup.
//!
//! Thin CRUD over the session store, deliberately outside the real-time
//! core. Browsers hit `POST /create-session` to mint a session, share
//! the id out-of-band, then both parties connect over WebSocket.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use accord_protocol::{Codec, SwapSession};
use accord_session::{storage_key, SessionStore};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::Rng;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::ServerState;

/// Builds the HTTP router over the shared server state.
pub(crate) fn router<S: SessionStore, C: Codec>(
    state: Arc<ServerState<S, C>>,
) -> Router {
    Router::new()
        .route("/create-session", post(create_session::<S, C>))
        .route("/session/:id", get(fetch_session::<S, C>))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `POST /create-session` — mints a fresh session record.
async fn create_session<S: SessionStore, C: Codec>(
    State(state): State<Arc<ServerState<S, C>>>,
) -> Response {
    let id = generate_session_id();
    let session = SwapSession::new(now_millis());

    let lock = state.locks.for_session(&id);
    let _guard = lock.lock().await;
    match state.store.set(&storage_key(&id), session).await {
        Ok(()) => {
            tracing::info!(session_id = %id, "session created");
            (StatusCode::OK, Json(json!({ "session_id": id })))
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to persist new session");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "store-failure" })),
            )
                .into_response()
        }
    }
}

/// `GET /session/:id` — returns the stored record or 404.
async fn fetch_session<S: SessionStore, C: Codec>(
    State(state): State<Arc<ServerState<S, C>>>,
    Path(id): Path<String>,
) -> Response {
    match state.store.get(&storage_key(&id)).await {
        Ok(Some(session)) => {
            (StatusCode::OK, Json(session)).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "not-found" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(session_id = %id, error = %e, "session lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "store-failure" })),
            )
                .into_response()
        }
    }
}

/// Generates a short shareable session id: 3 random bytes as 6 lowercase
/// hex characters.
fn generate_session_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 3] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Current wall-clock time in milliseconds. Informational only — clock
/// jumps are harmless here.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_session_id_is_six_hex_chars() {
        let id = generate_session_id();
        assert_eq!(id.len(), 6);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, id.to_lowercase());
    }

    #[test]
    fn test_generated_ids_vary() {
        // 24 bits of randomness — two draws colliding is possible but
        // vanishingly unlikely; a stuck RNG is what this would catch.
        let ids: std::collections::HashSet<String> =
            (0..16).map(|_| generate_session_id()).collect();
        assert!(ids.len() > 1);
    }

    #[test]
    fn test_now_millis_is_recent() {
        // Sanity: after 2020, before 2100.
        let now = now_millis();
        assert!(now > 1_577_836_800_000);
        assert!(now < 4_102_444_800_000);
    }
}
