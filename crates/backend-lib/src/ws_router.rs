// ============================
// chat-backend-lib/src/ws_router.rs
// ============================
//! WebSocket router and connection handling.
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth;
use crate::session;
use crate::AppState;

/// Create the WebSocket router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for WebSocket connections. The session credential travels as a
/// cookie on the upgrade request; it is resolved after the upgrade so that
/// clients can observe the 1008 close instead of an opaque handshake failure.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    metrics::counter!(crate::metrics::WS_CONNECTION).increment(1);
    metrics::gauge!(crate::metrics::WS_ACTIVE).increment(1.0);

    let token = auth::session_cookie(&headers);
    ws.on_upgrade(move |socket| async move {
        session::handle_socket(socket, state, token).await;
        metrics::gauge!(crate::metrics::WS_ACTIVE).decrement(1.0);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::store::MemoryStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState::new(Arc::new(MemoryStore::new()), Settings::default())
    }

    #[tokio::test]
    async fn test_plain_get_is_not_a_websocket() {
        let app = create_router(test_state());

        // Without upgrade headers the route must not serve anything useful.
        let response = app
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_ne!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/not-here")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
