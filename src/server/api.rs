use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json,
    Router,
};
use log::error;
use tower_http::cors::{Any, CorsLayer};

use crate::models::chat::ErrorResponse;
use crate::relay::Relay;

#[derive(Clone)]
struct AppState {
    relay: Arc<Relay>,
}

pub fn router(relay: Arc<Relay>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", any(chat_handler))
        .layer(cors)
        .with_state(AppState { relay })
}

/// The method guard runs before any body handling so the route answers
/// every verb itself instead of leaving 405s to the framework's bare
/// default response.
async fn chat_handler(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(ErrorResponse { error: "Method not allowed".to_string() }),
        ).into_response();
    }

    match state.relay.handle(&body).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => {
            error!("Chat relay error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse { error: e.to_string() }),
            ).into_response()
        }
    }
}
