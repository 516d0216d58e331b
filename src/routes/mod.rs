use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS},
    },
};
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::{error::AppError, state::SharedState};

/// Swagger UI and OpenAPI document.
pub mod docs;
/// Health check route.
pub mod health;
/// Leaderboard routes.
pub mod scores;

/// Compose all route trees, wiring in shared state, documentation and middleware.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router().merge(scores::router());
    api_router
        .merge(docs::router())
        .fallback(not_found)
        .with_state(state)
        .layer(cors_layer())
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Methods advertised on every response.
const ALLOWED_METHODS: &str = "GET,POST,OPTIONS";

/// Any origin and header; only the methods the score endpoint serves.
///
/// The layer only adds the header and method lists to real preflights; the router repeats
/// them on every other response.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
}

async fn not_found() -> AppError {
    AppError::NotFound
}
