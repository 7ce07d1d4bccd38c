use anyhow::Context;
use axum::{
    debug_handler,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tower_http::cors::CorsLayer;

use crate::{
    configuration::Settings,
    modules::{auth::AuthRef, store::StoreRef},
    state::AppState,
    utils::session::{spawn_sweeper, Sessions},
};

pub mod auth;
pub mod chats;
pub mod friends;
pub mod live;
pub mod messages;
pub mod profile;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Must be called from within a tokio runtime.
pub fn app(config: &Settings, store: StoreRef, auth: AuthRef) -> anyhow::Result<Router> {
    let origin = config
        .app
        .origin
        .parse::<HeaderValue>()
        .context("Invalid origin")?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true);

    let state = AppState::new(config, store, auth);
    spawn_sweeper(&state.sessions, SESSION_SWEEP_INTERVAL);

    let api = Router::new()
        .nest("/auth", auth::router())
        .nest("/profile", profile::router())
        .nest("/friends", friends::router())
        .nest("/chats", chats::router())
        .nest("/messages", messages::router())
        .nest("/live", live::router())
        .route("/health", get(health_check))
        .with_state(state)
        .layer(cors);

    Ok(Router::new().nest("/api", api))
}

#[debug_handler(state = AppState)]
async fn health_check(State(sessions): State<Arc<Sessions>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "all backend services are working properly",
            "sessions": sessions.len(),
        })),
    )
}
