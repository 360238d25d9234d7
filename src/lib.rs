//! Listening insights for a signed-in Spotify user: top tracks, artists and
//! genres, and how audio features of the top tracks correlate.

pub mod aggregate;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod session;
pub mod spotify;
pub mod state;

use axum::{http::HeaderValue, Router};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::state::AppState;

/// Build the full application: API routes, session guard, CORS, tracing and,
/// when configured, the static UI as fallback.
pub fn build_router(config: &Config) -> Router {
    let state = AppState::from_config(config);

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([axum::http::Method::GET])
        .allow_credentials(true);

    let mut app = handlers::router(state.clone()).with_state(state);
    if let Some(dir) = &config.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(cors).layer(TraceLayer::new_for_http())
}
