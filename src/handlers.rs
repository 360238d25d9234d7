//! HTTP handlers for the listening-history views.

use std::collections::HashSet;

use axum::{
    extract::{Query, State},
    middleware,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use tracing::debug;

use crate::aggregate::{self, CorrelationMatrix, GenreImage, GenreMinutes, FEATURE_KEYS};
use crate::auth;
use crate::error::AppError;
use crate::session::{require_session, Credential};
use crate::spotify::{Artist, TimeRange, Track};
use crate::state::AppState;

/// Items returned by the top-N views.
const TOP_N: u32 = 10;
/// Items fetched as input for the aggregated views (Spotify's page maximum).
const SAMPLE_SIZE: u32 = 50;

/// Query parameters shared by every view.
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    /// One of `short_term`, `medium_term`, `long_term` (default `medium_term`).
    #[serde(default)]
    pub time_range: Option<String>,
}

impl RangeQuery {
    fn time_range(&self) -> Result<TimeRange, AppError> {
        match self.time_range.as_deref() {
            None | Some("") => Ok(TimeRange::default()),
            Some(raw) => raw.parse().map_err(AppError::BadRequest),
        }
    }
}

/// GET /health - Health check.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/spotify/top-tracks
pub async fn top_tracks(
    State(state): State<AppState>,
    Extension(credential): Extension<Credential>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<Vec<Track>>, AppError> {
    let range = params.time_range()?;
    let tracks = state.spotify.top_tracks(&credential.access_token, range, TOP_N).await?;
    Ok(Json(aggregate::top_n(tracks, TOP_N as usize)))
}

/// GET /api/spotify/top-artists
pub async fn top_artists(
    State(state): State<AppState>,
    Extension(credential): Extension<Credential>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<Vec<Artist>>, AppError> {
    let range = params.time_range()?;
    let artists = state.spotify.top_artists(&credential.access_token, range, TOP_N).await?;
    Ok(Json(aggregate::top_n(artists, TOP_N as usize)))
}

/// GET /api/spotify/top-genres - Most frequent genres across the top artists.
pub async fn top_genres(
    State(state): State<AppState>,
    Extension(credential): Extension<Credential>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<Vec<GenreImage>>, AppError> {
    let range = params.time_range()?;
    let artists = state.spotify.top_artists(&credential.access_token, range, SAMPLE_SIZE).await?;
    Ok(Json(aggregate::genre_tally(&artists)))
}

/// GET /api/spotify/genre-duration - Minutes per genre across the top tracks.
pub async fn genre_duration(
    State(state): State<AppState>,
    Extension(credential): Extension<Credential>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<Vec<GenreMinutes>>, AppError> {
    let range = params.time_range()?;
    let token = &credential.access_token;

    let tracks = state.spotify.top_tracks(token, range, SAMPLE_SIZE).await?;

    // only the primary artist's genres count, so only those need fetching
    let mut seen = HashSet::new();
    let artist_ids: Vec<String> = tracks
        .iter()
        .filter_map(|t| t.artists.first().and_then(|a| a.id.clone()))
        .filter(|id| seen.insert(id.clone()))
        .collect();
    debug!(tracks = tracks.len(), artists = artist_ids.len(), "aggregating genre duration");

    let artists: Vec<Artist> = state
        .spotify
        .artists(token, &artist_ids)
        .await?
        .into_iter()
        .flatten()
        .collect();

    Ok(Json(aggregate::genre_duration(&tracks, &artists)))
}

/// GET /api/spotify/feature-correlation - Pearson matrix over audio features
/// of the top tracks.
pub async fn feature_correlation(
    State(state): State<AppState>,
    Extension(credential): Extension<Credential>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<CorrelationMatrix>, AppError> {
    let range = params.time_range()?;
    let token = &credential.access_token;

    let tracks = state.spotify.top_tracks(token, range, SAMPLE_SIZE).await?;
    let ids: Vec<String> = tracks.into_iter().map(|t| t.id).collect();
    let features = state.spotify.audio_features(token, &ids).await?;
    debug!(tracks = ids.len(), features = features.iter().flatten().count(), "correlating audio features");

    Ok(Json(aggregate::correlation_matrix(&features, &FEATURE_KEYS)?))
}

/// Build the API router.
pub fn router(state: AppState) -> Router<AppState> {
    let views = Router::new()
        .route("/api/spotify/top-tracks", get(top_tracks))
        .route("/api/spotify/top-artists", get(top_artists))
        .route("/api/spotify/top-genres", get(top_genres))
        .route("/api/spotify/genre-duration", get(genre_duration))
        .route("/api/spotify/feature-correlation", get(feature_correlation))
        .route_layer(middleware::from_fn_with_state(state, require_session));

    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(views)
}
