//! Sign-in with Spotify (authorization code flow) and session inspection.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::session::{now_millis, Credential, SessionCodec};
use crate::state::AppState;

/// Holds the CSRF `state` between /signin and /callback.
pub const STATE_COOKIE: &str = "oauth_state";

const STATE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub authenticated: bool,
    pub expires_at: Option<i64>,
    pub error: Option<String>,
}

fn state_cookie_removal() -> Cookie<'static> {
    Cookie::build(STATE_COOKIE).path("/").build()
}

/// GET /api/auth/signin - Redirect to Spotify's consent page.
pub async fn sign_in(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let csrf = Uuid::new_v4().simple().to_string();
    let url = state.spotify.authorize_url(&state.redirect_uri, &csrf);

    let cookie = Cookie::build((STATE_COOKIE, csrf))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(STATE_TTL_MINUTES))
        .build();

    (jar.add(cookie), Redirect::to(&url))
}

/// GET /api/auth/callback - Finish sign-in and set the session cookie.
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackQuery>,
) -> Result<(CookieJar, Redirect), AppError> {
    if let Some(error) = params.error {
        warn!(%error, "sign-in declined by provider");
        return Ok((jar.remove(state_cookie_removal()), Redirect::to(&state.base_url)));
    }

    let expected = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    match (params.state.as_deref(), expected.as_deref()) {
        (Some(got), Some(want)) if got == want => {}
        _ => return Err(AppError::BadRequest("OAuth state mismatch".into())),
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("missing authorization code".into()))?;

    let grant = state.spotify.exchange_code(&code, &state.redirect_uri).await?;
    let now = now_millis();
    let credential = Credential::from_grant(grant, None, now);
    let session = state.sessions.issue(&credential, now)?;
    info!("user signed in");

    Ok((
        jar.remove(state_cookie_removal()).add(session),
        Redirect::to(&state.base_url),
    ))
}

/// GET /api/auth/signout
pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    (jar.remove(SessionCodec::removal()), Redirect::to(&state.base_url))
}

/// GET /api/auth/session - What the UI needs to know about the session.
/// Read-only: never refreshes and never calls Spotify.
pub async fn session_info(State(state): State<AppState>, jar: CookieJar) -> Json<SessionInfo> {
    let info = match state.sessions.read(&jar) {
        Some(c) => SessionInfo { authenticated: true, expires_at: Some(c.expires_at), error: c.error },
        None => SessionInfo { authenticated: false, expires_at: None, error: None },
    };
    Json(info)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signin", get(sign_in))
        .route("/api/auth/callback", get(callback))
        .route("/api/auth/signout", get(sign_out))
        .route("/api/auth/session", get(session_info))
}
