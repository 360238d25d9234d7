//! Signed-in user's Spotify credential, carried in a signed cookie.
//!
//! The cookie holds an HS256 JWT whose claims are the [`Credential`] plus an
//! `exp` for the session itself. The access token inside may expire long
//! before the session does; [`require_session`] refreshes it on the way in.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::AppError;
use crate::spotify::{SpotifyClient, TokenGrant};
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// Error flag set on a credential whose refresh failed.
pub const REFRESH_ERROR: &str = "RefreshAccessTokenError";

const SESSION_TTL_DAYS: i64 = 30;

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Epoch milliseconds.
    pub expires_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Credential {
    /// Build from a token response. Spotify may omit the refresh token on a
    /// refresh grant, in which case `previous_refresh` is kept.
    pub fn from_grant(grant: TokenGrant, previous_refresh: Option<String>, now_ms: i64) -> Self {
        Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token.or(previous_refresh),
            expires_at: now_ms + grant.expires_in as i64 * 1000,
            error: None,
        }
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }
}

#[derive(Serialize, Deserialize)]
struct SessionClaims {
    #[serde(flatten)]
    credential: Credential,
    exp: i64,
}

/// Signs and verifies the session cookie.
#[derive(Clone)]
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    secure: bool,
}

impl SessionCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            secure: false,
        }
    }

    /// Mark issued cookies `Secure` (HTTPS deployments).
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn issue(&self, credential: &Credential, now_ms: i64) -> Result<Cookie<'static>, AppError> {
        let claims = SessionClaims {
            credential: credential.clone(),
            exp: now_ms / 1000 + SESSION_TTL_DAYS * 24 * 3600,
        };
        let value = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;

        Ok(Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::days(SESSION_TTL_DAYS))
            .build())
    }

    /// Verify a cookie value. Anything unsigned, tampered with, expired or
    /// lacking an access token is no session at all.
    pub fn decode(&self, value: &str) -> Option<Credential> {
        match decode::<SessionClaims>(value, &self.decoding, &self.validation) {
            Ok(data) if !data.claims.credential.access_token.is_empty() => Some(data.claims.credential),
            Ok(_) => None,
            Err(e) => {
                debug!("rejecting session cookie: {}", e);
                None
            }
        }
    }

    pub fn read(&self, jar: &CookieJar) -> Option<Credential> {
        jar.get(SESSION_COOKIE).and_then(|c| self.decode(c.value()))
    }

    /// Cookie that, passed to `CookieJar::remove`, clears the session.
    pub fn removal() -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE).path("/").build()
    }
}

/// Exchange the refresh token for a new access token.
///
/// Never fails: on any error the old credential comes back flagged with
/// [`REFRESH_ERROR`], and the next upstream call fails authentication.
pub async fn refresh_credential(spotify: &SpotifyClient, credential: Credential, now_ms: i64) -> Credential {
    let Some(refresh_token) = credential.refresh_token.clone() else {
        error!("access token expired and no refresh token is held");
        return Credential { error: Some(REFRESH_ERROR.to_string()), ..credential };
    };

    match spotify.refresh(&refresh_token).await {
        Ok(grant) => {
            info!("access token refreshed");
            Credential::from_grant(grant, Some(refresh_token), now_ms)
        }
        Err(e) => {
            error!("error refreshing access token: {}", e);
            Credential { error: Some(REFRESH_ERROR.to_string()), ..credential }
        }
    }
}

/// Middleware guarding the data routes.
///
/// Rejects requests without a valid session before anything reaches Spotify,
/// refreshes an expired access token (re-issuing the cookie on the response),
/// and hands the resolved [`Credential`] to the handler as an extension.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let credential = state.sessions.read(&jar).ok_or(AppError::Unauthenticated)?;

    let now = now_millis();
    if !credential.is_expired(now) {
        req.extensions_mut().insert(credential);
        return Ok(next.run(req).await);
    }

    debug!("access token expired, refreshing");
    let credential = refresh_credential(&state.spotify, credential, now).await;
    let cookie = state.sessions.issue(&credential, now)?;
    req.extensions_mut().insert(credential);

    let response = next.run(req).await;
    Ok((jar.add(cookie), response).into_response())
}
