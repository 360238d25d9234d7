//! Spotify Web API client.
//!
//! Data calls are made on behalf of a signed-in user, so every one of them
//! takes that user's bearer token. The accounts token endpoint is called with
//! the app's confidential client credentials (code exchange and refresh).

mod models;

pub use models::*;

use base64::Engine;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

pub const API_BASE: &str = "https://api.spotify.com/v1";
pub const ACCOUNTS_BASE: &str = "https://accounts.spotify.com";

/// Read-only listening history access.
pub const SCOPES: &str = "user-top-read user-read-recently-played";

const MAX_ARTIST_IDS: usize = 50;
const MAX_FEATURE_IDS: usize = 100;

/// A failed upstream call. `status` is 0 when no HTTP response was usable
/// (transport failure or an undecodable body).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Spotify API error {status}: {message}")]
pub struct UpstreamError {
    pub status: u16,
    pub message: String,
}

impl UpstreamError {
    fn transport(message: String) -> Self {
        Self { status: 0, message }
    }
}

#[derive(Clone)]
pub struct SpotifyClient {
    client: Client,
    api_base: String,
    accounts_base: String,
    client_id: String,
    client_secret: String,
}

impl SpotifyClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client: Client::new(),
            api_base: API_BASE.to_string(),
            accounts_base: ACCOUNTS_BASE.to_string(),
            client_id,
            client_secret,
        }
    }

    /// Point the client at different API/accounts hosts.
    pub fn with_base_urls(mut self, api_base: &str, accounts_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.accounts_base = accounts_base.trim_end_matches('/').to_string();
        self
    }

    /// URL the user is sent to for consent. Spotify always shows the account
    /// picker so a different account can be chosen.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}/authorize?response_type=code&client_id={}&scope={}&redirect_uri={}&state={}&show_dialog=true",
            self.accounts_base,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(SCOPES),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for the user's first token pair.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant, UpstreamError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];
        self.token_request(&params).await
    }

    /// Trade a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, UpstreamError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        self.token_request(&params).await
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenGrant, UpstreamError> {
        let auth = base64::engine::general_purpose::STANDARD.encode(
            format!("{}:{}", self.client_id, self.client_secret).as_bytes(),
        );

        let res = self
            .client
            .post(format!("{}/api/token", self.accounts_base))
            .header("Authorization", format!("Basic {}", auth))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .form(params)
            .send()
            .await
            .map_err(|e| UpstreamError::transport(format!("token request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            let message = error_message(&body).unwrap_or_else(|| "Token request failed".to_string());
            warn!(status, %message, "token endpoint rejected request");
            return Err(UpstreamError { status, message });
        }

        res.json()
            .await
            .map_err(|e| UpstreamError::transport(format!("token parse failed: {}", e)))
    }

    /// One authenticated GET, JSON-decoded. Non-2xx responses carry the
    /// upstream error message when the body has one, `fallback` otherwise.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        url: &str,
        fallback: &str,
    ) -> Result<T, UpstreamError> {
        debug!(url, "GET upstream");

        let res = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| UpstreamError::transport(format!("request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            let message = error_message(&body).unwrap_or_else(|| fallback.to_string());
            warn!(status, %message, url, "Spotify API error");
            return Err(UpstreamError { status, message });
        }

        res.json()
            .await
            .map_err(|e| UpstreamError::transport(format!("response parse failed: {}", e)))
    }

    pub async fn top_tracks(&self, token: &str, range: TimeRange, limit: u32) -> Result<Vec<Track>, UpstreamError> {
        let url = format!("{}/me/top/tracks?limit={}&time_range={}", self.api_base, limit, range);
        let page: Page<Track> = self.get_json(token, &url, "Failed to fetch top tracks").await?;
        Ok(page.items)
    }

    pub async fn top_artists(&self, token: &str, range: TimeRange, limit: u32) -> Result<Vec<Artist>, UpstreamError> {
        let url = format!("{}/me/top/artists?limit={}&time_range={}", self.api_base, limit, range);
        let page: Page<Artist> = self.get_json(token, &url, "Failed to fetch top artists").await?;
        Ok(page.items)
    }

    /// Full artist objects for up to 50 IDs. Unknown IDs come back as None.
    pub async fn artists(&self, token: &str, ids: &[String]) -> Result<Vec<Option<Artist>>, UpstreamError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<_> = ids.iter().take(MAX_ARTIST_IDS).cloned().collect();
        let url = format!("{}/artists?ids={}", self.api_base, urlencoding::encode(&ids.join(",")));

        let body: ArtistsResponse = self.get_json(token, &url, "Failed to fetch artists").await?;
        Ok(body.artists)
    }

    /// Audio features for up to 100 track IDs. Returns None for tracks
    /// Spotify has no analysis for.
    pub async fn audio_features(&self, token: &str, ids: &[String]) -> Result<Vec<Option<AudioFeatures>>, UpstreamError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<_> = ids.iter().take(MAX_FEATURE_IDS).cloned().collect();
        let url = format!("{}/audio-features?ids={}", self.api_base, urlencoding::encode(&ids.join(",")));

        let body: AudioFeaturesResponse = self.get_json(token, &url, "Failed to fetch audio features").await?;
        Ok(body.audio_features)
    }
}

/// Web API errors look like `{"error":{"status":429,"message":"..."}}`, the
/// accounts service uses the OAuth shape `{"error":"...","error_description":"..."}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorEnvelope {
    Api { error: ApiErrorBody },
    OAuth { error: String, error_description: Option<String> },
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

fn error_message(body: &str) -> Option<String> {
    let message = match serde_json::from_str::<ErrorEnvelope>(body).ok()? {
        ErrorEnvelope::Api { error } => error.message,
        ErrorEnvelope::OAuth { error, error_description } => Some(error_description.unwrap_or(error)),
    };
    message.filter(|m| !m.is_empty())
}
