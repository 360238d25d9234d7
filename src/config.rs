use std::env;
use std::path::PathBuf;

use crate::spotify::{ACCOUNTS_BASE, API_BASE};

const DEFAULT_ALLOWED_ORIGINS: &str = "http://127.0.0.1:3000,http://localhost:3000";

/// Application configuration from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    /// HMAC key for the session cookie.
    pub session_secret: String,
    /// Where the single-page UI lives; sign-in always lands back here.
    pub base_url: String,
    pub spotify_api_base: String,
    pub spotify_accounts_base: String,
    pub allowed_origins: Vec<String>,
    pub static_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let spotify_client_id = env::var("SPOTIFY_CLIENT_ID")
            .map_err(|_| anyhow::anyhow!("SPOTIFY_CLIENT_ID is required"))?;

        let spotify_client_secret = env::var("SPOTIFY_CLIENT_SECRET")
            .map_err(|_| anyhow::anyhow!("SPOTIFY_CLIENT_SECRET is required"))?;

        let session_secret = env::var("SESSION_SECRET")
            .map_err(|_| anyhow::anyhow!("SESSION_SECRET is required"))?;

        let base_url = env::var("BASE_URL").unwrap_or_else(|_| format!("http://127.0.0.1:{}", port));

        Ok(Self {
            port,
            spotify_client_id,
            spotify_client_secret,
            session_secret,
            base_url: base_url.trim_end_matches('/').to_string(),
            spotify_api_base: env::var("SPOTIFY_API_BASE").unwrap_or_else(|_| API_BASE.into()),
            spotify_accounts_base: env::var("SPOTIFY_ACCOUNTS_BASE").unwrap_or_else(|_| ACCOUNTS_BASE.into()),
            allowed_origins: parse_origins(
                &env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.into()),
            ),
            static_dir: env::var("STATIC_DIR").ok().filter(|d| !d.is_empty()).map(PathBuf::from),
        })
    }

    /// OAuth redirect URI registered with Spotify.
    pub fn redirect_uri(&self) -> String {
        format!("{}/api/auth/callback", self.base_url)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
