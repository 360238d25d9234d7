use crate::config::Config;
use crate::session::SessionCodec;
use crate::spotify::SpotifyClient;

/// Shared, read-only per-process state. Nothing in here changes after startup.
#[derive(Clone)]
pub struct AppState {
    pub spotify: SpotifyClient,
    pub sessions: SessionCodec,
    pub base_url: String,
    pub redirect_uri: String,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let spotify = SpotifyClient::new(
            config.spotify_client_id.clone(),
            config.spotify_client_secret.clone(),
        )
        .with_base_urls(&config.spotify_api_base, &config.spotify_accounts_base);

        let sessions = SessionCodec::new(&config.session_secret)
            .secure(config.base_url.starts_with("https://"));

        Self {
            spotify,
            sessions,
            base_url: config.base_url.clone(),
            redirect_uri: config.redirect_uri(),
        }
    }
}
