//! Shared test helpers: a fake Spotify (Web API + accounts token endpoint)
//! served on an ephemeral local port, and session cookie minting.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, Request, StatusCode, Uri},
    response::Response,
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::{json, Value};

use listening_insights::config::Config;
use listening_insights::session::{now_millis, Credential, SessionCodec};

pub const SECRET: &str = "test-session-secret";
pub const BASE_URL: &str = "http://app.test";

/// What the fake upstream should do differently from the happy path.
#[derive(Clone, Default)]
pub struct Behaviour {
    /// Status and body returned by /me/top/tracks instead of data.
    pub top_tracks_error: Option<(u16, Value)>,
    /// Every audio-features entry is null.
    pub null_features: bool,
    /// The token endpoint rejects refresh grants.
    pub refresh_fails: bool,
    /// When set, data endpoints accept only this bearer token.
    pub accepted_token: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Recorded {
    pub path: String,
    pub query: String,
    pub authorization: String,
    pub form: HashMap<String, String>,
}

pub struct FakeSpotify {
    behaviour: Behaviour,
    requests: Mutex<Vec<Recorded>>,
}

impl FakeSpotify {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, uri: &Uri, headers: &HeaderMap, form: HashMap<String, String>) {
        self.requests.lock().unwrap().push(Recorded {
            path: uri.path().to_string(),
            query: uri.query().unwrap_or_default().to_string(),
            authorization: headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string(),
            form,
        });
    }

    fn reject_token(&self, headers: &HeaderMap) -> Option<(StatusCode, Json<Value>)> {
        let accepted = self.behaviour.accepted_token.as_ref()?;
        let got = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
        if got == Some(format!("Bearer {}", accepted).as_str()) {
            return None;
        }
        Some((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "status": 401, "message": "The access token expired" } })),
        ))
    }
}

type Fake = Arc<FakeSpotify>;
type Reply = (StatusCode, Json<Value>);

pub fn track_json(i: usize) -> Value {
    let primary = format!("a{}", i % 4);
    json!({
        "id": format!("t{}", i),
        "name": format!("Track {}", i),
        "uri": format!("spotify:track:t{}", i),
        "duration_ms": 180_000 + 10_000 * i,
        "explicit": false,
        "popularity": 50,
        "artists": [
            { "id": primary, "name": primary.to_uppercase() },
            { "id": "ag", "name": "Guest" }
        ],
        "album": {
            "id": format!("al{}", i),
            "name": format!("Album {}", i),
            "images": [{ "url": format!("https://img.test/al{}.jpg", i), "width": 640, "height": 640 }]
        },
        "external_urls": { "spotify": format!("https://open.spotify.com/track/t{}", i) }
    })
}

fn images(id: &str, count: usize) -> Value {
    let sizes = ["large", "medium", "small"];
    Value::Array(
        sizes
            .iter()
            .take(count)
            .map(|s| json!({ "url": format!("https://img.test/{}-{}.jpg", id, s), "width": 64, "height": 64 }))
            .collect(),
    )
}

pub fn artist_json(id: &str) -> Option<Value> {
    let (genres, image_count): (Vec<&str>, usize) = match id {
        "a0" => (vec!["indie", "rock"], 3),
        "a1" => (vec!["rock"], 3),
        "a2" => (vec!["jazz"], 1),
        "a3" => (vec![], 3),
        "ag" => (vec!["pop"], 3),
        _ => return None,
    };
    Some(json!({
        "id": id,
        "name": id.to_uppercase(),
        "genres": genres,
        "images": images(id, image_count),
        "popularity": 40
    }))
}

const TRACK_COUNT: usize = 12;
const TOP_ARTISTS: [&str; 5] = ["a0", "a1", "a2", "a3", "ag"];

fn limit(params: &HashMap<String, String>) -> usize {
    params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(20)
}

fn ids(params: &HashMap<String, String>) -> Vec<String> {
    params
        .get("ids")
        .map(|s| s.split(',').filter(|i| !i.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

async fn top_tracks(State(fake): State<Fake>, uri: Uri, headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Reply {
    fake.record(&uri, &headers, HashMap::new());
    if let Some(rejected) = fake.reject_token(&headers) {
        return rejected;
    }
    if let Some((status, body)) = &fake.behaviour.top_tracks_error {
        return (StatusCode::from_u16(*status).unwrap(), Json(body.clone()));
    }
    let items: Vec<Value> = (0..TRACK_COUNT).take(limit(&params)).map(track_json).collect();
    (StatusCode::OK, Json(json!({ "items": items, "total": TRACK_COUNT, "limit": limit(&params), "offset": 0 })))
}

async fn top_artists(State(fake): State<Fake>, uri: Uri, headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Reply {
    fake.record(&uri, &headers, HashMap::new());
    if let Some(rejected) = fake.reject_token(&headers) {
        return rejected;
    }
    let items: Vec<Value> = TOP_ARTISTS.iter().take(limit(&params)).filter_map(|id| artist_json(id)).collect();
    (StatusCode::OK, Json(json!({ "items": items, "total": TOP_ARTISTS.len(), "limit": limit(&params), "offset": 0 })))
}

async fn artists(State(fake): State<Fake>, uri: Uri, headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Reply {
    fake.record(&uri, &headers, HashMap::new());
    if let Some(rejected) = fake.reject_token(&headers) {
        return rejected;
    }
    let artists: Vec<Value> = ids(&params)
        .iter()
        .map(|id| artist_json(id).unwrap_or(Value::Null))
        .collect();
    (StatusCode::OK, Json(json!({ "artists": artists })))
}

pub fn features_json(i: usize) -> Value {
    let x = i as f64;
    json!({
        "id": format!("t{}", i),
        "danceability": 0.1 + 0.05 * x,
        "energy": 0.9 - 0.05 * x,
        "valence": 0.3 + 0.02 * (x % 5.0),
        "tempo": 90.0 + 3.0 * x,
        "acousticness": 0.5 - 0.01 * (x % 3.0),
        "speechiness": 0.04 + 0.01 * (x % 2.0),
        "liveness": 0.1 + 0.03 * (x % 4.0),
        "key": 5,
        "mode": 1
    })
}

async fn audio_features(State(fake): State<Fake>, uri: Uri, headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Reply {
    fake.record(&uri, &headers, HashMap::new());
    if let Some(rejected) = fake.reject_token(&headers) {
        return rejected;
    }
    let features: Vec<Value> = ids(&params)
        .iter()
        .map(|id| {
            let i: usize = id.trim_start_matches('t').parse().unwrap_or(usize::MAX);
            // the last track never has an analysis
            if fake.behaviour.null_features || i >= TRACK_COUNT - 1 {
                Value::Null
            } else {
                features_json(i)
            }
        })
        .collect();
    (StatusCode::OK, Json(json!({ "audio_features": features })))
}

async fn token(State(fake): State<Fake>, uri: Uri, headers: HeaderMap, Form(form): Form<HashMap<String, String>>) -> Reply {
    fake.record(&uri, &headers, form.clone());
    let invalid = |description: &str| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": description })),
        )
    };
    match form.get("grant_type").map(String::as_str) {
        Some("refresh_token") if fake.behaviour.refresh_fails => invalid("Refresh token revoked"),
        Some("refresh_token") => (
            StatusCode::OK,
            Json(json!({ "access_token": "fresh-token", "token_type": "Bearer", "expires_in": 3600 })),
        ),
        Some("authorization_code") if form.get("code").map(String::as_str) == Some("good-code") => (
            StatusCode::OK,
            Json(json!({
                "access_token": "signed-in-token",
                "token_type": "Bearer",
                "refresh_token": "r-1",
                "expires_in": 3600,
                "scope": "user-top-read user-read-recently-played"
            })),
        ),
        _ => invalid("Invalid authorization code"),
    }
}

/// Start the fake upstream; returns its base URL (no trailing slash).
pub async fn spawn_fake_spotify(behaviour: Behaviour) -> (String, Fake) {
    let fake = Arc::new(FakeSpotify { behaviour, requests: Mutex::new(Vec::new()) });

    let app = Router::new()
        .route("/v1/me/top/tracks", get(top_tracks))
        .route("/v1/me/top/artists", get(top_artists))
        .route("/v1/artists", get(artists))
        .route("/v1/audio-features", get(audio_features))
        .route("/api/token", post(token))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), fake)
}

pub fn test_config(upstream: &str) -> Config {
    Config {
        port: 0,
        spotify_client_id: "client-id".into(),
        spotify_client_secret: "client-secret".into(),
        session_secret: SECRET.into(),
        base_url: BASE_URL.into(),
        spotify_api_base: format!("{}/v1", upstream),
        spotify_accounts_base: upstream.into(),
        allowed_origins: vec![BASE_URL.into()],
        static_dir: None,
    }
}

pub fn credential(access_token: &str, expires_in_ms: i64) -> Credential {
    Credential {
        access_token: access_token.into(),
        refresh_token: Some("refresh-1".into()),
        expires_at: now_millis() + expires_in_ms,
        error: None,
    }
}

/// `Cookie` header value carrying a signed session for `credential`.
pub fn session_cookie(credential: &Credential) -> String {
    let cookie = SessionCodec::new(SECRET).issue(credential, now_millis()).unwrap();
    format!("{}={}", cookie.name(), cookie.value())
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Should parse JSON")
}

/// Value of the `name` cookie set by the response, if any.
pub fn set_cookie(response: &Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .map(|v| v.to_string())
}

pub fn cookie_value(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, value)| value.to_string())
        .unwrap_or_default()
}
