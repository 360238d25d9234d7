//! Spotify Web API payload types (simplified to the fields we use).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lookback period for the `/me/top/*` endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TimeRange {
    /// Roughly the last four weeks.
    ShortTerm,
    /// Roughly the last six months.
    #[default]
    MediumTerm,
    /// Several years of history.
    LongTerm,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short_term" => Ok(TimeRange::ShortTerm),
            "medium_term" => Ok(TimeRange::MediumTerm),
            "long_term" => Ok(TimeRange::LongTerm),
            other => Err(format!(
                "invalid time_range '{}', expected one of short_term, medium_term, long_term",
                other
            )),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
}

/// A Spotify track (simplified).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Album,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

/// Artist as returned both by the full artist endpoints and, without
/// genres or images, inside a track.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct Artist {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct Album {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct Image {
    pub url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

// ---------------------------------------------------------------------------
// Audio Features (GET /v1/audio-features)
// ---------------------------------------------------------------------------

/// Named numeric audio descriptor. The set is closed and mirrors the
/// numeric fields of the upstream audio-features object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Descriptor {
    Acousticness,
    Danceability,
    Energy,
    Instrumentalness,
    Key,
    Liveness,
    Loudness,
    Mode,
    Speechiness,
    Tempo,
    TimeSignature,
    Valence,
}

impl Descriptor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Descriptor::Acousticness => "acousticness",
            Descriptor::Danceability => "danceability",
            Descriptor::Energy => "energy",
            Descriptor::Instrumentalness => "instrumentalness",
            Descriptor::Key => "key",
            Descriptor::Liveness => "liveness",
            Descriptor::Loudness => "loudness",
            Descriptor::Mode => "mode",
            Descriptor::Speechiness => "speechiness",
            Descriptor::Tempo => "tempo",
            Descriptor::TimeSignature => "time_signature",
            Descriptor::Valence => "valence",
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Descriptor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Per-track audio features. Any field may be absent upstream.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AudioFeatures {
    pub id: Option<String>,
    pub acousticness: Option<f64>,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub key: Option<f64>,
    pub liveness: Option<f64>,
    pub loudness: Option<f64>,
    pub mode: Option<f64>,
    pub speechiness: Option<f64>,
    pub tempo: Option<f64>,
    pub time_signature: Option<f64>,
    pub valence: Option<f64>,
}

impl AudioFeatures {
    pub fn value(&self, descriptor: Descriptor) -> Option<f64> {
        match descriptor {
            Descriptor::Acousticness => self.acousticness,
            Descriptor::Danceability => self.danceability,
            Descriptor::Energy => self.energy,
            Descriptor::Instrumentalness => self.instrumentalness,
            Descriptor::Key => self.key,
            Descriptor::Liveness => self.liveness,
            Descriptor::Loudness => self.loudness,
            Descriptor::Mode => self.mode,
            Descriptor::Speechiness => self.speechiness,
            Descriptor::Tempo => self.tempo,
            Descriptor::TimeSignature => self.time_signature,
            Descriptor::Valence => self.valence,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct ArtistsResponse {
    pub artists: Vec<Option<Artist>>,
}

#[derive(Deserialize)]
pub(crate) struct AudioFeaturesResponse {
    pub audio_features: Vec<Option<AudioFeatures>>,
}

/// Token endpoint response, for both the authorization-code and refresh grants.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

fn default_expires_in() -> u64 { 3600 }
