//! Derived views over already-fetched listening data.
//!
//! Everything here is a pure function of its inputs: no I/O, no clock.

use std::collections::HashMap;

use serde::Serialize;

use crate::spotify::{Artist, AudioFeatures, Descriptor, Track};

/// How many entries the genre views report.
pub const GENRE_LIMIT: usize = 10;

/// Descriptors correlated by the feature-correlation view, in output order.
pub const FEATURE_KEYS: [Descriptor; 7] = [
    Descriptor::Danceability,
    Descriptor::Energy,
    Descriptor::Valence,
    Descriptor::Tempo,
    Descriptor::Acousticness,
    Descriptor::Speechiness,
    Descriptor::Liveness,
];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregateError {
    #[error("{0}")]
    InsufficientData(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreImage {
    pub genre: String,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreMinutes {
    pub genre: String,
    pub minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub keys: Vec<Descriptor>,
    pub matrix: Vec<Vec<f64>>,
}

pub fn top_n<T>(mut items: Vec<T>, n: usize) -> Vec<T> {
    items.truncate(n);
    items
}

/// Running per-genre totals that remember first-seen order, so ranking can
/// break ties by it.
struct GenreTotals {
    entries: Vec<GenreTotal>,
    index: HashMap<String, usize>,
}

struct GenreTotal {
    genre: String,
    total: f64,
    image_url: Option<String>,
}

impl GenreTotals {
    fn new() -> Self {
        Self { entries: Vec::new(), index: HashMap::new() }
    }

    fn add(&mut self, genre: &str, amount: f64, image_url: Option<&str>) {
        let i = match self.index.get(genre) {
            Some(&i) => i,
            None => {
                self.entries.push(GenreTotal { genre: genre.to_string(), total: 0.0, image_url: None });
                self.index.insert(genre.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[i];
        entry.total += amount;
        if entry.image_url.is_none() {
            entry.image_url = image_url.map(str::to_string);
        }
    }

    fn ranked(mut self, limit: usize) -> Vec<GenreTotal> {
        // sort_by is stable: equal totals stay in first-seen order
        self.entries
            .sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(std::cmp::Ordering::Equal));
        self.entries.truncate(limit);
        self.entries
    }
}

/// Count how many of the given artists carry each genre and keep the
/// top ten, each with the first artist thumbnail seen for it.
///
/// The thumbnail is the artist's third image, the smallest rendition Spotify
/// returns.
pub fn genre_tally(artists: &[Artist]) -> Vec<GenreImage> {
    let mut totals = GenreTotals::new();
    for artist in artists {
        let thumbnail = artist.images.get(2).and_then(|i| i.url.as_deref());
        for genre in &artist.genres {
            totals.add(genre, 1.0, thumbnail);
        }
    }

    totals
        .ranked(GENRE_LIMIT)
        .into_iter()
        .map(|t| GenreImage { genre: t.genre, image_url: t.image_url })
        .collect()
}

/// Listening time per genre, top ten, in whole minutes.
///
/// A track is attributed to its primary (first) artist's genres. Its duration
/// is split evenly between them rather than counted in full for each one, and
/// minutes are floored, so the reported minutes never exceed the total
/// duration of the input tracks. Tracks whose primary artist is unknown or
/// has no genres contribute nothing.
pub fn genre_duration(tracks: &[Track], artists: &[Artist]) -> Vec<GenreMinutes> {
    let by_id: HashMap<&str, &Artist> = artists
        .iter()
        .filter_map(|a| a.id.as_deref().map(|id| (id, a)))
        .collect();

    let mut totals = GenreTotals::new();
    for track in tracks {
        let primary = track
            .artists
            .first()
            .and_then(|a| a.id.as_deref())
            .and_then(|id| by_id.get(id));
        let Some(primary) = primary else { continue };
        if primary.genres.is_empty() {
            continue;
        }
        let share = track.duration_ms as f64 / primary.genres.len() as f64;
        for genre in &primary.genres {
            totals.add(genre, share, None);
        }
    }

    totals
        .ranked(GENRE_LIMIT)
        .into_iter()
        .map(|t| GenreMinutes { genre: t.genre, minutes: (t.total / 60_000.0).floor() as u64 })
        .collect()
}

/// Pearson correlation between every ordered pair of `keys` across the
/// tracks that have audio features.
///
/// Tracks with no features at all are dropped; a missing individual value
/// counts as 0.0. A descriptor with zero variance correlates 0.0 with
/// everything, itself included. Entries are rounded to two decimals.
pub fn correlation_matrix(
    features: &[Option<AudioFeatures>],
    keys: &[Descriptor],
) -> Result<CorrelationMatrix, AggregateError> {
    let rows: Vec<Vec<f64>> = features
        .iter()
        .flatten()
        .map(|f| keys.iter().map(|&k| f.value(k).unwrap_or(0.0)).collect())
        .collect();

    if rows.is_empty() {
        return Err(AggregateError::InsufficientData(
            "No audio features available for the selected tracks".to_string(),
        ));
    }

    let n = rows.len() as f64;
    // A constant column takes its value as the mean, so its deviations are
    // exactly zero; sum / n would leave rounding noise behind.
    let means: Vec<f64> = (0..keys.len())
        .map(|k| {
            let first = rows[0][k];
            if rows.iter().all(|r| r[k] == first) {
                first
            } else {
                rows.iter().map(|r| r[k]).sum::<f64>() / n
            }
        })
        .collect();

    let matrix = (0..keys.len())
        .map(|i| {
            (0..keys.len())
                .map(|j| {
                    let (mut cov, mut var_i, mut var_j) = (0.0, 0.0, 0.0);
                    for row in &rows {
                        let di = row[i] - means[i];
                        let dj = row[j] - means[j];
                        cov += di * dj;
                        var_i += di * di;
                        var_j += dj * dj;
                    }
                    if var_i == 0.0 || var_j == 0.0 {
                        return 0.0;
                    }
                    round2((cov / (var_i * var_j).sqrt()).clamp(-1.0, 1.0))
                })
                .collect()
        })
        .collect();

    Ok(CorrelationMatrix { keys: keys.to_vec(), matrix })
}

fn round2(x: f64) -> f64 {
    // + 0.0 turns -0.0 into 0.0
    (x * 100.0).round() / 100.0 + 0.0
}
