use serde::{Deserialize, Serialize};

use crate::domain::{Season, SeasonKey};

/// Descriptive fields carried from the provider payload to the stored record
/// without influencing any pipeline decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordDetails {
    pub title_english: Option<String>,
    pub image_url: Option<String>,
    pub trailer_url: Option<String>,
    pub synopsis: Option<String>,
    pub background: Option<String>,
    pub episodes: Option<i32>,
    pub scored_by: Option<i64>,
    pub rank: Option<i64>,
    pub favorites: Option<i64>,
    #[serde(rename = "type")]
    pub format: Option<String>,
    pub status: Option<String>,
    pub airing: Option<bool>,
    pub duration: Option<String>,
    pub rating: Option<String>,
    pub source: Option<String>,
    pub themes: Vec<String>,
    pub aired_from: Option<String>,
    pub aired_to: Option<String>,
    pub broadcast: Option<String>,
    pub url: Option<String>,
}

/// A tag as reported by a provider, with the number of users who applied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTag {
    pub name: String,
    #[serde(default)]
    pub count: i64,
}

impl RawTag {
    pub fn new(name: impl Into<String>, count: i64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// Provider-agnostic record as handed over by a fetch collaborator, before
/// classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub id: Option<i64>,
    pub title: String,
    pub title_native: Option<String>,
    pub synonyms: Vec<String>,
    pub score: Option<f64>,
    pub members: Option<i64>,
    pub popularity: Option<i64>,
    pub studios: Vec<String>,
    pub producers: Vec<String>,
    pub licensors: Vec<String>,
    /// Genre names already in provider vocabulary (Jikan).
    pub genres: Vec<String>,
    /// Free-text tags that still need normalization (Bangumi).
    pub tags: Vec<RawTag>,
    pub demographics: Vec<String>,
    /// Provider-level explicit content flag.
    pub nsfw: bool,
    pub details: RecordDetails,
}

/// One title for one (year, season), as persisted.
///
/// The identifier is stored under `mal_id` and the adult flag under
/// `is_hentai` so the files stay readable by the existing web front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "mal_id")]
    pub id: i64,
    pub title: String,
    #[serde(rename = "title_japanese", default)]
    pub title_native: Option<String>,
    #[serde(rename = "title_synonyms", default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub members: Option<i64>,
    #[serde(default)]
    pub popularity: Option<i64>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub studios: Vec<String>,
    #[serde(default)]
    pub producers: Vec<String>,
    #[serde(default)]
    pub licensors: Vec<String>,
    #[serde(default)]
    pub demographics: Vec<String>,
    pub year: i32,
    pub season: Season,
    #[serde(default)]
    pub is_japanese: bool,
    #[serde(rename = "is_hentai", default)]
    pub is_adult: bool,
    #[serde(default)]
    pub is_kid: bool,
    #[serde(flatten)]
    pub details: RecordDetails,
}

impl Record {
    #[must_use]
    pub const fn key(&self) -> SeasonKey {
        SeasonKey::new(self.year, self.season)
    }

    /// Rated records only; a missing score never counts as zero in statistics.
    #[must_use]
    pub fn rated_score(&self) -> Option<f64> {
        self.score.filter(|s| s.is_finite())
    }
}
