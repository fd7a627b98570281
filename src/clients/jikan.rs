use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use super::{FetchError, build_http_client, check_status};
use crate::config::JikanConfig;
use crate::domain::SeasonKey;
use crate::models::{RawRecord, RecordDetails};

#[derive(Debug, Default, Deserialize)]
pub struct SeasonPage {
    #[serde(default)]
    pub data: Vec<MalAnime>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub has_next_page: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MalAnime {
    pub mal_id: Option<i64>,
    pub url: Option<String>,
    pub images: Option<Images>,
    pub trailer: Option<Trailer>,
    pub title: Option<String>,
    pub title_english: Option<String>,
    pub title_japanese: Option<String>,
    pub title_synonyms: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub anime_type: Option<String>,
    pub source: Option<String>,
    pub episodes: Option<i32>,
    pub status: Option<String>,
    pub airing: Option<bool>,
    pub aired: Option<Aired>,
    pub duration: Option<String>,
    pub rating: Option<String>,
    pub score: Option<f64>,
    pub scored_by: Option<i64>,
    pub rank: Option<i64>,
    pub popularity: Option<i64>,
    pub members: Option<i64>,
    pub favorites: Option<i64>,
    pub synopsis: Option<String>,
    pub background: Option<String>,
    pub broadcast: Option<Broadcast>,
    pub producers: Option<Vec<MalGenericInfo>>,
    pub licensors: Option<Vec<MalGenericInfo>>,
    pub studios: Option<Vec<MalGenericInfo>>,
    pub genres: Option<Vec<MalGenericInfo>>,
    pub themes: Option<Vec<MalGenericInfo>>,
    pub demographics: Option<Vec<MalGenericInfo>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Images {
    pub jpg: Option<ImageSet>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageSet {
    pub image_url: Option<String>,
    pub large_image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Trailer {
    pub url: Option<String>,
    pub embed_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Aired {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MalGenericInfo {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Broadcast {
    pub string: Option<String>,
}

fn names(list: Option<Vec<MalGenericInfo>>) -> Vec<String> {
    list.unwrap_or_default()
        .into_iter()
        .map(|info| info.name)
        .filter(|name| !name.is_empty())
        .collect()
}

impl MalAnime {
    /// Converts the payload into a provider-agnostic record.
    #[must_use]
    pub fn into_raw(self) -> RawRecord {
        let image_url = self.images.and_then(|i| i.jpg).and_then(|jpg| {
            jpg.large_image_url.or(jpg.image_url)
        });
        let trailer_url = self.trailer.and_then(|t| t.url.or(t.embed_url));
        let (aired_from, aired_to) = self.aired.map_or((None, None), |a| (a.from, a.to));

        RawRecord {
            id: self.mal_id,
            title: self.title.unwrap_or_default(),
            title_native: self.title_japanese,
            synonyms: self.title_synonyms.unwrap_or_default(),
            score: self.score,
            members: self.members,
            popularity: self.popularity,
            studios: names(self.studios),
            producers: names(self.producers),
            licensors: names(self.licensors),
            genres: names(self.genres),
            tags: Vec::new(),
            demographics: names(self.demographics),
            nsfw: false,
            details: RecordDetails {
                title_english: self.title_english,
                image_url,
                trailer_url,
                synopsis: self.synopsis,
                background: self.background,
                episodes: self.episodes,
                scored_by: self.scored_by,
                rank: self.rank,
                favorites: self.favorites,
                format: self.anime_type,
                status: self.status,
                airing: self.airing,
                duration: self.duration,
                rating: self.rating,
                source: self.source,
                themes: names(self.themes),
                aired_from,
                aired_to,
                broadcast: self.broadcast.and_then(|b| b.string),
                url: self.url,
            },
        }
    }
}

#[derive(Clone)]
pub struct JikanClient {
    client: Client,
    base_url: String,
}

impl JikanClient {
    pub fn new(config: &JikanConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_http_client(&config.user_agent, config.request_timeout_seconds)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn season_url(&self, key: SeasonKey, page: u32) -> Result<Url, FetchError> {
        let mut url = Url::parse(&format!(
            "{}/seasons/{}/{}",
            self.base_url, key.year, key.season
        ))?;
        url.query_pairs_mut().append_pair("page", &page.to_string());
        Ok(url)
    }

    /// One page of the season listing. `None` when Jikan has no data for the
    /// season at all.
    pub async fn season_page(
        &self,
        key: SeasonKey,
        page: u32,
    ) -> Result<Option<SeasonPage>, FetchError> {
        let url = self.season_url(key, page)?;
        let response = self.client.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = check_status("Jikan", response).await?;
        Ok(Some(response.json().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Season;

    const PAGE: &str = r#"{
        "pagination": {"last_visible_page": 2, "has_next_page": true},
        "data": [{
            "mal_id": 52991,
            "url": "https://myanimelist.net/anime/52991/Sousou_no_Frieren",
            "images": {"jpg": {"image_url": "small.jpg", "large_image_url": "large.jpg"}},
            "trailer": {"url": null, "embed_url": "https://www.youtube.com/embed/x"},
            "title": "Sousou no Frieren",
            "title_english": "Frieren: Beyond Journey's End",
            "title_japanese": "葬送のフリーレン",
            "title_synonyms": ["Frieren at the Funeral"],
            "type": "TV",
            "source": "Manga",
            "episodes": 28,
            "status": "Finished Airing",
            "airing": false,
            "aired": {"from": "2023-09-29T00:00:00+00:00", "to": "2024-03-22T00:00:00+00:00"},
            "duration": "24 min per ep",
            "rating": "PG-13 - Teens 13 or older",
            "score": 9.31,
            "scored_by": 500000,
            "rank": 1,
            "popularity": 150,
            "members": 1000000,
            "favorites": 60000,
            "synopsis": "An elf mage...",
            "background": null,
            "season": "fall",
            "year": 2023,
            "broadcast": {"day": "Fridays", "string": "Fridays at 23:00 (JST)"},
            "producers": [{"mal_id": 17, "type": "anime", "name": "Aniplex", "url": ""}],
            "licensors": [],
            "studios": [{"mal_id": 11, "type": "anime", "name": "Madhouse", "url": ""}],
            "genres": [{"mal_id": 2, "type": "anime", "name": "Adventure", "url": ""}],
            "themes": [],
            "demographics": [{"mal_id": 27, "type": "anime", "name": "Shounen", "url": ""}]
        }, {
            "mal_id": null,
            "title": "Broken entry",
            "genres": null
        }]
    }"#;

    #[test]
    fn test_season_page_maps_to_raw_records() {
        let page: SeasonPage = serde_json::from_str(PAGE).unwrap();
        assert!(page.pagination.has_next_page);
        assert_eq!(page.data.len(), 2);

        let mut records: Vec<RawRecord> = page.data.into_iter().map(MalAnime::into_raw).collect();
        let broken = records.pop().unwrap();
        let frieren = records.pop().unwrap();

        assert_eq!(frieren.id, Some(52991));
        assert_eq!(frieren.title_native.as_deref(), Some("葬送のフリーレン"));
        assert_eq!(frieren.studios, vec!["Madhouse".to_string()]);
        assert_eq!(frieren.producers, vec!["Aniplex".to_string()]);
        assert_eq!(frieren.genres, vec!["Adventure".to_string()]);
        assert_eq!(frieren.details.format.as_deref(), Some("TV"));
        assert_eq!(frieren.details.image_url.as_deref(), Some("large.jpg"));
        assert_eq!(
            frieren.details.trailer_url.as_deref(),
            Some("https://www.youtube.com/embed/x")
        );
        assert_eq!(
            frieren.details.broadcast.as_deref(),
            Some("Fridays at 23:00 (JST)")
        );

        assert_eq!(broken.id, None);
        assert!(broken.genres.is_empty());
    }

    #[test]
    fn test_season_url() {
        let client = JikanClient::new(&JikanConfig {
            base_url: "https://api.jikan.moe/v4/".to_string(),
            ..JikanConfig::default()
        })
        .unwrap();

        let url = client
            .season_url(SeasonKey::new(2024, Season::Spring), 3)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.jikan.moe/v4/seasons/2024/spring?page=3"
        );
    }
}
