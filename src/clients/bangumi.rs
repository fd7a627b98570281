use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;
use url::Url;

use super::{FetchError, build_http_client, check_status};
use crate::config::BangumiConfig;
use crate::models::{RawRecord, RawTag, RecordDetails};

/// Path of the browser listing filtered to Japanese TV productions.
const BROWSER_PATH: &str = "anime/browser/%E6%97%A5%E6%9C%AC/tv/airtime";

const STUDIO_KEYS: [&str; 2] = ["动画制作", "制作"];
const SOURCE_KEYS: [&str; 1] = ["原作"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Subject {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub name_cn: Option<String>,
    pub summary: Option<String>,
    pub date: Option<String>,
    pub platform: Option<String>,
    pub eps: Option<i32>,
    pub nsfw: bool,
    pub images: Option<SubjectImages>,
    pub rating: Option<Rating>,
    pub collection: Option<BTreeMap<String, i64>>,
    pub infobox: Option<Vec<InfoboxItem>>,
    pub tags: Option<Vec<RawTag>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubjectImages {
    pub large: Option<String>,
    pub common: Option<String>,
    pub medium: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Rating {
    pub score: Option<f64>,
    pub total: Option<i64>,
    pub rank: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct InfoboxItem {
    pub key: String,
    #[serde(default)]
    pub value: Option<InfoboxValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InfoboxValue {
    Text(String),
    List(Vec<InfoboxEntry>),
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
pub struct InfoboxEntry {
    #[serde(default)]
    pub v: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl Subject {
    /// All infobox values listed under any of `keys`, in document order.
    #[must_use]
    pub fn infobox_values(&self, keys: &[&str]) -> Vec<String> {
        let mut values = Vec::new();
        for item in self.infobox.iter().flatten() {
            if !keys.contains(&item.key.as_str()) {
                continue;
            }
            match &item.value {
                Some(InfoboxValue::Text(text)) if !text.is_empty() => values.push(text.clone()),
                Some(InfoboxValue::List(entries)) => {
                    values.extend(entries.iter().filter_map(|e| e.v.clone()));
                }
                _ => {}
            }
        }
        values
    }

    /// Sum of every collection bucket, used as the member count.
    #[must_use]
    pub fn collection_total(&self) -> i64 {
        self.collection.iter().flat_map(|c| c.values()).sum()
    }

    #[must_use]
    pub fn into_raw(self, site_url: &str) -> RawRecord {
        let studios = self.infobox_values(&STUDIO_KEYS);
        let source = self.infobox_values(&SOURCE_KEYS);
        let members = self.collection_total();

        let rating = self.rating.unwrap_or_default();
        let image_url = self
            .images
            .and_then(|i| non_empty(i.large).or(non_empty(i.common)).or(non_empty(i.medium)));
        let native = non_empty(self.name);
        let title = non_empty(self.name_cn)
            .or_else(|| native.clone())
            .unwrap_or_default();

        RawRecord {
            id: self.id,
            title,
            title_native: native,
            synonyms: Vec::new(),
            score: rating.score.filter(|s| *s > 0.0),
            members: Some(members),
            popularity: None,
            studios,
            producers: Vec::new(),
            licensors: Vec::new(),
            genres: Vec::new(),
            tags: self.tags.unwrap_or_default(),
            demographics: Vec::new(),
            nsfw: self.nsfw,
            details: RecordDetails {
                synopsis: non_empty(self.summary),
                image_url,
                episodes: self.eps,
                scored_by: rating.total,
                rank: rating.rank.filter(|r| *r > 0),
                format: non_empty(self.platform),
                source: (!source.is_empty()).then(|| source.join(", ")),
                aired_from: non_empty(self.date),
                url: self.id.map(|id| format!("{site_url}/subject/{id}")),
                ..RecordDetails::default()
            },
        }
    }
}

/// Subject ids listed on a browser page, deduplicated in page order.
#[must_use]
pub fn extract_subject_ids(html: &str) -> Vec<i64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r#"<li[^>]*\bid="item_(\d+)""#).expect("Invalid regex"));

    let mut seen = HashSet::new();
    re.captures_iter(html)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<i64>().ok())
        .filter(|id| seen.insert(*id))
        .collect()
}

#[derive(Clone)]
pub struct BangumiClient {
    client: Client,
    api_base_url: String,
    browser_base_url: String,
}

impl BangumiClient {
    pub fn new(config: &BangumiConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_http_client(&config.user_agent, config.request_timeout_seconds)?,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            browser_base_url: config.browser_base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn site_url(&self) -> &str {
        &self.browser_base_url
    }

    fn browser_url(&self, year: i32, month: u32, page: u32) -> Result<Url, FetchError> {
        let mut url = Url::parse(&format!(
            "{}/{BROWSER_PATH}/{year}-{month}",
            self.browser_base_url
        ))?;
        url.query_pairs_mut().append_pair("page", &page.to_string());
        Ok(url)
    }

    /// Subject ids on one page of the monthly browser listing.
    pub async fn subject_ids(&self, year: i32, month: u32, page: u32) -> Result<Vec<i64>, FetchError> {
        let url = self.browser_url(year, month, page)?;
        let response = self.client.get(url).send().await?;
        let response = check_status("Bangumi", response).await?;
        let html = response.text().await?;
        Ok(extract_subject_ids(&html))
    }

    pub async fn get_subject(&self, id: i64) -> Result<Option<Subject>, FetchError> {
        let url = Url::parse(&format!("{}/v0/subjects/{id}", self.api_base_url))?;
        let response = self.client.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = check_status("Bangumi", response).await?;
        Ok(Some(response.json().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBJECT: &str = r#"{
        "id": 400602,
        "name": "葬送のフリーレン",
        "name_cn": "葬送的芙莉莲",
        "summary": "勇者一行...",
        "date": "2023-09-29",
        "platform": "TV",
        "eps": 28,
        "nsfw": false,
        "images": {"large": "", "common": "common.jpg", "medium": "medium.jpg"},
        "rating": {"rank": 0, "total": 30000, "score": 8.9},
        "collection": {"wish": 100, "collect": 2000, "doing": 300, "on_hold": 40, "dropped": 5},
        "infobox": [
            {"key": "中文名", "value": "葬送的芙莉莲"},
            {"key": "别名", "value": [{"v": "Frieren"}, {"v": "芙莉莲"}]},
            {"key": "原作", "value": "山田鐘人・アベツカサ"},
            {"key": "动画制作", "value": "MADHOUSE"}
        ],
        "tags": [{"name": "奇幻", "count": 900, "total_cont": 0}, {"name": "2023年10月", "count": 300}]
    }"#;

    #[test]
    fn test_subject_maps_to_raw_record() {
        let subject: Subject = serde_json::from_str(SUBJECT).unwrap();
        let raw = subject.into_raw("https://bgm.tv");

        assert_eq!(raw.id, Some(400_602));
        assert_eq!(raw.title, "葬送的芙莉莲");
        assert_eq!(raw.title_native.as_deref(), Some("葬送のフリーレン"));
        assert_eq!(raw.score, Some(8.9));
        assert_eq!(raw.members, Some(2445));
        assert_eq!(raw.studios, vec!["MADHOUSE".to_string()]);
        assert_eq!(raw.tags.len(), 2);
        assert_eq!(raw.details.source.as_deref(), Some("山田鐘人・アベツカサ"));
        assert_eq!(raw.details.image_url.as_deref(), Some("common.jpg"));
        assert_eq!(raw.details.rank, None);
        assert_eq!(raw.details.scored_by, Some(30000));
        assert_eq!(raw.details.aired_from.as_deref(), Some("2023-09-29"));
        assert_eq!(raw.details.url.as_deref(), Some("https://bgm.tv/subject/400602"));
        assert!(!raw.nsfw);
    }

    #[test]
    fn test_sparse_subject() {
        let subject: Subject =
            serde_json::from_str(r#"{"id": 1, "name": "", "name_cn": "", "rating": {"score": 0}}"#)
                .unwrap();
        let raw = subject.into_raw("https://bgm.tv");

        assert_eq!(raw.title, "");
        assert_eq!(raw.title_native, None);
        assert_eq!(raw.score, None);
        assert_eq!(raw.members, Some(0));
        assert!(raw.studios.is_empty());
    }

    #[test]
    fn test_title_falls_back_to_original_name() {
        let subject: Subject =
            serde_json::from_str(r#"{"id": 2, "name": "けいおん!", "name_cn": ""}"#).unwrap();
        assert_eq!(subject.into_raw("https://bgm.tv").title, "けいおん!");
    }

    #[test]
    fn test_infobox_list_values() {
        let subject: Subject = serde_json::from_str(
            r#"{"infobox": [
                {"key": "制作", "value": [{"k": "main", "v": "Studio A"}, {"v": "Studio B"}]},
                {"key": "动画制作", "value": "Studio C"},
                {"key": "其他", "value": {"unexpected": true}}
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            subject.infobox_values(&STUDIO_KEYS),
            vec!["Studio A".to_string(), "Studio B".to_string(), "Studio C".to_string()]
        );
    }

    #[test]
    fn test_extract_subject_ids() {
        let html = r#"
            <ul id="browserItemList">
              <li id="item_400602" class="item odd clearit"><a href="/subject/400602">x</a></li>
              <li id="item_12" class="item even clearit"></li>
              <li class="item" id="item_400602"></li>
              <div id="item_999"></div>
            </ul>"#;

        assert_eq!(extract_subject_ids(html), vec![400_602, 12]);
        assert!(extract_subject_ids("<ul></ul>").is_empty());
    }

    #[test]
    fn test_browser_url_keeps_encoded_segment() {
        let client = BangumiClient::new(&BangumiConfig::default()).unwrap();
        let url = client.browser_url(2024, 4, 2).unwrap();
        assert_eq!(
            url.as_str(),
            "https://bgm.tv/anime/browser/%E6%97%A5%E6%9C%AC/tv/airtime/2024-4?page=2"
        );
    }
}
