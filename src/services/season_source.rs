//! Fetch collaborators: one implementation per provider, each returning the
//! raw records of a single (year, season) unit.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::clients::jikan::MalAnime;
use crate::clients::{BangumiClient, FetchError, JikanClient};
use crate::config::{BangumiConfig, JikanConfig};
use crate::domain::{Provider, SeasonKey};
use crate::models::RawRecord;

/// Upper bound on browser pages walked per month.
const MAX_BROWSER_PAGES: u32 = 100;

#[async_trait]
pub trait SeasonSource: Send + Sync {
    fn provider(&self) -> Provider;

    /// All raw records the provider lists for `key`.
    ///
    /// An empty vector means the provider has nothing for the unit; an error
    /// means the unit could not be fetched and stored data must be kept.
    async fn fetch_season(&self, key: SeasonKey) -> Result<Vec<RawRecord>, FetchError>;
}

pub struct JikanSeasonSource {
    client: JikanClient,
    page_delay: Duration,
}

impl JikanSeasonSource {
    pub fn new(config: &JikanConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: JikanClient::new(config)?,
            page_delay: Duration::from_millis(config.page_delay_ms),
        })
    }
}

#[async_trait]
impl SeasonSource for JikanSeasonSource {
    fn provider(&self) -> Provider {
        Provider::Jikan
    }

    async fn fetch_season(&self, key: SeasonKey) -> Result<Vec<RawRecord>, FetchError> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let Some(result) = self.client.season_page(key, page).await? else {
                info!(unit = %key, "Jikan has no data for {key}");
                break;
            };

            let count = result.data.len();
            debug!(unit = %key, page, count, "Fetched season page");
            records.extend(result.data.into_iter().map(MalAnime::into_raw));

            tokio::time::sleep(self.page_delay).await;

            if !result.pagination.has_next_page || count == 0 {
                break;
            }
            page += 1;
        }

        Ok(records)
    }
}

pub struct BangumiSeasonSource {
    client: BangumiClient,
    page_delay: Duration,
    detail_delay: Duration,
}

impl BangumiSeasonSource {
    pub fn new(config: &BangumiConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: BangumiClient::new(config)?,
            page_delay: Duration::from_millis(config.page_delay_ms),
            detail_delay: Duration::from_millis(config.detail_delay_ms),
        })
    }

    /// Subject ids listed for the three months of the season, in discovery
    /// order. Listing failures end the current month early.
    async fn collect_subject_ids(&self, key: SeasonKey) -> Vec<i64> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();

        for month in key.season.months() {
            for page in 1..=MAX_BROWSER_PAGES {
                let page_ids = match self.client.subject_ids(key.year, month, page).await {
                    Ok(page_ids) => page_ids,
                    Err(e) => {
                        warn!(unit = %key, month, page, error = %e, "Browser listing failed");
                        break;
                    }
                };

                let before = ids.len();
                ids.extend(page_ids.into_iter().filter(|id| seen.insert(*id)));
                debug!(unit = %key, month, page, new = ids.len() - before, "Scanned browser page");

                tokio::time::sleep(self.page_delay).await;

                if ids.len() == before {
                    break;
                }
            }
        }

        ids
    }
}

#[async_trait]
impl SeasonSource for BangumiSeasonSource {
    fn provider(&self) -> Provider {
        Provider::Bangumi
    }

    async fn fetch_season(&self, key: SeasonKey) -> Result<Vec<RawRecord>, FetchError> {
        let ids = self.collect_subject_ids(key).await;
        info!(unit = %key, subjects = ids.len(), "Found {} subjects for {key}", ids.len());

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.client.get_subject(id).await {
                Ok(Some(subject)) => records.push(subject.into_raw(self.client.site_url())),
                Ok(None) => warn!(subject = id, "Subject not found, skipping"),
                Err(e) => warn!(subject = id, error = %e, "Failed to fetch subject, skipping"),
            }
            tokio::time::sleep(self.detail_delay).await;
        }

        Ok(records)
    }
}
