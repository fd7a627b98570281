//! Drives a multi-season fetch: source, pipeline, store and manifest, one unit
//! at a time.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use super::season_source::SeasonSource;
use crate::domain::{Season, SeasonKey};
use crate::pipeline::{self, PipelineConfig};
use crate::store::{Manifest, ManifestEntry, PersistOutcome, SeasonStore, StoreError};

/// Which years a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YearSelection {
    /// `start_year` through next year.
    All,
    /// This year and the next one.
    Current,
    Specific(Vec<i32>),
}

/// The units a run will visit, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub years: Vec<i32>,
    pub seasons: Vec<Season>,
}

impl FetchPlan {
    #[must_use]
    pub fn new(
        selection: &YearSelection,
        season: Option<Season>,
        start_year: i32,
        current_year: i32,
    ) -> Self {
        let mut years: Vec<i32> = match selection {
            YearSelection::All => (start_year..=current_year + 1).collect(),
            YearSelection::Current => vec![current_year, current_year + 1],
            YearSelection::Specific(years) => years.clone(),
        };
        years.sort_unstable();
        years.dedup();

        let seasons = season.map_or_else(|| Season::ALL.to_vec(), |s| vec![s]);

        Self { years, seasons }
    }

    pub fn units(&self) -> impl Iterator<Item = SeasonKey> + '_ {
        self.years.iter().flat_map(move |&year| {
            self.seasons
                .iter()
                .map(move |&season| SeasonKey::new(year, season))
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.years.len() * self.seasons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Persisted(usize),
    /// Nothing usable was fetched; the stored batch of this size was kept.
    Preserved(usize),
    /// Nothing fetched and nothing stored.
    Empty,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub key: SeasonKey,
    pub outcome: UnitOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub units: Vec<UnitReport>,
    pub manifest: Manifest,
}

impl RunSummary {
    #[must_use]
    pub fn persisted(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Persisted(_)))
    }

    #[must_use]
    pub fn preserved(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Preserved(_)))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&UnitOutcome) -> bool) -> usize {
        self.units.iter().filter(|u| pred(&u.outcome)).count()
    }
}

pub struct FetchService {
    source: Arc<dyn SeasonSource>,
    store: SeasonStore,
    pipeline: PipelineConfig,
    unit_delay: Duration,
}

impl FetchService {
    #[must_use]
    pub fn new(
        source: Arc<dyn SeasonSource>,
        store: SeasonStore,
        pipeline: PipelineConfig,
        unit_delay: Duration,
    ) -> Self {
        Self {
            source,
            store,
            pipeline,
            unit_delay,
        }
    }

    /// Runs every unit of `plan`.
    ///
    /// Unit failures are logged and recorded in the summary; only a failure to
    /// read or write the manifest itself aborts the run.
    pub async fn run(&self, plan: &FetchPlan) -> Result<RunSummary, StoreError> {
        let mut manifest = self.store.load_manifest().await?;
        let mut units = Vec::with_capacity(plan.len());

        info!(
            provider = %self.source.provider(),
            units = plan.len(),
            root = %self.store.root().display(),
            "Starting fetch run"
        );

        for (index, key) in plan.units().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.unit_delay).await;
            }

            let outcome = self.run_unit(key, &mut manifest).await;
            units.push(UnitReport { key, outcome });

            if let Err(e) = self.store.save_manifest(&manifest).await {
                warn!(error = %e, "Failed to save manifest after {key}");
            }
        }

        self.store.save_manifest(&manifest).await?;

        Ok(RunSummary { units, manifest })
    }

    async fn run_unit(&self, key: SeasonKey, manifest: &mut Manifest) -> UnitOutcome {
        let raw = match self.source.fetch_season(key).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(
                    event = "unit_failed",
                    provider = %self.source.provider(),
                    unit = %key,
                    error = %e,
                    "Failed to fetch {key}"
                );
                self.keep_stored(key, manifest).await;
                return UnitOutcome::Failed(e.to_string());
            }
        };

        let batch = pipeline::process_batch(raw, key, &self.pipeline);

        match self.store.persist(key, &batch.records).await {
            Ok(PersistOutcome::Written(count)) => {
                info!(
                    event = "unit_persisted",
                    unit = %key,
                    fetched = batch.fetched,
                    count,
                    "Saved {count} entries for {key}"
                );
                metrics::counter!("units_persisted_total").increment(1);
                manifest.upsert(ManifestEntry::new(key, count));
                UnitOutcome::Persisted(count)
            }
            Ok(PersistOutcome::Preserved(count)) => {
                warn!(
                    event = "unit_preserved",
                    unit = %key,
                    count,
                    "No new data for {key}, keeping {count} stored entries"
                );
                manifest.upsert(ManifestEntry::new(key, count));
                UnitOutcome::Preserved(count)
            }
            Ok(PersistOutcome::Empty) => {
                info!(unit = %key, "No data for {key}");
                manifest.remove(key);
                UnitOutcome::Empty
            }
            Err(e) => {
                error!(event = "unit_failed", unit = %key, error = %e, "Failed to store {key}");
                UnitOutcome::Failed(e.to_string())
            }
        }
    }

    /// Re-derives the manifest entry of a failed unit from the stored file.
    async fn keep_stored(&self, key: SeasonKey, manifest: &mut Manifest) {
        match self.store.load_unit(key).await {
            Ok(Some(records)) if !records.is_empty() => {
                manifest.upsert(ManifestEntry::new(key, records.len()));
            }
            Ok(_) => {}
            Err(e) => warn!(unit = %key, error = %e, "Stored data for {key} is unreadable"),
        }
    }
}
