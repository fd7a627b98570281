//! Normalization and quality-filtering pipeline for one (year, season) batch.
//!
//! Stages, in order:
//! 1. identity deduplication of the raw batch
//! 2. broadcast format filter
//! 3. origin classification, plus tag normalization where configured
//! 4. quality threshold filter (kana-detection policy only)
//! 5. a final deduplication pass before persistence
//!
//! The pipeline is synchronous and performs no I/O; everything it needs is
//! passed in through [`PipelineConfig`].

pub mod dedup;
pub mod genre;
pub mod origin;
pub mod tables;
pub mod threshold;

use tracing::debug;

use crate::domain::SeasonKey;
use crate::models::{RawRecord, Record};
pub use dedup::{DedupReport, Identified, deduplicate};
pub use genre::GenreNormalizer;
pub use origin::{KanaDetection, OriginInput, OriginPolicy, OriginPolicyKind, StudioAllowList};
pub use tables::{GenreTables, HeuristicTables};
pub use threshold::{FilterReport, Thresholds};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub policy: OriginPolicyKind,

    /// Derive genres from free-text tags instead of provider genres.
    pub normalize_tags: bool,

    /// Accepted values of the provider `type` field; empty accepts all.
    pub allowed_formats: Vec<String>,

    pub heuristics: HeuristicTables,

    pub genres: GenreTables,
}

impl PipelineConfig {
    fn accepts_format(&self, format: Option<&str>) -> bool {
        if self.allowed_formats.is_empty() {
            return true;
        }
        format.is_some_and(|f| self.allowed_formats.iter().any(|a| a.eq_ignore_ascii_case(f)))
    }
}

/// Everything that happened to a batch, for reporting.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub records: Vec<Record>,
    pub fetched: usize,
    pub first_pass: DedupReport,
    pub format_skipped: usize,
    pub filter: Option<FilterReport>,
    pub final_pass: DedupReport,
}

/// Runs every stage on `raw` and returns records ready to persist.
#[must_use]
pub fn process_batch(raw: Vec<RawRecord>, key: SeasonKey, config: &PipelineConfig) -> BatchOutcome {
    let fetched = raw.len();
    let (unique, first_pass) = deduplicate(raw);
    first_pass.log(key);

    let before_format = unique.len();
    let candidates: Vec<RawRecord> = unique
        .into_iter()
        .filter(|r| config.accepts_format(r.details.format.as_deref()))
        .collect();
    let format_skipped = before_format - candidates.len();
    if format_skipped > 0 {
        debug!(unit = %key, skipped = format_skipped, "Skipped entries with other formats");
    }

    let policy = config.policy.strategy();
    debug!(unit = %key, policy = policy.name(), candidates = candidates.len(), "Classifying origin");
    let normalizer = GenreNormalizer::new(&config.genres);
    let classified: Vec<Record> = candidates
        .into_iter()
        .filter_map(|r| to_record(r, key, policy, &normalizer, config))
        .collect();

    let (filtered, filter) = if policy.filters_suspects() {
        let (kept, report) = threshold::apply(classified);
        report.log(key);
        (kept, Some(report))
    } else {
        (classified, None)
    };

    let (records, final_pass) = deduplicate(filtered);
    if final_pass.removed() > 0 {
        final_pass.log(key);
    }

    BatchOutcome {
        records,
        fetched,
        first_pass,
        format_skipped,
        filter,
        final_pass,
    }
}

fn to_record(
    raw: RawRecord,
    key: SeasonKey,
    policy: &dyn OriginPolicy,
    normalizer: &GenreNormalizer<'_>,
    config: &PipelineConfig,
) -> Option<Record> {
    let id = raw.id?;

    let tag_names: Vec<&str> = raw.tags.iter().map(|t| t.name.as_str()).collect();
    let origin = origin::classify(
        policy,
        &config.heuristics,
        &OriginInput {
            studios: &raw.studios,
            producers: &raw.producers,
            title_native: raw.title_native.as_deref(),
            genres: &raw.genres,
            tag_names: &tag_names,
            demographics: &raw.demographics,
            nsfw: raw.nsfw,
        },
    );

    let genres = if config.normalize_tags {
        normalizer.normalize(&raw.tags)
    } else {
        raw.genres
    };

    Some(Record {
        id,
        title: raw.title,
        title_native: raw.title_native,
        synonyms: raw.synonyms,
        score: raw.score,
        members: raw.members,
        popularity: raw.popularity,
        genres,
        studios: raw.studios,
        producers: raw.producers,
        licensors: raw.licensors,
        demographics: raw.demographics,
        year: key.year,
        season: key.season,
        is_japanese: origin.is_japanese,
        is_adult: origin.is_adult,
        is_kid: origin.is_kid,
        details: raw.details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Season;
    use crate::models::{RawTag, RecordDetails};

    fn jikan_config() -> PipelineConfig {
        PipelineConfig {
            policy: OriginPolicyKind::StudioAllowList,
            normalize_tags: false,
            allowed_formats: vec!["TV".to_string()],
            heuristics: HeuristicTables::default(),
            genres: GenreTables::default(),
        }
    }

    fn raw(id: i64, format: &str) -> RawRecord {
        RawRecord {
            id: Some(id),
            title: format!("show {id}"),
            details: RecordDetails {
                format: Some(format.to_string()),
                ..RecordDetails::default()
            },
            ..RawRecord::default()
        }
    }

    #[test]
    fn test_assigns_unit_and_filters_formats() {
        let key = SeasonKey::new(2022, Season::Summer);
        let batch = vec![raw(1, "TV"), raw(2, "Movie"), raw(3, "tv"), raw(1, "TV")];

        let outcome = process_batch(batch, key, &jikan_config());

        let ids: Vec<i64> = outcome.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(outcome.fetched, 4);
        assert_eq!(outcome.first_pass.duplicates, 1);
        assert_eq!(outcome.format_skipped, 1);
        assert!(outcome.filter.is_none());
        assert!(outcome.records.iter().all(|r| r.key() == key));
    }

    #[test]
    fn test_tag_normalization_path() {
        let config = PipelineConfig {
            policy: OriginPolicyKind::KanaDetection,
            normalize_tags: true,
            allowed_formats: vec![],
            ..jikan_config()
        };
        let record = RawRecord {
            id: Some(10),
            title: "Title".to_string(),
            title_native: Some("けいおん!".to_string()),
            tags: vec![RawTag::new("音乐", 30), RawTag::new("日本", 90), RawTag::new("偶像", 2)],
            ..RawRecord::default()
        };

        let outcome = process_batch(vec![record], SeasonKey::new(2009, Season::Spring), &config);

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].genres, vec!["音乐".to_string()]);
        assert!(outcome.records[0].is_japanese);
        assert!(outcome.filter.is_some());
    }
}
