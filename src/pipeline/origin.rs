//! Origin classification: is a title Japanese-produced, and is it flagged
//! as explicit or children's content.
//!
//! Two independent policies decide `is_japanese`. They were tuned for
//! different providers and their precedence rules differ, so they are kept
//! as separate strategies behind [`OriginPolicy`] instead of one configurable
//! function.

use serde::{Deserialize, Serialize};

use super::tables::HeuristicTables;

/// Classifier input borrowed from a raw record.
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginInput<'a> {
    pub studios: &'a [String],
    pub producers: &'a [String],
    pub title_native: Option<&'a str>,
    pub genres: &'a [String],
    pub tag_names: &'a [&'a str],
    pub demographics: &'a [String],
    pub nsfw: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Origin {
    pub is_japanese: bool,
    pub is_adult: bool,
    pub is_kid: bool,
}

pub trait OriginPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_japanese(&self, tables: &HeuristicTables, input: &OriginInput<'_>) -> bool;

    /// Whether batches classified by this policy go through the quality
    /// threshold filter afterwards.
    fn filters_suspects(&self) -> bool;
}

/// Japanese unless a Korean or Chinese producer is credited. A known Japanese
/// studio overrides any producer match.
#[derive(Debug, Clone, Copy, Default)]
pub struct StudioAllowList;

impl OriginPolicy for StudioAllowList {
    fn name(&self) -> &'static str {
        "studio_allow_list"
    }

    fn is_japanese(&self, tables: &HeuristicTables, input: &OriginInput<'_>) -> bool {
        if has_japanese_studio(tables, input.studios) {
            return true;
        }
        !has_foreign_producer(tables, input.producers)
    }

    fn filters_suspects(&self) -> bool {
        false
    }
}

/// Japanese only with positive evidence: a known Japanese studio, or kana in
/// the native title.
#[derive(Debug, Clone, Copy, Default)]
pub struct KanaDetection;

impl OriginPolicy for KanaDetection {
    fn name(&self) -> &'static str {
        "kana_detection"
    }

    fn is_japanese(&self, tables: &HeuristicTables, input: &OriginInput<'_>) -> bool {
        has_japanese_studio(tables, input.studios) || input.title_native.is_some_and(contains_kana)
    }

    fn filters_suspects(&self) -> bool {
        true
    }
}

/// Configuration name of an origin policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginPolicyKind {
    StudioAllowList,
    KanaDetection,
}

impl OriginPolicyKind {
    #[must_use]
    pub fn strategy(self) -> &'static dyn OriginPolicy {
        match self {
            Self::StudioAllowList => &StudioAllowList,
            Self::KanaDetection => &KanaDetection,
        }
    }
}

/// Runs `policy` and derives the content flags from the tag lists.
#[must_use]
pub fn classify(
    policy: &dyn OriginPolicy,
    tables: &HeuristicTables,
    input: &OriginInput<'_>,
) -> Origin {
    let tagged = |wanted: &[String]| {
        wanted.iter().any(|tag| {
            input.genres.iter().any(|g| g == tag)
                || input.tag_names.iter().any(|t| t == tag)
                || input.demographics.iter().any(|d| d == tag)
        })
    };

    Origin {
        is_japanese: policy.is_japanese(tables, input),
        is_adult: input.nsfw || tagged(&tables.adult_tags),
        is_kid: tagged(&tables.kid_tags),
    }
}

#[must_use]
pub fn has_japanese_studio(tables: &HeuristicTables, studios: &[String]) -> bool {
    studios.iter().any(|studio| {
        let studio = studio.to_lowercase();
        tables
            .japanese_studios
            .iter()
            .any(|known| studio.contains(&known.to_lowercase()))
    })
}

#[must_use]
pub fn has_foreign_producer(tables: &HeuristicTables, producers: &[String]) -> bool {
    producers.iter().any(|producer| {
        let producer = producer.to_lowercase();
        tables
            .foreign_indicators()
            .any(|indicator| producer.contains(&indicator.to_lowercase()))
    })
}

/// True if `text` contains at least one Hiragana or Katakana character.
#[must_use]
pub fn contains_kana(text: &str) -> bool {
    text.chars()
        .any(|c| matches!(c, '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}'))
}
