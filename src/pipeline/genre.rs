//! Maps free-text community tags onto the canonical genre vocabulary.

use std::collections::BTreeSet;

use super::tables::GenreTables;
use crate::models::RawTag;

const MONTH_GLYPH: char = '月';
const YEAR_GLYPH: char = '年';

pub struct GenreNormalizer<'t> {
    tables: &'t GenreTables,
}

impl<'t> GenreNormalizer<'t> {
    #[must_use]
    pub const fn new(tables: &'t GenreTables) -> Self {
        Self { tables }
    }

    /// Canonical genres for `tags`, deduplicated and sorted.
    ///
    /// Unused tags, non-genre tags and tags missing from the vocabulary are
    /// dropped.
    #[must_use]
    pub fn normalize(&self, tags: &[RawTag]) -> Vec<String> {
        tags.iter()
            .filter(|tag| tag.count > 0 && !self.is_excluded(&tag.name))
            .filter_map(|tag| self.tables.vocabulary.get(&tag.name))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    #[must_use]
    pub fn is_excluded(&self, tag: &str) -> bool {
        self.tables.excluded_tags.iter().any(|t| t == tag) || is_date_like(tag)
    }
}

/// Year, year range, month and year labels.
fn is_date_like(tag: &str) -> bool {
    // full-width digits count as well
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(char::is_numeric);
    let has_digit = tag.chars().any(char::is_numeric);

    if tag.chars().count() == 4 && all_digits(tag) {
        return true;
    }

    if let Some((from, to)) = tag.split_once('-')
        && all_digits(from)
        && all_digits(to)
    {
        return true;
    }

    if tag.contains(MONTH_GLYPH) && has_digit {
        return true;
    }

    tag.ends_with(YEAR_GLYPH) && has_digit
}
