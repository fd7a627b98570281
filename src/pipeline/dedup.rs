//! Identity deduplication of a batch.

use std::collections::HashSet;
use tracing::{info, warn};

use crate::domain::SeasonKey;
use crate::models::{RawRecord, Record};

/// Number of dropped duplicates echoed in a report.
pub const SAMPLE_LIMIT: usize = 5;

/// Anything carrying a provider-assigned identifier.
pub trait Identified {
    fn record_id(&self) -> Option<i64>;

    fn display_title(&self) -> &str;
}

impl Identified for RawRecord {
    fn record_id(&self) -> Option<i64> {
        self.id
    }

    fn display_title(&self) -> &str {
        &self.title
    }
}

impl Identified for Record {
    fn record_id(&self) -> Option<i64> {
        Some(self.id)
    }

    fn display_title(&self) -> &str {
        &self.title
    }
}

/// Outcome of one deduplication pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupReport {
    pub kept: usize,
    pub missing_id: usize,
    pub duplicates: usize,
    /// First [`SAMPLE_LIMIT`] dropped `(id, title)` pairs.
    pub sample: Vec<(i64, String)>,
}

impl DedupReport {
    #[must_use]
    pub const fn removed(&self) -> usize {
        self.missing_id + self.duplicates
    }

    /// Emits the report as structured log events.
    pub fn log(&self, key: SeasonKey) {
        if self.duplicates == 0 {
            info!(
                event = "dedup_report",
                unit = %key,
                kept = self.kept,
                "No duplicates found for {key} - {} unique entries",
                self.kept
            );
            return;
        }

        info!(
            event = "dedup_report",
            unit = %key,
            kept = self.kept,
            duplicates = self.duplicates,
            "Found and removed {} duplicate(s) for {key}",
            self.duplicates
        );
        for (id, title) in &self.sample {
            info!(unit = %key, id = *id, "  - {title} (ID: {id})");
        }
        if self.duplicates > self.sample.len() {
            info!(
                unit = %key,
                "  ... and {} more",
                self.duplicates - self.sample.len()
            );
        }
    }
}

/// Keeps the first record for each identifier, in input order.
///
/// Records without an identifier are dropped with a warning. Neither case is
/// an error: the batch always continues.
pub fn deduplicate<T: Identified>(records: Vec<T>) -> (Vec<T>, DedupReport) {
    let mut seen = HashSet::with_capacity(records.len());
    let mut unique = Vec::with_capacity(records.len());
    let mut report = DedupReport::default();

    for record in records {
        let Some(id) = record.record_id() else {
            warn!(
                title = record.display_title(),
                "Entry without an identifier skipped: {}",
                record.display_title()
            );
            report.missing_id += 1;
            continue;
        };

        if seen.insert(id) {
            unique.push(record);
        } else {
            report.duplicates += 1;
            if report.sample.len() < SAMPLE_LIMIT {
                report.sample.push((id, record.display_title().to_string()));
            }
        }
    }

    report.kept = unique.len();
    metrics::counter!("dedup_removed_total")
        .increment(u64::try_from(report.removed()).unwrap_or(u64::MAX));

    (unique, report)
}
