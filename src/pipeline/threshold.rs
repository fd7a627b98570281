//! Quality threshold filter for ambiguous entries.
//!
//! The reference statistics come from the trusted part of the batch
//! (Japanese, not for children). Everything else must reach either the
//! popularity median or the mean score minus one point to be kept.

use tracing::info;

use crate::domain::SeasonKey;
use crate::models::Record;

/// Margin below the reference mean score that suspects may still reach.
pub const SCORE_MARGIN: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Thresholds {
    pub score: f64,
    pub members: i64,
}

impl Thresholds {
    /// Computes the thresholds from `reference`.
    ///
    /// Both default to 0 when the reference set carries no data for them.
    /// The member threshold is the lower median: element `n / 2` of the
    /// sorted counts.
    pub fn from_reference<'a>(reference: impl IntoIterator<Item = &'a Record>) -> Self {
        let mut scores = Vec::new();
        let mut members = Vec::new();

        for record in reference {
            if let Some(score) = record.rated_score() {
                scores.push(score);
            }
            if let Some(count) = record.members {
                members.push(count);
            }
        }

        let score = if scores.is_empty() {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            mean - SCORE_MARGIN
        };

        members.sort_unstable();
        let members = members.get(members.len() / 2).copied().unwrap_or(0);

        Self { score, members }
    }

    /// Missing values count as 0 for this comparison only.
    #[must_use]
    pub fn admits(&self, record: &Record) -> bool {
        record.members.unwrap_or(0) >= self.members || record.score.unwrap_or(0.0) >= self.score
    }
}

#[must_use]
pub const fn is_core(record: &Record) -> bool {
    record.is_japanese && !record.is_kid
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterReport {
    pub thresholds: Thresholds,
    pub core: usize,
    pub suspects: usize,
    pub dropped: usize,
    /// True when the batch had no core record and the whole batch served as
    /// the reference set.
    pub used_fallback: bool,
}

/// Applies the filter; core records always pass and relative order is kept.
pub fn apply(records: Vec<Record>) -> (Vec<Record>, FilterReport) {
    let core_count = records.iter().filter(|r| is_core(r)).count();
    let used_fallback = core_count == 0;

    let thresholds = if used_fallback {
        Thresholds::from_reference(&records)
    } else {
        Thresholds::from_reference(records.iter().filter(|r| is_core(r)))
    };

    let mut report = FilterReport {
        thresholds,
        core: core_count,
        suspects: records.len() - core_count,
        dropped: 0,
        used_fallback,
    };

    let kept: Vec<Record> = records
        .into_iter()
        .filter(|record| {
            let keep = is_core(record) || thresholds.admits(record);
            if !keep {
                report.dropped += 1;
            }
            keep
        })
        .collect();

    metrics::counter!("quality_filter_dropped_total")
        .increment(u64::try_from(report.dropped).unwrap_or(u64::MAX));

    (kept, report)
}

impl FilterReport {
    pub fn log(&self, key: SeasonKey) {
        info!(
            event = "quality_filter_applied",
            unit = %key,
            core = self.core,
            suspects = self.suspects,
            dropped = self.dropped,
            score_threshold = self.thresholds.score,
            member_threshold = self.thresholds.members,
            fallback = self.used_fallback,
            "Filtered {} suspect entr(ies) for {key} (score >= {:.2} or members >= {})",
            self.dropped,
            self.thresholds.score,
            self.thresholds.members
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Season;
    use crate::models::RecordDetails;

    fn record(id: i64, japanese: bool, kid: bool, score: Option<f64>, members: Option<i64>) -> Record {
        Record {
            id,
            title: format!("title {id}"),
            title_native: None,
            synonyms: vec![],
            score,
            members,
            popularity: None,
            genres: vec![],
            studios: vec![],
            producers: vec![],
            licensors: vec![],
            demographics: vec![],
            year: 2024,
            season: Season::Spring,
            is_japanese: japanese,
            is_adult: false,
            is_kid: kid,
            details: RecordDetails::default(),
        }
    }

    fn ids(records: &[Record]) -> Vec<i64> {
        records.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_reference_statistics() {
        let reference = vec![
            record(1, true, false, Some(8.0), Some(100)),
            record(2, true, false, Some(7.0), Some(300)),
            record(3, true, false, Some(9.0), Some(200)),
        ];

        let thresholds = Thresholds::from_reference(&reference);

        assert!((thresholds.score - 7.0).abs() < 1e-9);
        assert_eq!(thresholds.members, 200);
        assert!(thresholds.admits(&record(4, false, false, Some(6.5), Some(250))));
        assert!(!thresholds.admits(&record(5, false, false, Some(6.5), Some(150))));
    }

    #[test]
    fn test_even_reference_uses_lower_middle_index() {
        let reference = vec![
            record(1, true, false, None, Some(40)),
            record(2, true, false, None, Some(10)),
            record(3, true, false, None, Some(30)),
            record(4, true, false, None, Some(20)),
        ];
        // sorted [10, 20, 30, 40], index 2
        assert_eq!(Thresholds::from_reference(&reference).members, 30);
    }

    #[test]
    fn test_no_scores_means_zero_score_threshold() {
        let batch = vec![
            record(1, true, false, None, Some(100)),
            record(2, true, false, None, Some(500)),
            record(3, false, false, None, Some(10)),
            record(4, false, true, None, Some(900)),
        ];

        let (kept, report) = apply(batch);

        assert_eq!(report.thresholds.score, 0.0);
        assert!(!report.thresholds.score.is_nan());
        // missing score compares as 0 >= 0
        assert_eq!(ids(&kept), vec![1, 2, 3, 4]);
        assert_eq!(report.dropped, 0);
    }

    #[test]
    fn test_suspects_below_both_bars_are_dropped() {
        let batch = vec![
            record(1, true, false, Some(8.0), Some(1000)),
            record(2, false, false, Some(5.0), Some(10)),
            record(3, true, false, Some(6.0), Some(3000)),
            record(4, false, false, Some(7.5), Some(5)),
            record(5, true, true, None, None),
        ];

        let (kept, report) = apply(batch);

        // core mean 7.0 -> 6.0; core members [1000, 3000] -> 3000
        assert!((report.thresholds.score - 6.0).abs() < 1e-9);
        assert_eq!(report.thresholds.members, 3000);
        assert_eq!(ids(&kept), vec![1, 3, 4]);
        assert_eq!(report.dropped, 2);
        assert_eq!(report.core, 2);
        assert_eq!(report.suspects, 3);
    }

    #[test]
    fn test_core_records_always_survive() {
        let batch = vec![
            record(1, true, false, Some(1.0), Some(0)),
            record(2, true, false, Some(9.9), Some(1_000_000)),
            record(3, false, false, Some(1.0), Some(0)),
        ];

        let (kept, _) = apply(batch);

        assert!(kept.iter().any(|r| r.id == 1));
        assert!(kept.iter().any(|r| r.id == 2));
        assert!(!kept.iter().any(|r| r.id == 3));
    }

    #[test]
    fn test_falls_back_to_whole_batch_without_core() {
        let batch = vec![
            record(1, false, false, Some(8.0), Some(100)),
            record(2, false, false, Some(6.0), Some(300)),
            record(3, true, true, Some(4.0), Some(200)),
        ];

        let (kept, report) = apply(batch);

        assert!(report.used_fallback);
        // mean 6.0 -> 5.0; members sorted [100, 200, 300] -> 200
        assert!((report.thresholds.score - 5.0).abs() < 1e-9);
        assert_eq!(report.thresholds.members, 200);
        assert_eq!(ids(&kept), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_batch() {
        let (kept, report) = apply(Vec::new());
        assert!(kept.is_empty());
        assert_eq!(report.thresholds, Thresholds::default());
    }
}
