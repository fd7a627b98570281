//! Small descriptive statistics shared by the CSV export and the chart
//! datasets.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::Record;

/// Rounds to two decimals for presentation.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Conventional median: the mean of the two middle values for even lengths.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some(f64::midpoint(sorted[mid - 1], sorted[mid]))
    } else {
        Some(sorted[mid])
    }
}

/// Summary of a set of scores.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScoreSummary {
    pub rated: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub highest: Option<f64>,
    pub lowest: Option<f64>,
}

impl ScoreSummary {
    #[must_use]
    pub fn from_scores(scores: &[f64]) -> Self {
        Self {
            rated: scores.len(),
            mean: mean(scores),
            median: median(scores),
            highest: scores.iter().copied().reduce(f64::max),
            lowest: scores.iter().copied().reduce(f64::min),
        }
    }
}

/// Percentage of `part` in `whole`, 0 when `whole` is 0.
#[must_use]
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = part as f64 / whole as f64;
    ratio * 100.0
}

/// Titles and rated scores collected under one genre or studio name.
#[derive(Debug, Clone, PartialEq)]
pub struct NameTally {
    pub name: String,
    pub count: usize,
    pub scores: Vec<f64>,
}

impl NameTally {
    #[must_use]
    pub fn summary(&self) -> ScoreSummary {
        ScoreSummary::from_scores(&self.scores)
    }
}

/// Counts every name `names` yields across `records`, most frequent first.
/// Ties are broken by name so output is reproducible.
pub fn tally<'a, F>(records: impl IntoIterator<Item = &'a Record>, names: F) -> Vec<NameTally>
where
    F: Fn(&'a Record) -> &'a [String],
{
    let mut groups: BTreeMap<&str, (usize, Vec<f64>)> = BTreeMap::new();
    for record in records {
        let score = record.rated_score();
        for name in names(record).iter().filter(|n| !n.is_empty()) {
            let entry = groups.entry(name.as_str()).or_default();
            entry.0 += 1;
            if let Some(score) = score {
                entry.1.push(score);
            }
        }
    }

    let mut tallies: Vec<NameTally> = groups
        .into_iter()
        .map(|(name, (count, scores))| NameTally {
            name: name.to_string(),
            count,
            scores,
        })
        .collect();
    tallies.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    tallies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_summary() {
        let summary = ScoreSummary::from_scores(&[7.0, 9.0, 8.0]);
        assert_eq!(summary.rated, 3);
        assert_eq!(summary.mean, Some(8.0));
        assert_eq!(summary.highest, Some(9.0));
        assert_eq!(summary.lowest, Some(7.0));

        assert_eq!(ScoreSummary::from_scores(&[]), ScoreSummary::default());
    }

    #[test]
    fn test_round2_and_percentage() {
        assert!((round2(7.456) - 7.46).abs() < 1e-9);
        assert!((round2(2.0 / 3.0) - 0.67).abs() < 1e-9);
        assert_eq!(percentage(1, 0), 0.0);
        assert!((percentage(1, 4) - 25.0).abs() < 1e-9);
    }
}
