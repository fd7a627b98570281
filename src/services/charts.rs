//! JSON datasets consumed by the web front-end charts.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use super::stats::{mean, percentage, round2, tally};
use crate::domain::Season;
use crate::models::Record;
use crate::store::StoredBatch;

/// Seasons averaged by the rating trend's moving average.
pub const MOVING_AVERAGE_WINDOW: usize = 4;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingTrend {
    /// Year label on the first season of each year, empty otherwise.
    pub labels: Vec<String>,
    pub dates: Vec<String>,
    pub ratings: Vec<f64>,
    pub moving_average: Vec<Option<f64>>,
    pub counts: Vec<usize>,
    pub overall_average: f64,
    pub min_rating: f64,
    pub max_rating: f64,
}

impl RatingTrend {
    /// `None` when no stored season has a single rated title.
    #[must_use]
    pub fn build(batches: &[StoredBatch]) -> Option<Self> {
        let mut points: Vec<(NaiveDate, i32, f64, usize)> = batches
            .iter()
            .filter_map(|batch| {
                let key = batch.entry.key();
                let scores: Vec<f64> = batch.records.iter().filter_map(Record::rated_score).collect();
                Some((key.start_date()?, key.year, mean(&scores)?, scores.len()))
            })
            .collect();
        points.sort_by_key(|p| p.0);

        let averages: Vec<f64> = points.iter().map(|p| p.2).collect();
        let overall = mean(&averages)?;

        let mut labels = Vec::with_capacity(points.len());
        let mut previous = None;
        for point in &points {
            if previous == Some(point.1) {
                labels.push(String::new());
            } else {
                labels.push(point.1.to_string());
                previous = Some(point.1);
            }
        }

        let moving_average = (0..averages.len())
            .map(|i| {
                (i + 1 >= MOVING_AVERAGE_WINDOW)
                    .then(|| mean(&averages[i + 1 - MOVING_AVERAGE_WINDOW..=i]))
                    .flatten()
                    .map(round2)
            })
            .collect();

        Some(Self {
            labels,
            dates: points.iter().map(|p| p.0.format("%Y-%m-%d").to_string()).collect(),
            ratings: averages.iter().copied().map(round2).collect(),
            moving_average,
            counts: points.iter().map(|p| p.3).collect(),
            overall_average: round2(overall),
            min_rating: round2(averages.iter().copied().fold(f64::INFINITY, f64::min)),
            max_rating: round2(averages.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreTrends<T> {
    pub years: Vec<i32>,
    pub genres: Vec<String>,
    pub data: BTreeMap<String, Vec<T>>,
}

/// Yearly counts and yearly shares of the `top` most frequent genres.
#[must_use]
pub fn genre_trends(records: &[&Record], top: usize) -> (GenreTrends<usize>, GenreTrends<f64>) {
    let genres: Vec<String> = tally(records.iter().copied(), |r| r.genres.as_slice())
        .into_iter()
        .take(top)
        .map(|t| t.name)
        .collect();

    let mut totals: BTreeMap<i32, usize> = BTreeMap::new();
    let mut per_year: BTreeMap<(i32, &str), usize> = BTreeMap::new();
    for record in records {
        *totals.entry(record.year).or_default() += 1;
        for genre in &record.genres {
            *per_year.entry((record.year, genre.as_str())).or_default() += 1;
        }
    }

    let years: Vec<i32> = totals.keys().copied().collect();
    let mut counts = BTreeMap::new();
    let mut shares = BTreeMap::new();
    for genre in &genres {
        let series: Vec<usize> = years
            .iter()
            .map(|&year| per_year.get(&(year, genre.as_str())).copied().unwrap_or(0))
            .collect();
        let share = years
            .iter()
            .zip(&series)
            .map(|(year, &count)| round2(percentage(count, totals[year])))
            .collect();
        counts.insert(genre.clone(), series);
        shares.insert(genre.clone(), share);
    }

    (
        GenreTrends {
            years: years.clone(),
            genres: genres.clone(),
            data: counts,
        },
        GenreTrends {
            years,
            genres,
            data: shares,
        },
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreTrendsBySeason<T> {
    /// `"Winter 2020"` style label per stored season, oldest first.
    pub labels: Vec<String>,
    pub genres: Vec<String>,
    pub data: BTreeMap<String, Vec<T>>,
}

/// Per-season counts and per-season shares of the `top` most frequent genres.
#[must_use]
pub fn genre_trends_by_season(
    batches: &[StoredBatch],
    top: usize,
) -> (GenreTrendsBySeason<usize>, GenreTrendsBySeason<f64>) {
    let mut ordered: Vec<&StoredBatch> = batches.iter().collect();
    ordered.sort_by_key(|b| b.entry.key());

    let genres: Vec<String> = tally(
        ordered.iter().flat_map(|b| b.records.iter()),
        |r| r.genres.as_slice(),
    )
    .into_iter()
    .take(top)
    .map(|t| t.name)
    .collect();

    let labels: Vec<String> = ordered
        .iter()
        .map(|b| format!("{} {}", b.entry.season.label(), b.entry.year))
        .collect();

    let mut counts = BTreeMap::new();
    let mut shares = BTreeMap::new();
    for genre in &genres {
        let series: Vec<usize> = ordered
            .iter()
            .map(|b| b.records.iter().filter(|r| r.genres.contains(genre)).count())
            .collect();
        let share = ordered
            .iter()
            .zip(&series)
            .map(|(b, &count)| round2(percentage(count, b.records.len())))
            .collect();
        counts.insert(genre.clone(), series);
        shares.insert(genre.clone(), share);
    }

    (
        GenreTrendsBySeason {
            labels: labels.clone(),
            genres: genres.clone(),
            data: counts,
        },
        GenreTrendsBySeason {
            labels,
            genres,
            data: shares,
        },
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionVolume {
    pub years: Vec<i32>,
    pub counts: Vec<usize>,
    /// Year-over-year change in percent; `None` after a year with no titles.
    pub growth_rates: Vec<Option<f64>>,
    pub total_anime: usize,
    pub avg_per_year: f64,
    pub peak_year: i32,
    pub peak_count: usize,
}

impl ProductionVolume {
    /// Built from manifest counts. `None` when there is nothing stored.
    #[must_use]
    pub fn build(batches: &[StoredBatch]) -> Option<Self> {
        let mut by_year: BTreeMap<i32, usize> = BTreeMap::new();
        for batch in batches {
            *by_year.entry(batch.entry.year).or_default() += batch.entry.count;
        }

        let years: Vec<i32> = by_year.keys().copied().collect();
        let counts: Vec<usize> = by_year.values().copied().collect();
        let peak_count = *counts.iter().max()?;
        let peak_year = years[counts.iter().position(|&c| c == peak_count)?];

        #[allow(clippy::cast_precision_loss)]
        let growth_rates = counts
            .windows(2)
            .map(|w| (w[0] > 0).then(|| round2((w[1] as f64 - w[0] as f64) / w[0] as f64 * 100.0)))
            .collect();

        let total: usize = counts.iter().sum();
        #[allow(clippy::cast_precision_loss)]
        let avg_per_year = round1(total as f64 / counts.len() as f64);

        Some(Self {
            years,
            counts,
            growth_rates,
            total_anime: total,
            avg_per_year,
            peak_year,
            peak_count,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalPatterns {
    pub seasons: Vec<Season>,
    pub avg_scores: BTreeMap<Season, f64>,
    pub counts: BTreeMap<Season, usize>,
    pub highest_rated_season: Season,
    pub most_productive_season: Season,
}

impl SeasonalPatterns {
    #[must_use]
    pub fn build(records: &[&Record]) -> Self {
        let mut avg_scores = BTreeMap::new();
        let mut counts = BTreeMap::new();

        for season in Season::ALL {
            let in_season: Vec<&&Record> = records.iter().filter(|r| r.season == season).collect();
            let scores: Vec<f64> = in_season.iter().filter_map(|r| r.rated_score()).collect();
            avg_scores.insert(season, round2(mean(&scores).unwrap_or(0.0)));
            counts.insert(season, in_season.len());
        }

        // first season wins ties
        let mut highest_rated_season = Season::Winter;
        let mut most_productive_season = Season::Winter;
        for season in Season::ALL {
            if avg_scores[&season] > avg_scores[&highest_rated_season] {
                highest_rated_season = season;
            }
            if counts[&season] > counts[&most_productive_season] {
                most_productive_season = season;
            }
        }

        Self {
            seasons: Season::ALL.to_vec(),
            avg_scores,
            counts,
            highest_rated_season,
            most_productive_season,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudioByQuantity {
    pub studio: String,
    pub count: usize,
    pub avg_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudioByQuality {
    pub studio: String,
    pub avg_score: f64,
    pub count: usize,
    pub rated_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudioRankings {
    pub by_quantity: Vec<StudioByQuantity>,
    pub by_quality: Vec<StudioByQuality>,
}

impl StudioRankings {
    #[must_use]
    pub fn build(records: &[&Record], top: usize, min_rated: usize) -> Self {
        let studios = tally(records.iter().copied(), |r| r.studios.as_slice());

        let by_quantity = studios
            .iter()
            .take(top)
            .map(|t| StudioByQuantity {
                studio: t.name.clone(),
                count: t.count,
                avg_score: mean(&t.scores).map(round2),
            })
            .collect();

        let mut qualified: Vec<StudioByQuality> = studios
            .iter()
            .filter(|t| t.scores.len() >= min_rated)
            .filter_map(|t| {
                Some(StudioByQuality {
                    studio: t.name.clone(),
                    avg_score: mean(&t.scores)?,
                    count: t.count,
                    rated_count: t.scores.len(),
                })
            })
            .collect();
        qualified.sort_by(|a, b| b.avg_score.total_cmp(&a.avg_score));
        qualified.truncate(top);
        for entry in &mut qualified {
            entry.avg_score = round2(entry.avg_score);
        }

        Self {
            by_quantity,
            by_quality: qualified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudioPoint {
    pub name: String,
    pub avg_rating: f64,
    pub anime_count: usize,
    pub rated_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudioScatter {
    pub studios: Vec<StudioPoint>,
    pub mean_rating: f64,
    pub mean_count: f64,
    pub total_studios: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_anime_count: Option<usize>,
}

impl StudioScatter {
    /// Every studio with a rated title, or only those with at least
    /// `min_anime_count` titles. `None` when no studio qualifies.
    #[must_use]
    pub fn build(records: &[&Record], min_anime_count: Option<usize>) -> Option<Self> {
        let studios: Vec<StudioPoint> = tally(records.iter().copied(), |r| r.studios.as_slice())
            .into_iter()
            .filter(|t| min_anime_count.is_none_or(|min| t.count >= min))
            .filter_map(|t| {
                Some(StudioPoint {
                    avg_rating: round2(mean(&t.scores)?),
                    anime_count: t.count,
                    rated_count: t.scores.len(),
                    name: t.name,
                })
            })
            .collect();

        let ratings: Vec<f64> = studios.iter().map(|s| s.avg_rating).collect();
        #[allow(clippy::cast_precision_loss)]
        let counts: Vec<f64> = studios.iter().map(|s| s.anime_count as f64).collect();

        Some(Self {
            mean_rating: round2(mean(&ratings)?),
            mean_count: round1(mean(&counts)?),
            total_studios: studios.len(),
            studios,
            min_anime_count,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimePoint {
    pub title: String,
    pub score: f64,
    pub popularity: i64,
    pub members: i64,
    pub mal_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingPopularityScatter {
    pub anime: Vec<AnimePoint>,
    pub mean_score: f64,
    pub mean_popularity: f64,
    pub total_anime: usize,
}

impl RatingPopularityScatter {
    /// Titles carrying both a score and a popularity rank. `None` when there
    /// are none.
    #[must_use]
    pub fn build(records: &[&Record]) -> Option<Self> {
        let anime: Vec<AnimePoint> = records
            .iter()
            .filter_map(|r| {
                Some(AnimePoint {
                    title: r.title.clone(),
                    score: round2(r.rated_score()?),
                    popularity: r.popularity?,
                    members: r.members.unwrap_or(0),
                    mal_id: r.id,
                })
            })
            .collect();

        let scores: Vec<f64> = anime.iter().map(|a| a.score).collect();
        #[allow(clippy::cast_precision_loss)]
        let ranks: Vec<f64> = anime.iter().map(|a| a.popularity as f64).collect();

        Some(Self {
            mean_score: round2(mean(&scores)?),
            mean_popularity: round1(mean(&ranks)?),
            total_anime: anime.len(),
            anime,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionStats {
    pub total_anime: usize,
    pub total_seasons: usize,
    pub year_range: String,
    pub years_covered: usize,
    pub total_studios: usize,
    pub total_genres: usize,
    pub total_rated: usize,
    pub rating_percentage: f64,
    pub average_rating: f64,
    pub avg_per_season: f64,
    pub last_updated: String,
}

impl CollectionStats {
    #[must_use]
    pub fn build(batches: &[StoredBatch], records: &[&Record], today: NaiveDate) -> Self {
        let years: BTreeSet<i32> = batches.iter().map(|b| b.entry.year).collect();
        let year_range = match (years.first(), years.last()) {
            (Some(first), Some(last)) => format!("{first}-{last}"),
            _ => String::new(),
        };

        let distinct = |names: fn(&Record) -> &[String]| {
            records
                .iter()
                .flat_map(|r| names(r).iter())
                .filter(|n| !n.is_empty())
                .collect::<BTreeSet<_>>()
                .len()
        };

        let scores: Vec<f64> = records.iter().filter_map(|r| r.rated_score()).collect();

        #[allow(clippy::cast_precision_loss)]
        let avg_per_season = if years.is_empty() {
            0.0
        } else {
            round1(records.len() as f64 / years.len() as f64 / 4.0)
        };

        Self {
            total_anime: records.len(),
            total_seasons: batches.len(),
            year_range,
            years_covered: years.len(),
            total_studios: distinct(|r| r.studios.as_slice()),
            total_genres: distinct(|r| r.genres.as_slice()),
            total_rated: scores.len(),
            rating_percentage: round1(percentage(scores.len(), records.len())),
            average_rating: round2(mean(&scores).unwrap_or(0.0)),
            avg_per_season,
            last_updated: today.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Minimum title count and file name of each filtered studio scatter.
const STUDIO_SCATTER_FILTERS: [(usize, &str); 2] = [
    (5, "studio-scatter-filtered.json"),
    (10, "studio-scatter-filtered-10.json"),
];

#[derive(Debug, Clone, Copy)]
pub struct ChartOptions {
    pub top_genres: usize,
    pub top_studios: usize,
    pub min_rated_for_quality: usize,
    /// Popularity ranks only exist on the Jikan side.
    pub popularity_scatter: bool,
}

/// Builds every dataset from `batches` and writes them into `out_dir`.
///
/// Datasets that have no data to show are skipped.
pub async fn write_charts(
    batches: &[StoredBatch],
    out_dir: &Path,
    options: ChartOptions,
    today: NaiveDate,
) -> Result<Vec<PathBuf>> {
    let records: Vec<&Record> = batches.iter().flat_map(|b| b.records.iter()).collect();
    let mut written = Vec::new();

    if let Some(trend) = RatingTrend::build(batches) {
        written.push(write_json(out_dir, "rating-trend.json", &trend).await?);
    } else {
        info!("No rating data found, skipping rating trend");
    }

    let (counts, shares) = genre_trends(&records, options.top_genres);
    written.push(write_json(out_dir, "genre-trends.json", &counts).await?);
    written.push(write_json(out_dir, "genre-trends-percentage.json", &shares).await?);

    let (counts, shares) = genre_trends_by_season(batches, options.top_genres);
    written.push(write_json(out_dir, "genre-trends-by-season.json", &counts).await?);
    written.push(write_json(out_dir, "genre-trends-by-season-percentage.json", &shares).await?);

    if let Some(volume) = ProductionVolume::build(batches) {
        written.push(write_json(out_dir, "production-volume.json", &volume).await?);
    }

    let patterns = SeasonalPatterns::build(&records);
    written.push(write_json(out_dir, "seasonal-patterns.json", &patterns).await?);

    let rankings = StudioRankings::build(
        &records,
        options.top_studios,
        options.min_rated_for_quality,
    );
    written.push(write_json(out_dir, "studio-rankings.json", &rankings).await?);

    if let Some(scatter) = StudioScatter::build(&records, None) {
        written.push(write_json(out_dir, "studio-scatter.json", &scatter).await?);
    } else {
        info!("No rated studios found, skipping studio scatter");
    }
    for (min, name) in STUDIO_SCATTER_FILTERS {
        if let Some(scatter) = StudioScatter::build(&records, Some(min)) {
            written.push(write_json(out_dir, name, &scatter).await?);
        } else {
            info!(min, "No studio reaches the title count, skipping filtered scatter");
        }
    }

    if options.popularity_scatter {
        if let Some(scatter) = RatingPopularityScatter::build(&records) {
            written.push(
                write_json(out_dir, "anime-rating-popularity-scatter.json", &scatter).await?,
            );
        } else {
            info!("No titles with both score and popularity, skipping popularity scatter");
        }
    }

    let stats = CollectionStats::build(batches, &records, today);
    written.push(write_json(out_dir, "collection-stats.json", &stats).await?);

    Ok(written)
}

async fn write_json<T: Serialize>(out_dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    let path = out_dir.join(name);
    let bytes = serde_json::to_vec_pretty(value)?;
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Saved {name}");
    Ok(path)
}
