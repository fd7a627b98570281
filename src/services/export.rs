//! CSV export of the stored catalog.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::Writer;
use tracing::info;

use super::stats::{ScoreSummary, round2, tally};
use crate::models::Record;
use crate::store::StoredBatch;

#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub records: usize,
    pub files: Vec<PathBuf>,
}

fn cell<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn score_cell(value: Option<f64>) -> String {
    cell(value.map(round2))
}

fn joined(items: &[String]) -> String {
    items.join("|")
}

/// Flattens line breaks and cuts `text` to `limit` characters plus `...`.
fn shorten(text: Option<&str>, limit: usize) -> String {
    let flat = text.unwrap_or_default().replace(['\n', '\r'], " ");
    if flat.chars().count() > limit {
        let mut cut: String = flat.chars().take(limit).collect();
        cut.push_str("...");
        cut
    } else {
        flat
    }
}

/// Writes the five CSV files into `out_dir`.
///
/// `batches` is expected to be limited to the exported year range already.
pub fn export_catalog(
    batches: &[StoredBatch],
    out_dir: &Path,
    text_truncate: usize,
) -> Result<ExportReport> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let records: Vec<&Record> = batches.iter().flat_map(|b| b.records.iter()).collect();
    let mut report = ExportReport {
        records: records.len(),
        files: Vec::new(),
    };

    write_file(out_dir, "all_anime.csv", &mut report, |w| {
        write_all_anime(w, &records, text_truncate)
    })?;
    write_file(out_dir, "ratings_by_season.csv", &mut report, |w| {
        write_ratings_by_season(w, batches)
    })?;
    write_file(out_dir, "genre_statistics.csv", &mut report, |w| {
        write_name_statistics(w, &records, "genre", false, |r| r.genres.as_slice())
    })?;
    write_file(out_dir, "studio_statistics.csv", &mut report, |w| {
        write_name_statistics(w, &records, "studio", true, |r| r.studios.as_slice())
    })?;
    write_file(out_dir, "yearly_summary.csv", &mut report, |w| {
        write_yearly_summary(w, &records)
    })?;

    Ok(report)
}

fn write_file(
    out_dir: &Path,
    name: &str,
    report: &mut ExportReport,
    write: impl FnOnce(&mut Writer<std::fs::File>) -> Result<()>,
) -> Result<()> {
    let path = out_dir.join(name);
    let mut writer =
        Writer::from_path(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    write(&mut writer).with_context(|| format!("Failed to write {}", path.display()))?;
    writer.flush()?;
    info!(path = %path.display(), "Exported {name}");
    report.files.push(path);
    Ok(())
}

const ALL_ANIME_HEADER: [&str; 43] = [
    "mal_id",
    "title",
    "title_english",
    "title_japanese",
    "title_synonyms",
    "year",
    "season",
    "season_label",
    "score",
    "scored_by",
    "rank",
    "popularity",
    "members",
    "favorites",
    "episodes",
    "type",
    "status",
    "airing",
    "duration",
    "rating",
    "source",
    "broadcast",
    "aired_from",
    "aired_to",
    "trailer_url",
    "is_hentai",
    "is_japanese",
    "is_kid",
    "studios",
    "studios_count",
    "producers",
    "producers_count",
    "licensors",
    "licensors_count",
    "genres",
    "genres_count",
    "themes",
    "themes_count",
    "demographics",
    "demographics_count",
    "synopsis_short",
    "background_short",
    "url",
];

fn write_all_anime<W: std::io::Write>(
    writer: &mut Writer<W>,
    records: &[&Record],
    text_truncate: usize,
) -> Result<()> {
    writer.write_record(ALL_ANIME_HEADER)?;

    for record in records {
        let d = &record.details;
        let row: [String; 43] = [
            record.id.to_string(),
            record.title.clone(),
            cell(d.title_english.as_deref()),
            cell(record.title_native.as_deref()),
            joined(&record.synonyms),
            record.year.to_string(),
            record.season.to_string(),
            format!("{} {}", record.season.label(), record.year),
            cell(record.score),
            cell(d.scored_by),
            cell(d.rank),
            cell(record.popularity),
            cell(record.members),
            cell(d.favorites),
            cell(d.episodes),
            cell(d.format.as_deref()),
            cell(d.status.as_deref()),
            cell(d.airing),
            cell(d.duration.as_deref()),
            cell(d.rating.as_deref()),
            cell(d.source.as_deref()),
            cell(d.broadcast.as_deref()),
            cell(d.aired_from.as_deref()),
            cell(d.aired_to.as_deref()),
            cell(d.trailer_url.as_deref()),
            record.is_adult.to_string(),
            record.is_japanese.to_string(),
            record.is_kid.to_string(),
            joined(&record.studios),
            record.studios.len().to_string(),
            joined(&record.producers),
            record.producers.len().to_string(),
            joined(&record.licensors),
            record.licensors.len().to_string(),
            joined(&record.genres),
            record.genres.len().to_string(),
            joined(&d.themes),
            d.themes.len().to_string(),
            joined(&record.demographics),
            record.demographics.len().to_string(),
            shorten(d.synopsis.as_deref(), text_truncate),
            shorten(d.background.as_deref(), text_truncate),
            cell(d.url.as_deref()),
        ];
        writer.write_record(&row)?;
    }

    Ok(())
}

fn summary_cells(summary: &ScoreSummary) -> [String; 4] {
    [
        score_cell(summary.mean),
        score_cell(summary.median),
        score_cell(summary.highest),
        score_cell(summary.lowest),
    ]
}

fn write_ratings_by_season<W: std::io::Write>(
    writer: &mut Writer<W>,
    batches: &[StoredBatch],
) -> Result<()> {
    writer.write_record([
        "year",
        "season",
        "season_label",
        "total_anime",
        "rated_anime",
        "average_score",
        "median_score",
        "highest_score",
        "lowest_score",
    ])?;

    for batch in batches {
        let key = batch.entry.key();
        let scores: Vec<f64> = batch.records.iter().filter_map(Record::rated_score).collect();
        let summary = ScoreSummary::from_scores(&scores);

        let mut row = vec![
            key.year.to_string(),
            key.season.to_string(),
            format!("{} {}", key.season.label(), key.year),
            batch.records.len().to_string(),
            summary.rated.to_string(),
        ];
        row.extend(summary_cells(&summary));
        writer.write_record(&row)?;
    }

    Ok(())
}

fn write_name_statistics<W: std::io::Write>(
    writer: &mut Writer<W>,
    records: &[&Record],
    column: &str,
    with_rated: bool,
    names: fn(&Record) -> &[String],
) -> Result<()> {
    let mut header = vec![column, "total_anime"];
    if with_rated {
        header.push("rated_anime");
    }
    header.extend(["average_score", "median_score", "highest_score", "lowest_score"]);
    writer.write_record(&header)?;

    for group in tally(records.iter().copied(), names) {
        let summary = group.summary();
        let mut row = vec![group.name.clone(), group.count.to_string()];
        if with_rated {
            row.push(summary.rated.to_string());
        }
        row.extend(summary_cells(&summary));
        writer.write_record(&row)?;
    }

    Ok(())
}

#[derive(Default)]
struct YearAccumulator<'a> {
    total: usize,
    scores: Vec<f64>,
    genres: BTreeSet<&'a str>,
    studios: BTreeSet<&'a str>,
}

fn write_yearly_summary<W: std::io::Write>(writer: &mut Writer<W>, records: &[&Record]) -> Result<()> {
    writer.write_record([
        "year",
        "total_anime",
        "rated_anime",
        "average_score",
        "unique_genres",
        "unique_studios",
    ])?;

    let mut years: BTreeMap<i32, YearAccumulator<'_>> = BTreeMap::new();
    for record in records {
        let acc = years.entry(record.year).or_default();
        acc.total += 1;
        acc.scores.extend(record.rated_score());
        acc.genres.extend(record.genres.iter().map(String::as_str).filter(|g| !g.is_empty()));
        acc.studios.extend(record.studios.iter().map(String::as_str).filter(|s| !s.is_empty()));
    }

    for (year, acc) in years {
        let summary = ScoreSummary::from_scores(&acc.scores);
        writer.write_record([
            year.to_string(),
            acc.total.to_string(),
            summary.rated.to_string(),
            score_cell(summary.mean),
            acc.genres.len().to_string(),
            acc.studios.len().to_string(),
        ])?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorten() {
        assert_eq!(shorten(None, 5), "");
        assert_eq!(shorten(Some("line\nbreak"), 20), "line break");
        assert_eq!(shorten(Some("こんにちは世界"), 5), "こんにちは...");
        assert_eq!(shorten(Some("exact"), 5), "exact");
    }

    #[test]
    fn test_cells() {
        assert_eq!(cell::<i64>(None), "");
        assert_eq!(score_cell(Some(7.456)), "7.46");
        assert_eq!(score_cell(Some(8.0)), "8");
        assert_eq!(joined(&["A".to_string(), "B".to_string()]), "A|B");
    }
}
