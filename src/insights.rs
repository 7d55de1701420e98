//! Insight summaries over the final data folder.
//!
//! Each section reads optional summary files from the final folder and is
//! skipped when they are absent. Results are written as CSV data files to
//! the insights folder.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ChartError, Result};
use crate::loader;
use crate::models::common::{parse_number, round2, serialize_number, serialize_opt_number};
use crate::models::ChartTable;
use crate::writer;

/// Names kept by the global trends section.
pub const GLOBAL_TRENDS_TOP: usize = 5;

/// An insight section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightSection {
    /// Highest and lowest monthly streams per country.
    StreamTrends,
    /// Local versus global top artists.
    ArtistOverlap,
    /// Monthly streams of the biggest tracks and artists.
    GlobalTrends,
}

impl InsightSection {
    /// Output filename of this section.
    pub fn output_file(&self) -> &'static str {
        match self {
            InsightSection::StreamTrends => "country_stream_trends.csv",
            InsightSection::ArtistOverlap => "artist_overlap.csv",
            InsightSection::GlobalTrends => "global_trends.csv",
        }
    }
}

/// Result of an insights run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InsightsReport {
    /// Sections that had their inputs and ran.
    pub sections: Vec<InsightSection>,
    /// Files written.
    pub written: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct StreamTrend {
    #[serde(rename = "Country")]
    country: String,
    #[serde(serialize_with = "serialize_opt_number")]
    max_streams_millions: Option<f64>,
    #[serde(serialize_with = "serialize_opt_number")]
    min_streams_millions: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct OverlapCount {
    category: &'static str,
    count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct MonthlyTrend {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Month")]
    month: String,
    #[serde(serialize_with = "serialize_number")]
    streams_millions: f64,
}

fn millions(streams: f64) -> f64 {
    streams / 1e6
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

fn column(table: &ChartTable, name: &str, file: &Path) -> Result<usize> {
    table
        .column_index(name)
        .ok_or_else(|| ChartError::MissingColumn {
            column: name.to_string(),
            file: file.display().to_string(),
        })
}

/// Compute insight summaries from `final_dir` into `output_dir`.
pub fn generate<P: AsRef<Path>, Q: AsRef<Path>>(final_dir: P, output_dir: Q) -> Result<InsightsReport> {
    let final_dir = final_dir.as_ref();
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    let mut report = InsightsReport::default();

    let max_path = final_dir.join("max_stream_month.csv");
    let min_path = final_dir.join("min_stream_month.csv");
    if max_path.is_file() && min_path.is_file() {
        let rows = stream_trends(&max_path, &min_path)?;
        let headers = ["Country", "max_streams_millions", "min_streams_millions"];
        report.record(output_dir, InsightSection::StreamTrends, &headers, &rows)?;
    }

    let local_path = final_dir.join("top_artists_by_country.csv");
    let global_path = final_dir.join("global_top_artists.csv");
    if local_path.is_file() && global_path.is_file() {
        let rows = artist_overlap(&local_path, &global_path)?;
        report.record(output_dir, InsightSection::ArtistOverlap, &["category", "count"], &rows)?;
    }

    let monthly_path = final_dir.join("monthly_common_tracks_and_artists.csv");
    if monthly_path.is_file() {
        let rows = global_trends(&monthly_path)?;
        let headers = ["Name", "Month", "streams_millions"];
        report.record(output_dir, InsightSection::GlobalTrends, &headers, &rows)?;
    }

    info!("Generated {} insight sections", report.sections.len());
    Ok(report)
}

impl InsightsReport {
    fn record<T: Serialize>(
        &mut self,
        output_dir: &Path,
        section: InsightSection,
        headers: &[&str],
        rows: &[T],
    ) -> Result<()> {
        let path = output_dir.join(section.output_file());
        writer::write_rows(&path, headers, rows)?;
        debug!("Insight {:?} written to {}", section, path.display());
        self.sections.push(section);
        self.written.push(path);
        Ok(())
    }
}

fn read_country_streams(path: &Path) -> Result<Vec<(String, Option<f64>)>> {
    let table = loader::read_table(path)?;
    let country = column(&table, "Country", path)?;
    let streams = column(&table, "streams", path)?;
    Ok(table
        .rows
        .iter()
        .map(|row| (row[country].clone(), parse_number(&row[streams])))
        .collect())
}

fn stream_trends(max_path: &Path, min_path: &Path) -> Result<Vec<StreamTrend>> {
    let mut rows: Vec<StreamTrend> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (country, streams) in read_country_streams(max_path)? {
        index.insert(country.clone(), rows.len());
        rows.push(StreamTrend {
            country,
            max_streams_millions: streams.map(|s| round2(millions(s))),
            min_streams_millions: None,
        });
    }

    for (country, streams) in read_country_streams(min_path)? {
        let value = streams.map(|s| round2(millions(s)));
        match index.get(&country) {
            Some(&i) => rows[i].min_streams_millions = value,
            None => {
                index.insert(country.clone(), rows.len());
                rows.push(StreamTrend {
                    country,
                    max_streams_millions: None,
                    min_streams_millions: value,
                });
            }
        }
    }

    Ok(rows)
}

fn read_artists(path: &Path) -> Result<BTreeSet<String>> {
    let table = loader::read_table(path)?;
    let idx = column(&table, "artist_names", path)?;
    Ok(table
        .rows
        .iter()
        .map(|row| row[idx].clone())
        .filter(|a| !a.is_empty())
        .collect())
}

fn artist_overlap(local_path: &Path, global_path: &Path) -> Result<Vec<OverlapCount>> {
    let local = read_artists(local_path)?;
    let global = read_artists(global_path)?;

    Ok(vec![
        OverlapCount {
            category: "local_only",
            count: local.difference(&global).count(),
        },
        OverlapCount {
            category: "overlap",
            count: local.intersection(&global).count(),
        },
        OverlapCount {
            category: "global_only",
            count: global.difference(&local).count(),
        },
    ])
}

fn global_trends(path: &Path) -> Result<Vec<MonthlyTrend>> {
    let table = loader::read_table(path)?;
    let name = column(&table, "Name", path)?;
    let month = column(&table, "Month", path)?;
    let streams = column(&table, "streams", path)?;

    // Totals in first-seen order so ties keep the earlier name.
    let mut totals: Vec<(String, f64)> = Vec::new();
    for row in &table.rows {
        let value = parse_number(&row[streams]).unwrap_or(0.0);
        match totals.iter_mut().find(|(n, _)| *n == row[name]) {
            Some((_, total)) => *total += value,
            None => totals.push((row[name].clone(), value)),
        }
    }
    totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let top: Vec<&str> = totals
        .iter()
        .take(GLOBAL_TRENDS_TOP)
        .map(|(n, _)| n.as_str())
        .collect();

    Ok(table
        .rows
        .iter()
        .filter(|row| top.contains(&row[name].as_str()))
        .filter_map(|row| {
            let value = parse_number(&row[streams])?;
            Some(MonthlyTrend {
                name: row[name].clone(),
                month: row[month].clone(),
                streams_millions: round1(millions(value)),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(path: &Path) -> String {
        fs::read_to_string(path)
            .unwrap()
            .trim_start_matches('\u{feff}')
            .to_string()
    }

    #[test]
    fn test_no_inputs_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let report = generate(dir.path(), dir.path().join("insights")).unwrap();
        assert!(report.sections.is_empty());
        assert!(dir.path().join("insights").is_dir());
    }

    #[test]
    fn test_stream_trends_outer_join() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("max_stream_month.csv"), "Country,streams\nKR,25000000\nAU,3000000\n").unwrap();
        fs::write(dir.path().join("min_stream_month.csv"), "Country,streams\nAU,1500000\nJP,900000\n").unwrap();

        let out = dir.path().join("insights");
        let report = generate(dir.path(), &out).unwrap();
        assert_eq!(report.sections, vec![InsightSection::StreamTrends]);
        assert_eq!(
            read(&out.join("country_stream_trends.csv")),
            "Country,max_streams_millions,min_streams_millions\nKR,25,\nAU,3,1.5\nJP,,0.9\n"
        );
    }

    #[test]
    fn test_artist_overlap_counts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("top_artists_by_country.csv"),
            "country,artist_names\nKR,IU\nKR,NewJeans\nUS,Taylor Swift\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("global_top_artists.csv"),
            "artist_names\nTaylor Swift\nBad Bunny\nThe Weeknd\n",
        )
        .unwrap();

        let out = dir.path().join("insights");
        generate(dir.path(), &out).unwrap();
        assert_eq!(
            read(&out.join("artist_overlap.csv")),
            "category,count\nlocal_only,2\noverlap,1\nglobal_only,2\n"
        );
    }

    #[test]
    fn test_global_trends_keeps_top_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = String::from("Name,Month,streams\n");
        for (i, name) in ["A", "B", "C", "D", "E", "F"].iter().enumerate() {
            body.push_str(&format!("{name},2023-01,{}\n", (i + 1) * 1_000_000));
        }
        body.push_str("F,2023-02,1250000\n");
        fs::write(dir.path().join("monthly_common_tracks_and_artists.csv"), body).unwrap();

        let out = dir.path().join("insights");
        generate(dir.path(), &out).unwrap();
        let text = read(&out.join("global_trends.csv"));

        assert!(!text.contains("\nA,"));
        assert!(text.contains("F,2023-01,6\n"));
        assert!(text.contains("F,2023-02,1.2\n"));
        assert_eq!(text.lines().count(), 1 + 6);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("monthly_common_tracks_and_artists.csv"), "Name,streams\nA,1\n").unwrap();
        let err = generate(dir.path(), dir.path().join("insights")).unwrap_err();
        assert!(matches!(err, ChartError::MissingColumn { ref column, .. } if column == "Month"));
    }
}
