//! Per-country merge and analysis run.
//!
//! This module provides the high-level entry point that turns a folder of
//! weekly chart exports into per-country files, one merged file and the
//! trend analyses.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::analysis;
use crate::error::{ChartError, Result};
use crate::loader;
use crate::models::ChartTable;
use crate::writer;

/// Merged file with every country's rows.
pub const MERGED_FILE: &str = "final_merged_data.csv";
/// Most streamed tracks per country.
pub const TOP_TRACKS_FILE: &str = "top_tracks.csv";
/// Recently climbing tracks per country.
pub const RISING_TRENDS_FILE: &str = "rising_trends.csv";
/// Longest charting tracks per country.
pub const LONGEVITY_FILE: &str = "longevity.csv";
/// Top-10 stream share per country.
pub const DISTRIBUTION_FILE: &str = "streams_distribution.csv";

const TOP_TRACKS_HEADERS: [&str; 6] = [
    "country",
    "track_name",
    "artist_names",
    "total_streams",
    "peak_rank",
    "avg_streams",
];
const LONGEVITY_HEADERS: [&str; 6] = [
    "country",
    "track_name",
    "artist_names",
    "total_weeks",
    "total_streams",
    "avg_streams_per_week",
];
const DISTRIBUTION_HEADERS: [&str; 5] = [
    "country",
    "total_streams",
    "top_10_streams",
    "top_10_tracks",
    "top_10_share",
];

/// Filename of a country's intermediate file.
pub fn country_file_name(country: &str) -> String {
    format!("{}_data.csv", country)
}

/// Rows merged for one country.
#[derive(Debug, Clone, Serialize)]
pub struct CountrySummary {
    /// Country code.
    pub country: String,
    /// Input files merged.
    pub files: usize,
    /// Rows merged.
    pub rows: usize,
}

/// Result of a merge run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    /// Countries in order of first appearance.
    pub countries: Vec<CountrySummary>,
    /// Every file written, intermediate files first.
    pub written: Vec<PathBuf>,
    /// Input files skipped, with the reason.
    pub failed: Vec<(PathBuf, String)>,
    /// Rows in the merged file.
    pub total_rows: usize,
}

impl MergeReport {
    /// Number of input files merged.
    pub fn total_files(&self) -> usize {
        self.countries.iter().map(|c| c.files).sum()
    }

    /// Check if every input file was merged.
    pub fn all_successful(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Merges chart exports per country and writes the analyses.
///
/// # Example
///
/// ```rust,no_run
/// use chartmerge::ChartMerger;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let merger = ChartMerger::new("spotify_data");
///     let report = merger.run()?;
///     println!("Merged {} countries", report.countries.len());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ChartMerger {
    input_dir: PathBuf,
    intermediate_dir: PathBuf,
    final_dir: PathBuf,
    /// Whether an unreadable input file fails the run.
    strict: bool,
}

impl ChartMerger {
    /// Create a merger reading from `input_dir`.
    ///
    /// Outputs default to `country_data` and `final_data` in the current
    /// working directory.
    pub fn new<P: AsRef<Path>>(input_dir: P) -> Self {
        Self {
            input_dir: input_dir.as_ref().to_path_buf(),
            intermediate_dir: PathBuf::from("country_data"),
            final_dir: PathBuf::from("final_data"),
            strict: true,
        }
    }

    /// Set the directory for per-country files.
    pub fn set_intermediate_dir<P: AsRef<Path>>(&mut self, path: P) {
        self.intermediate_dir = path.as_ref().to_path_buf();
    }

    /// Set the directory for the merged file and analyses.
    pub fn set_final_dir<P: AsRef<Path>>(&mut self, path: P) {
        self.final_dir = path.as_ref().to_path_buf();
    }

    /// Skip unreadable inputs instead of failing.
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Get the input directory.
    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Get the per-country output directory.
    pub fn intermediate_dir(&self) -> &Path {
        &self.intermediate_dir
    }

    /// Get the final output directory.
    pub fn final_dir(&self) -> &Path {
        &self.final_dir
    }

    /// Run the merge.
    ///
    /// # Errors
    ///
    /// Returns `NoInput` if no CSV file could be loaded.
    pub fn run(&self) -> Result<MergeReport> {
        let files = loader::discover_csv_files(&self.input_dir);
        let loaded = loader::load_by_country(&files, self.strict)?;
        if loaded.countries.is_empty() {
            return Err(ChartError::NoInput(self.input_dir.clone()));
        }

        fs::create_dir_all(&self.intermediate_dir)?;
        fs::create_dir_all(&self.final_dir)?;

        let mut report = MergeReport {
            failed: loaded.failed,
            ..Default::default()
        };

        let mut merged = ChartTable::default();
        for country in loaded.countries {
            let path = self.intermediate_dir.join(country_file_name(&country.country));
            writer::write_table(&path, &country.table)?;
            report.written.push(path);

            report.countries.push(CountrySummary {
                country: country.country,
                files: country.files,
                rows: country.table.len(),
            });
            merged.append(country.table);
        }
        report.total_rows = merged.len();

        let path = self.final_dir.join(MERGED_FILE);
        writer::write_table(&path, &merged)?;
        report.written.push(path);

        self.write_analyses(&merged, &mut report)?;

        info!(
            "Merged {} files into {} countries ({} rows)",
            report.total_files(),
            report.countries.len(),
            report.total_rows
        );
        Ok(report)
    }

    fn write_analyses(&self, merged: &ChartTable, report: &mut MergeReport) -> Result<()> {
        let entries = merged.entries();

        let top = analysis::top_tracks(&entries);
        let path = self.final_dir.join(TOP_TRACKS_FILE);
        writer::write_rows(&path, &TOP_TRACKS_HEADERS, &top)?;
        report.written.push(path);

        let rising = analysis::rising_trends(merged);
        let path = self.final_dir.join(RISING_TRENDS_FILE);
        writer::write_table(&path, &analysis::rising_trends_table(&merged.headers, &rising))?;
        report.written.push(path);

        let longevity = analysis::longevity(&entries);
        let path = self.final_dir.join(LONGEVITY_FILE);
        writer::write_rows(&path, &LONGEVITY_HEADERS, &longevity)?;
        report.written.push(path);

        let distribution = analysis::streams_distribution(&entries);
        let path = self.final_dir.join(DISTRIBUTION_FILE);
        writer::write_rows(&path, &DISTRIBUTION_HEADERS, &distribution)?;
        report.written.push(path);

        debug!(
            "Analyses: {} top tracks, {} rising, {} long runners, {} countries",
            top.len(),
            rising.len(),
            longevity.len(),
            distribution.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "rank,uri,artist_names,track_name,source,peak_rank,previous_rank,weeks_on_chart,streams";

    fn merger_in(root: &Path) -> ChartMerger {
        let mut merger = ChartMerger::new(root.join("spotify_data"));
        merger.set_intermediate_dir(root.join("country_data"));
        merger.set_final_dir(root.join("final_data"));
        merger
    }

    fn write_input(root: &Path, name: &str, rows: &[&str]) {
        let dir = root.join("spotify_data");
        fs::create_dir_all(&dir).unwrap();
        let mut body = String::from(HEADER);
        for row in rows {
            body.push('\n');
            body.push_str(row);
        }
        body.push('\n');
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_country_file_name() {
        assert_eq!(country_file_name("AU"), "AU_data.csv");
    }

    #[test]
    fn test_run_writes_all_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_input(
            root,
            "regional-au-weekly-2023-06-15.csv",
            &["1,spotify:track:1,Artist A,Song A,Label,1,2,3,1000"],
        );
        write_input(
            root,
            "regional-kr-weekly-2023-06-15.csv",
            &["1,spotify:track:2,Artist B,Song B,Label,1,1,10,500"],
        );

        let report = merger_in(root).run().unwrap();

        assert_eq!(report.countries.len(), 2);
        assert_eq!(report.total_rows, 2);
        assert!(report.all_successful());
        assert_eq!(report.written.len(), 2 + 5);
        for name in [
            MERGED_FILE,
            TOP_TRACKS_FILE,
            RISING_TRENDS_FILE,
            LONGEVITY_FILE,
            DISTRIBUTION_FILE,
        ] {
            assert!(root.join("final_data").join(name).is_file(), "{name}");
        }
        assert!(root.join("country_data/AU_data.csv").is_file());
        assert!(root.join("country_data/KR_data.csv").is_file());

        let au = loader::read_table(root.join("country_data/AU_data.csv")).unwrap();
        assert_eq!(au.headers.last().map(String::as_str), Some("country"));
        assert_eq!(au.get(0, "country"), Some("AU"));

        // KR's only row has been charting for 10 weeks, so it is not rising.
        let rising = loader::read_table(root.join("final_data").join(RISING_TRENDS_FILE)).unwrap();
        assert_eq!(rising.len(), 1);
        assert_eq!(rising.get(0, "country"), Some("AU"));
        assert_eq!(rising.get(0, "rank_change"), Some("1"));
    }

    #[test]
    fn test_run_without_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = merger_in(dir.path()).run().unwrap_err();
        assert!(matches!(err, ChartError::NoInput(_)));
        assert!(!dir.path().join("final_data").exists());
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_input(
            root,
            "regional-us-weekly-2023-06-15.csv",
            &["2,u,A,Song,L,2,3,1,10", "1,u,B,Other,L,1,1,2,20"],
        );

        let merger = merger_in(root);
        merger.run().unwrap();
        let first = fs::read(root.join("final_data").join(MERGED_FILE)).unwrap();
        merger.run().unwrap();
        let second = fs::read(root.join("final_data").join(MERGED_FILE)).unwrap();
        assert_eq!(first, second);
    }
}
