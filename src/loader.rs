//! Chart export discovery and loading.

use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::Result;
use crate::models::{columns, country_from_filename, ChartTable};

/// Merged rows of one country.
#[derive(Debug, Clone)]
pub struct CountryTable {
    /// Country code.
    pub country: String,
    /// Rows of every file of this country, in file order.
    pub table: ChartTable,
    /// Number of files merged into `table`.
    pub files: usize,
}

/// Outcome of loading a set of chart exports.
#[derive(Debug, Default)]
pub struct LoadResult {
    /// Per-country tables in order of first appearance.
    pub countries: Vec<CountryTable>,
    /// Files that were skipped, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

impl LoadResult {
    /// Number of files that were loaded.
    pub fn loaded_files(&self) -> usize {
        self.countries.iter().map(|c| c.files).sum()
    }

    fn insert(&mut self, country: String, table: ChartTable) {
        match self.countries.iter_mut().find(|c| c.country == country) {
            Some(existing) => {
                existing.table.append(table);
                existing.files += 1;
            }
            None => self.countries.push(CountryTable {
                country,
                table,
                files: 1,
            }),
        }
    }
}

/// Find every `.csv` file below `input_dir`, sorted by path.
///
/// A missing directory yields no files.
pub fn discover_csv_files<P: AsRef<Path>>(input_dir: P) -> Vec<PathBuf> {
    let input_dir = input_dir.as_ref();
    if !input_dir.exists() {
        warn!("Input directory {} does not exist", input_dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Error accessing entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".csv"))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    debug!("Discovered {} CSV files in {}", files.len(), input_dir.display());
    files
}

/// Read one CSV file into a table.
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<ChartTable> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path.as_ref())?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut table = ChartTable::new(headers);
    for record in reader.records() {
        let record = record?;
        table.push_row(record.iter().map(str::to_string).collect());
    }

    Ok(table)
}

/// Load chart exports and group them by the country in their filename.
///
/// With `strict`, the first unreadable file aborts loading; otherwise it is
/// skipped and reported in [`LoadResult::failed`].
pub fn load_by_country(files: &[PathBuf], strict: bool) -> Result<LoadResult> {
    let mut result = LoadResult::default();

    for path in files {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let country = country_from_filename(&file_name);

        let mut table = match read_table(path) {
            Ok(table) => table,
            Err(e) if !strict => {
                warn!("Skipping {}: {}", path.display(), e);
                result.failed.push((path.clone(), e.to_string()));
                continue;
            }
            Err(e) => return Err(e),
        };

        debug!("Loaded {} rows from {} ({})", table.len(), file_name, country);
        table.set_column(columns::COUNTRY, &country);
        result.insert(country, table);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const HEADER: &str = "rank,uri,artist_names,track_name,source,peak_rank,previous_rank,weeks_on_chart,streams";

    fn write(dir: &Path, rel: &str, body: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_discover_is_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b/regional-us-weekly-2023-01-05.csv", HEADER);
        write(dir.path(), "regional-au-weekly-2023-01-05.csv", HEADER);
        write(dir.path(), "notes.txt", "ignore me");

        let files = discover_csv_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("b/regional-us-weekly-2023-01-05.csv"));
        assert!(files[1].ends_with("regional-au-weekly-2023-01-05.csv"));
    }

    #[test]
    fn test_discover_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_csv_files(dir.path().join("absent")).is_empty());
    }

    #[test]
    fn test_read_table_strips_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "x.csv", "\u{feff}rank,streams\n1,100\n");
        let table = read_table(&path).unwrap();
        assert_eq!(table.headers, vec!["rank", "streams"]);
        assert_eq!(table.rows, vec![vec!["1", "100"]]);
    }

    #[test]
    fn test_load_groups_by_country() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!("{HEADER}\n1,u,A,Song,s,1,2,3,100\n");
        let files = vec![
            write(dir.path(), "regional-au-weekly-2023-01-05.csv", &body),
            write(dir.path(), "regional-kr-weekly-2023-01-05.csv", &body),
            write(dir.path(), "regional-au-weekly-2023-01-12.csv", &body),
        ];

        let result = load_by_country(&files, true).unwrap();
        let countries: Vec<_> = result.countries.iter().map(|c| c.country.as_str()).collect();
        assert_eq!(countries, vec!["AU", "KR"]);
        assert_eq!(result.countries[0].files, 2);
        assert_eq!(result.countries[0].table.len(), 2);
        assert_eq!(result.countries[0].table.get(1, "country"), Some("AU"));
        assert_eq!(result.loaded_files(), 3);
    }

    #[test]
    fn test_load_lenient_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(dir.path(), "regional-au-weekly-1.csv", "rank,streams\n1,10\n");
        let bad = write(dir.path(), "regional-us-weekly-1.csv", "rank,streams\n1,10,extra\n");

        let result = load_by_country(&[good.clone(), bad.clone()], false).unwrap();
        assert_eq!(result.countries.len(), 1);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].0, bad);

        assert!(load_by_country(&[good, bad], true).is_err());
    }
}
