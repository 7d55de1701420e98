//! Column-preserving chart table.
//!
//! Chart exports carry more columns than the analyses read, and every
//! column must survive the merge. `ChartTable` keeps cells as strings and
//! only the typed [`ChartEntry`] view interprets them.

use super::common::{parse_number, parse_text};

/// Column names read by the analyses.
pub mod columns {
    /// Country code assigned from the filename.
    pub const COUNTRY: &str = "country";
    /// Track title.
    pub const TRACK_NAME: &str = "track_name";
    /// Comma separated artist names.
    pub const ARTIST_NAMES: &str = "artist_names";
    /// Chart position this week.
    pub const RANK: &str = "rank";
    /// Chart position last week.
    pub const PREVIOUS_RANK: &str = "previous_rank";
    /// Best chart position so far.
    pub const PEAK_RANK: &str = "peak_rank";
    /// Consecutive weeks on the chart.
    pub const WEEKS_ON_CHART: &str = "weeks_on_chart";
    /// Streams this week.
    pub const STREAMS: &str = "streams";
}

/// A table of string cells with named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartTable {
    /// Column names in output order.
    pub headers: Vec<String>,

    /// Rows, each exactly `headers.len()` cells long.
    pub rows: Vec<Vec<String>>,
}

impl ChartTable {
    /// Create an empty table with the given columns.
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Get a cell by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }

    /// Push a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// Set every cell of a column to `value`, adding the column if needed.
    pub fn set_column(&mut self, name: &str, value: &str) {
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.to_string();
                }
            }
            None => {
                self.headers.push(name.to_string());
                for row in &mut self.rows {
                    row.push(value.to_string());
                }
            }
        }
    }

    /// Append another table below this one.
    ///
    /// Columns are unioned: unknown columns of `other` are added at the end
    /// in order of appearance, and cells a table has no column for are left
    /// empty.
    pub fn append(&mut self, other: ChartTable) {
        if self.headers.is_empty() && self.rows.is_empty() {
            *self = other;
            return;
        }

        let mapping: Vec<usize> = other
            .headers
            .iter()
            .map(|h| match self.column_index(h) {
                Some(idx) => idx,
                None => {
                    self.headers.push(h.clone());
                    self.headers.len() - 1
                }
            })
            .collect();

        let width = self.headers.len();
        for row in &mut self.rows {
            row.resize(width, String::new());
        }

        for row in other.rows {
            let mut merged = vec![String::new(); width];
            for (cell, &idx) in row.into_iter().zip(&mapping) {
                merged[idx] = cell;
            }
            self.rows.push(merged);
        }
    }

    /// Typed view of every row.
    pub fn entries(&self) -> Vec<ChartEntry> {
        let cols = EntryColumns::locate(&self.headers);
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| cols.entry(idx, row))
            .collect()
    }
}

/// Positions of the analysed columns within a header row.
#[derive(Debug, Clone, Copy, Default)]
struct EntryColumns {
    country: Option<usize>,
    track_name: Option<usize>,
    artist_names: Option<usize>,
    rank: Option<usize>,
    previous_rank: Option<usize>,
    peak_rank: Option<usize>,
    weeks_on_chart: Option<usize>,
    streams: Option<usize>,
}

impl EntryColumns {
    fn locate(headers: &[String]) -> Self {
        let find = |name: &str| headers.iter().position(|h| h == name);
        Self {
            country: find(columns::COUNTRY),
            track_name: find(columns::TRACK_NAME),
            artist_names: find(columns::ARTIST_NAMES),
            rank: find(columns::RANK),
            previous_rank: find(columns::PREVIOUS_RANK),
            peak_rank: find(columns::PEAK_RANK),
            weeks_on_chart: find(columns::WEEKS_ON_CHART),
            streams: find(columns::STREAMS),
        }
    }

    fn entry(&self, row_index: usize, row: &[String]) -> ChartEntry {
        let cell = move |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(String::as_str);
        let text = move |idx: Option<usize>| cell(idx).and_then(parse_text);
        let number = move |idx: Option<usize>| cell(idx).and_then(parse_number);

        ChartEntry {
            row: row_index,
            // An empty country code is still a group of its own.
            country: cell(self.country).map(str::to_string),
            track_name: text(self.track_name),
            artist_names: text(self.artist_names),
            rank: number(self.rank),
            previous_rank: number(self.previous_rank),
            peak_rank: number(self.peak_rank),
            weeks_on_chart: number(self.weeks_on_chart),
            streams: number(self.streams),
        }
    }
}

/// Typed view of one chart row.
///
/// Missing columns and empty cells are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartEntry {
    /// Index of the source row in its table.
    pub row: usize,
    /// Country code. Empty when the filename carried an empty code; `None`
    /// only without a country column.
    pub country: Option<String>,
    /// Track title.
    pub track_name: Option<String>,
    /// Artist names.
    pub artist_names: Option<String>,
    /// Current rank.
    pub rank: Option<f64>,
    /// Rank in the previous week.
    pub previous_rank: Option<f64>,
    /// Peak rank.
    pub peak_rank: Option<f64>,
    /// Weeks on chart.
    pub weeks_on_chart: Option<f64>,
    /// Weekly streams.
    pub streams: Option<f64>,
}

/// Grouping key: country, track and artists.
pub type TrackKey = (String, String, String);

impl ChartEntry {
    /// The `(country, track_name, artist_names)` key, if all parts are present.
    pub fn key(&self) -> Option<TrackKey> {
        Some((
            self.country.clone()?,
            self.track_name.clone()?,
            self.artist_names.clone()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> ChartTable {
        let mut t = ChartTable::new(headers.iter().copied());
        for row in rows {
            t.push_row(row.iter().map(|c| c.to_string()).collect());
        }
        t
    }

    #[test]
    fn test_set_column_adds_and_overwrites() {
        let mut t = table(&["rank", "country"], &[&["1", "xx"], &["2", "yy"]]);
        t.set_column("country", "AU");
        t.set_column("source", "spotify");

        assert_eq!(t.headers, vec!["rank", "country", "source"]);
        assert_eq!(t.get(0, "country"), Some("AU"));
        assert_eq!(t.get(1, "source"), Some("spotify"));
    }

    #[test]
    fn test_append_unions_columns() {
        let mut a = table(&["rank", "streams"], &[&["1", "100"]]);
        let b = table(&["streams", "uri"], &[&["200", "spotify:track:x"]]);
        a.append(b);

        assert_eq!(a.headers, vec!["rank", "streams", "uri"]);
        assert_eq!(a.rows[0], vec!["1", "100", ""]);
        assert_eq!(a.rows[1], vec!["", "200", "spotify:track:x"]);
    }

    #[test]
    fn test_append_into_empty_takes_other() {
        let mut a = ChartTable::default();
        a.append(table(&["rank"], &[&["3"]]));
        assert_eq!(a.headers, vec!["rank"]);
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_entries_parse_cells() {
        let t = table(
            &["country", "track_name", "artist_names", "rank", "streams"],
            &[&["KR", "Ditto", "NewJeans", "1", "1200000"], &["KR", "", "X", "", "n/a"]],
        );
        let entries = t.entries();

        assert_eq!(entries[0].rank, Some(1.0));
        assert_eq!(entries[0].streams, Some(1_200_000.0));
        assert_eq!(entries[0].peak_rank, None);
        assert!(entries[0].key().is_some());

        assert_eq!(entries[1].row, 1);
        assert_eq!(entries[1].track_name, None);
        assert_eq!(entries[1].streams, None);
        assert!(entries[1].key().is_none());
    }

    #[test]
    fn test_empty_country_is_a_key() {
        let mut t = table(&["track_name", "artist_names"], &[&["Ditto", "NewJeans"]]);
        t.set_column("country", "");
        let entries = t.entries();

        assert_eq!(entries[0].country.as_deref(), Some(""));
        assert_eq!(
            entries[0].key(),
            Some(("".to_string(), "Ditto".to_string(), "NewJeans".to_string()))
        );
    }
}
