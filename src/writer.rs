//! CSV output.
//!
//! Every file starts with a UTF-8 byte-order mark so spreadsheet tools
//! pick the right encoding for non-Latin track names.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::WriterBuilder;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::models::ChartTable;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn open_with_bom(path: &Path) -> Result<BufWriter<File>> {
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(UTF8_BOM)?;
    Ok(out)
}

/// Write a string table, header row first.
pub fn write_table<P: AsRef<Path>>(path: P, table: &ChartTable) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(open_with_bom(path)?);

    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    debug!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

/// Write serializable rows; the header row comes from the field names.
///
/// `headers` is written when `rows` is empty, since serde cannot infer it.
pub fn write_rows<P: AsRef<Path>, T: Serialize>(
    path: P,
    headers: &[&str],
    rows: &[T],
) -> Result<()> {
    let path = path.as_ref();
    let out = open_with_bom(path)?;

    if rows.is_empty() {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
        writer.write_record(headers)?;
        writer.flush()?;
    } else {
        let mut writer = WriterBuilder::new().has_headers(true).from_writer(out);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }

    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TopTrack;
    use std::fs;

    #[test]
    fn test_write_table_has_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let mut table = ChartTable::new(["track_name", "country"]);
        table.push_row(vec!["Hype Boy".into(), "KR".into()]);

        write_table(&path, &table).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        assert_eq!(&bytes[3..], b"track_name,country\nHype Boy,KR\n");
    }

    #[test]
    fn test_write_rows_formats_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("top.csv");
        let rows = vec![TopTrack {
            country: "AU".into(),
            track_name: "Flowers".into(),
            artist_names: "Miley Cyrus".into(),
            total_streams: 1500.0,
            peak_rank: Some(1.0),
            avg_streams: Some(750.5),
        }];

        write_rows(&path, &[], &rows).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.trim_start_matches('\u{feff}'),
            "country,track_name,artist_names,total_streams,peak_rank,avg_streams\n\
             AU,Flowers,Miley Cyrus,1500,1,750.5\n"
        );
    }

    #[test]
    fn test_write_rows_empty_writes_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_rows::<_, TopTrack>(&path, &["country", "total_streams"], &[]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_start_matches('\u{feff}'), "country,total_streams\n");
    }
}
