use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::error::IngestError;

/// Rows read and skipped from one input file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSummary {
    pub file: String,
    pub loaded: usize,
    pub skipped: usize,
}

pub(crate) struct Row<T> {
    pub line: u64,
    /// Whether this is the first non-blank row, which may be a header.
    pub first: bool,
    pub data: T,
}

pub(crate) enum RowOutcome {
    Loaded,
    Skipped,
    /// A header row, not counted.
    Ignored,
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(str::is_empty)
}

fn is_numeric(field: &str) -> bool {
    field.parse::<i64>().is_ok()
}

/// Whether a first row that failed to parse is a header. Column names are
/// never numbers, and each column must differ from the row below it: a
/// number under a name, or a name of another length.
fn looks_like_header(first: &StringRecord, next: Option<&StringRecord>) -> bool {
    if first.iter().any(is_numeric) {
        return false;
    }
    let Some(next) = next else {
        return true;
    };
    let votes: i64 = first
        .iter()
        .zip(next.iter())
        .map(|(name, value)| {
            if is_numeric(value) || name.len() != value.len() {
                1
            } else {
                -1
            }
        })
        .sum();
    votes > 0
}

fn count_newlines(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b == b'\n').count()
}

/// 1-based line on which the record starting at `byte` begins. The reader
/// reports the offset before any empty lines it skipped.
fn physical_line(contents: &[u8], byte: u64) -> u64 {
    let byte = usize::try_from(byte).map_or(contents.len(), |byte| byte.min(contents.len()));
    let (before, after) = contents.split_at(byte);
    let empty = after.iter().take_while(|&&b| b == b'\n' || b == b'\r').count();
    (1 + count_newlines(before) + count_newlines(&after[..empty])) as u64
}

fn reason(err: &csv::Error) -> String {
    match err.kind() {
        csv::ErrorKind::Deserialize { err, .. } => err.to_string(),
        _ => err.to_string(),
    }
}

/// Feeds every data row of a comma separated file to `handle`.
///
/// A first row that does not parse and looks like a header is dropped.
/// Any other row that does not parse aborts the file.
pub(crate) fn read_rows<T, F>(path: &Path, mut handle: F) -> Result<FileSummary, IngestError>
where
    T: DeserializeOwned,
    F: FnMut(Row<T>) -> Result<RowOutcome, IngestError>,
{
    if !path.is_file() {
        return Err(IngestError::MissingFile(path.to_path_buf()));
    }
    let contents = fs::read(path).map_err(|source| IngestError::Io {
        file: path.to_path_buf(),
        source,
    })?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(contents.as_slice());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| IngestError::Read {
            file: path.to_path_buf(),
            source,
        })?;
        if !is_blank(&record) {
            let line = record
                .position()
                .map_or(0, |position| physical_line(&contents, position.byte()));
            records.push((line, record));
        }
    }

    let mut summary = FileSummary {
        file: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        ..FileSummary::default()
    };
    for (index, (line, record)) in records.iter().enumerate() {
        let (line, first) = (*line, index == 0);
        let data = match record.deserialize::<T>(None) {
            Ok(data) => data,
            Err(_) if first && looks_like_header(record, records.get(1).map(|(_, next)| next)) => {
                debug!(file = %path.display(), line, "skipping header");
                continue;
            }
            Err(err) => {
                let reason = reason(&err);
                error!(file = %path.display(), line, %reason, "malformed row");
                return Err(IngestError::Malformed {
                    file: path.to_path_buf(),
                    line,
                    reason,
                });
            }
        };
        match handle(Row { line, first, data })? {
            RowOutcome::Loaded => summary.loaded += 1,
            RowOutcome::Skipped => summary.skipped += 1,
            RowOutcome::Ignored => {}
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use csv::StringRecord;
    use serde::Deserialize;

    use super::{looks_like_header, read_rows, RowOutcome};
    use crate::error::IngestError;

    #[derive(Deserialize)]
    struct Pair(String, u32);

    #[derive(Deserialize)]
    struct BidRow(u64, String, u64);

    #[test]
    fn header_and_blank_rows_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.txt");
        fs::write(&path, "name, count\n\n a , 1\n   \nb,2\n").unwrap();
        let mut seen = Vec::new();
        let summary = read_rows(&path, |row: super::Row<Pair>| {
            seen.push((row.line, row.data.0, row.data.1));
            Ok(RowOutcome::Loaded)
        })
        .unwrap();
        assert_eq!(seen, [(3, "a".to_owned(), 1), (5, "b".to_owned(), 2)]);
        assert_eq!(summary.loaded, 2);
        assert_eq!(summary.file, "pairs.txt");
    }

    #[test]
    fn later_bad_row_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.txt");
        fs::write(&path, "a,1\nb,two\nc,3\n").unwrap();
        let err = read_rows(&path, |_: super::Row<Pair>| Ok(RowOutcome::Loaded)).unwrap_err();
        assert!(matches!(err, IngestError::Malformed { line: 2, .. }));
    }

    #[test]
    fn first_row_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.txt");
        fs::write(&path, "a,1\nb,2\n").unwrap();
        let mut flags = Vec::new();
        read_rows(&path, |row: super::Row<Pair>| {
            flags.push(row.first);
            Ok(RowOutcome::Skipped)
        })
        .unwrap();
        assert_eq!(flags, [true, false]);
    }

    #[test]
    fn lines_count_skipped_empty_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.txt");
        fs::write(&path, "a,1\n\nb,two\n").unwrap();
        let err = read_rows(&path, |_: super::Row<Pair>| Ok(RowOutcome::Loaded)).unwrap_err();
        assert!(matches!(err, IngestError::Malformed { line: 3, .. }));

        fs::write(&path, "a,1\r\n\r\n\r\nb,2\r\n").unwrap();
        let mut lines = Vec::new();
        read_rows(&path, |row: super::Row<Pair>| {
            lines.push(row.line);
            Ok(RowOutcome::Loaded)
        })
        .unwrap();
        assert_eq!(lines, [1, 4]);
    }

    #[test]
    fn bad_first_row_of_data_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.txt");
        fs::write(&path, "a,lots\nb,2\n").unwrap();
        let err = read_rows(&path, |_: super::Row<Pair>| Ok(RowOutcome::Loaded)).unwrap_err();
        assert!(matches!(err, IngestError::Malformed { line: 1, .. }));

        fs::write(&path, "1, 101, lots\n2, 101, 5\n").unwrap();
        let err = read_rows(&path, |_: super::Row<BidRow>| Ok(RowOutcome::Loaded)).unwrap_err();
        assert!(matches!(err, IngestError::Malformed { line: 1, .. }));
    }

    #[test]
    fn header_detection() {
        let record = |fields: &[&str]| StringRecord::from(fields.to_vec());
        let header = record(&["hasherId", "trailId", "value"]);
        assert!(looks_like_header(&header, Some(&record(&["1", "101", "30"]))));
        assert!(looks_like_header(&header, None));
        assert!(!looks_like_header(&record(&["1", "101", "lots"]), None));
        assert!(!looks_like_header(&record(&["a", "lots"]), Some(&record(&["b", "2"]))));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");
        let err = read_rows(&path, |_: super::Row<Pair>| Ok(RowOutcome::Loaded)).unwrap_err();
        assert!(matches!(err, IngestError::MissingFile(_)));
    }
}
