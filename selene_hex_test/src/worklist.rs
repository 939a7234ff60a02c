//! Worklist input and results output.
//!
//! The worklist is a CSV file without header holding one `x,z` pair per
//! line; `#` starts a comment line. The results file repeats the positions
//! with the outcome of each entry:
//!
//! ```text
//! x,z,range,status
//! 10,5,181.5,ok
//! 20,5,FAIL,fail:collision
//! 30,5,,not-selected
//! ```

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use selene_motion::sequencer::{ResultsError, ResultsSink, ResultsTable, WorklistEntry};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const RESULTS_HEADER: [&str; 4] = ["x", "z", "range", "status"];

#[derive(Debug, Error)]
pub enum WorklistError {
    #[error("Failed to read worklist: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed worklist: {0}")]
    Csv(#[from] csv::Error),

    #[error("Worklist line {line}: {message}")]
    Invalid { line: u64, message: String },

    #[error("Worklist holds no positions")]
    Empty,
}

/// Read the worklist at `path`.
pub fn read_worklist(path: &Path) -> Result<ResultsTable, WorklistError> {
    let table = parse_worklist(File::open(path)?)?;
    info!(path = %path.display(), entries = table.len(), "Worklist read");
    Ok(table)
}

/// Parse worklist CSV. Every entry starts out pending.
pub fn parse_worklist<R: Read>(reader: R) -> Result<ResultsTable, WorklistError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut entries = Vec::new();
    for record in reader.records() {
        entries.push(parse_entry(&record?)?);
    }
    if entries.is_empty() {
        return Err(WorklistError::Empty);
    }
    Ok(ResultsTable::new(entries))
}

fn parse_entry(record: &StringRecord) -> Result<WorklistEntry, WorklistError> {
    let line = record.position().map_or(0, |p| p.line());
    if record.len() != 2 {
        return Err(WorklistError::Invalid {
            line,
            message: format!("expected 2 columns (x, z), found {}", record.len()),
        });
    }
    let coordinate = |column: usize, name: &str| {
        let field = &record[column];
        field
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| WorklistError::Invalid {
                line,
                message: format!("{name} '{field}' is not a number"),
            })
    };
    Ok(WorklistEntry::new(coordinate(0, "x")?, coordinate(1, "z")?))
}

/// Write `table` to `path`, replacing the file atomically.
///
/// The rows go to a sibling temporary file first, which is then renamed
/// over `path`. A crash mid-write leaves the previous results intact.
pub fn write_results(path: &Path, table: &ResultsTable) -> Result<(), ResultsError> {
    let temporary = temporary_path(path);
    {
        let mut writer = WriterBuilder::new().from_path(&temporary).map_err(csv_error)?;
        writer.write_record(RESULTS_HEADER).map_err(csv_error)?;
        for entry in table.entries() {
            writer
                .write_record([
                    entry.x.to_string(),
                    entry.z.to_string(),
                    entry.result.range_cell(),
                    entry.result.status_cell(),
                ])
                .map_err(csv_error)?;
        }
        writer.flush()?;
    }
    fs::rename(&temporary, path)?;
    debug!(path = %path.display(), rows = table.len(), "Results written");
    Ok(())
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or(path.as_os_str()));
    name.push(".tmp");
    path.with_file_name(name)
}

fn csv_error(e: csv::Error) -> ResultsError {
    match e.into_kind() {
        csv::ErrorKind::Io(e) => ResultsError::Io(e),
        other => ResultsError::Format(format!("{other:?}")),
    }
}

/// Keeps the results CSV current after every entry.
#[derive(Debug, Clone)]
pub struct CsvResultsSink {
    path: PathBuf,
}

impl CsvResultsSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultsSink for CsvResultsSink {
    fn persist(&mut self, table: &ResultsTable) -> Result<(), ResultsError> {
        write_results(&self.path, table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selene_motion::error::FailureKind;
    use selene_motion::sequencer::EntryResult;

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let table = parse_worklist(
            "# x, z\n10, 5\n\n  20.5 ,-1\n# bottom\n30,5\n".as_bytes(),
        )
        .unwrap();
        let positions: Vec<_> = table.entries().iter().map(|e| (e.x, e.z)).collect();
        assert_eq!(positions, vec![(10.0, 5.0), (20.5, -1.0), (30.0, 5.0)]);
        assert!(table.entries().iter().all(|e| e.result == EntryResult::Pending));
    }

    #[test]
    fn malformed_rows_name_their_line() {
        let err = parse_worklist("10,5\n20\n".as_bytes()).unwrap_err();
        assert!(matches!(err, WorklistError::Invalid { line: 2, .. }));

        let err = parse_worklist("10,5\n20,abc\n".as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "Worklist line 2: z 'abc' is not a number");

        let err = parse_worklist("nan,5\n".as_bytes()).unwrap_err();
        assert!(matches!(err, WorklistError::Invalid { line: 1, .. }));
    }

    #[test]
    fn empty_worklist_is_refused() {
        assert!(matches!(
            parse_worklist("# nothing\n\n".as_bytes()),
            Err(WorklistError::Empty)
        ));
    }

    #[test]
    fn results_are_replaced_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let mut table = ResultsTable::from_positions([(10.0, 5.0), (20.0, 5.0), (30.0, 5.0)]);
        let mut sink = CsvResultsSink::new(&path);

        sink.persist(&table).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "x,z,range,status\n10,5,,pending\n20,5,,pending\n30,5,,pending\n"
        );

        table.set_result(0, EntryResult::Range(181.5));
        table.set_result(1, EntryResult::Failed(FailureKind::CollisionRetriesExhausted));
        table.set_result(2, EntryResult::NotSelected);
        sink.persist(&table).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "x,z,range,status\n10,5,181.5,ok\n20,5,FAIL,fail:collision\n30,5,,not-selected\n"
        );

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![OsString::from("results.csv")]);
    }

    #[test]
    fn unwritable_location_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("results.csv");
        let table = ResultsTable::from_positions([(1.0, 2.0)]);
        assert!(matches!(
            write_results(&path, &table),
            Err(ResultsError::Io(_))
        ));
    }
}
