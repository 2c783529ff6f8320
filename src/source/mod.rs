//! Streaming reader for the tabular recipe export.
//!
//! Rows are deserialized one at a time, so only the prefix the caller asks
//! for is ever held in memory.

pub mod fields;

pub use fields::{extract_literals, ExtractedFields};

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Columns every source file must provide
pub const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "name",
    "minutes",
    "tags",
    "steps",
    "ingredients",
    "description",
];

/// One row of the source file.
///
/// `tags`, `steps` and `ingredients` still hold their quoted-literal list
/// encoding; see [`fields::extract_literals`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawRecord {
    pub id: String,
    pub name: String,
    pub minutes: String,
    pub tags: String,
    pub steps: String,
    pub ingredients: String,
    pub description: String,
}

/// Lazy reader over the rows of a delimited recipe file
pub struct RecordReader {
    reader: csv::Reader<File>,
}

impl RecordReader {
    /// Open a source file and check its header row.
    ///
    /// Header names are trimmed, so ` tags` and `tags` name the same column.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_path(path)
            .map_err(|e| Error::SourceRead(format!("Failed to open {}: {e}", path.display())))?;

        let headers = reader
            .headers()
            .map_err(|e| Error::SourceRead(format!("Failed to read header row: {e}")))?;

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|h| h == *column))
            .collect();

        if !missing.is_empty() {
            return Err(Error::SourceRead(format!(
                "{} is missing required columns: {}",
                path.display(),
                missing.join(", ")
            )));
        }

        debug!("Opened recipe source {}", path.display());

        Ok(Self { reader })
    }

    /// Iterate rows in file order. A malformed row yields `Error::SourceRead`
    /// and iteration continues with the next row.
    pub fn records(self) -> impl Iterator<Item = Result<RawRecord>> {
        self.reader
            .into_deserialize::<RawRecord>()
            .map(|row| row.map_err(row_error))
    }
}

fn row_error(e: csv::Error) -> Error {
    match e.position() {
        Some(pos) => Error::SourceRead(format!("Malformed row at line {}: {e}", pos.line())),
        None => Error::SourceRead(format!("Malformed row: {e}")),
    }
}

/// Read at most `limit` rows from the start of `path`.
///
/// The file is read on the blocking pool. Opening failures are returned as
/// the outer error; per-row failures are kept in place so callers can report
/// them without losing the rest of the prefix.
pub async fn read_prefix(path: impl AsRef<Path>, limit: usize) -> Result<Vec<Result<RawRecord>>> {
    let path = path.as_ref().to_path_buf();

    let rows = tokio::task::spawn_blocking(move || -> Result<Vec<Result<RawRecord>>> {
        let reader = RecordReader::open(&path)?;
        Ok(reader.records().take(limit).collect())
    })
    .await
    .map_err(|e| Error::Internal(format!("Source reader task failed: {e}")))??;

    info!("Read {} rows from recipe source (limit {})", rows.len(), limit);

    Ok(rows)
}
