//! CSV record store: translate between the on-disk tabular format and
//! in-memory [`Collection`]s, preserving column order and columns the
//! engine does not understand.
//!
//! Writes are atomic: the new content is staged in a temp file next to
//! the destination and renamed into place, so a failed save leaves the
//! previous bytes untouched.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::record::{Collection, Record, Schema};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("source not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed source {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Parse `path` as header + rows. The header row defines the schema;
/// every row must match its width exactly (ragged rows are a format
/// error, never a silently adopted shape).
pub fn load(path: &Path) -> Result<Collection, StoreError> {
    let raw = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            StoreError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    if raw.trim().is_empty() {
        return Err(StoreError::Format {
            path: path.to_path_buf(),
            reason: "empty source (missing header row)".to_string(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(false)
        .from_reader(raw.as_bytes());

    let headers = reader
        .headers()
        .map_err(|err| StoreError::Format {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?
        .clone();
    let schema = Schema::new(headers.iter().map(ToString::to_string).collect());

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|err| StoreError::Format {
            path: path.to_path_buf(),
            // +2: one for the header line, one for 1-based numbering
            reason: format!("line {}: {err}", index + 2),
        })?;
        records.push(Record::new(row.iter().map(ToString::to_string).collect()));
    }

    tracing::debug!(
        path = %path.display(),
        columns = schema.len(),
        records = records.len(),
        "loaded record collection"
    );

    Ok(Collection::new(schema, records))
}

/// Write header + rows in schema order, replacing `path` atomically.
/// On error the previous file content and the in-memory collection are
/// both unaffected, so the caller may retry.
///
/// Every row is re-emitted in canonical CSV form: fields are quoted
/// only when they need to be and rows end in `\n`. A source carrying
/// superfluous quotes or CRLF line endings is normalized the first
/// time a save touches it; byte-for-byte round-trips hold only for
/// sources already in canonical form.
pub fn save(path: &Path, collection: &Collection) -> Result<(), StoreError> {
    let write_err = |source: io::Error| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let staged = NamedTempFile::new_in(parent).map_err(write_err)?;
    {
        let mut writer = csv::Writer::from_writer(staged.as_file());
        writer
            .write_record(collection.schema().columns())
            .map_err(|err| write_err(io::Error::other(err)))?;
        for record in collection.records() {
            writer
                .write_record(record.values())
                .map_err(|err| write_err(io::Error::other(err)))?;
        }
        writer.flush().map_err(write_err)?;
    }

    staged.persist(path).map_err(|err| write_err(err.error))?;

    tracing::debug!(
        path = %path.display(),
        records = collection.len(),
        "persisted record collection"
    );

    Ok(())
}
