//! In-memory record model: an ordered collection of rows sharing one
//! column schema, plus the mapping from logical fields to columns.
//!
//! The engine only understands four logical fields (id, title,
//! description, remote ticket id); every other column is carried
//! through load → reconcile → save untouched.

use serde::{Deserialize, Serialize};

/// Column names in source order, captured once at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    #[must_use]
    pub const fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of `name` in the header, if present.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One row. Field values are positional; meaning comes from the
/// collection's [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    values: Vec<String>,
}

impl Record {
    #[must_use]
    pub const fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn set(&mut self, index: usize, value: String) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }

    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// An ordered set of records sharing one schema, loaded and saved as a
/// unit. The store guarantees every record has exactly `schema.len()`
/// values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    schema: Schema,
    records: Vec<Record>,
}

impl Collection {
    #[must_use]
    pub const fn new(schema: Schema, records: Vec<Record>) -> Self {
        Self { schema, records }
    }

    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Logical-field → column-name mapping, configurable per project so the
/// engine works against any header vocabulary (`EpicID`, `SubtaskID`,
/// plain `ID`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    #[serde(default = "default_id_column")]
    pub id: String,
    #[serde(default = "default_title_column")]
    pub title: String,
    #[serde(default = "default_description_column")]
    pub description: String,
    #[serde(default = "default_remote_id_column")]
    pub remote_id: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            id: default_id_column(),
            title: default_title_column(),
            description: default_description_column(),
            remote_id: default_remote_id_column(),
        }
    }
}

fn default_id_column() -> String {
    "ID".to_string()
}

fn default_title_column() -> String {
    "Title".to_string()
}

fn default_description_column() -> String {
    "Description".to_string()
}

fn default_remote_id_column() -> String {
    "TicketID".to_string()
}

/// Column indices after validating a [`FieldMap`] against a schema.
/// Only the description column is optional; a schema missing any of
/// the other three cannot be reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFields {
    pub id: usize,
    pub title: usize,
    pub description: Option<usize>,
    pub remote_id: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldMapError {
    #[error("required column '{name}' is missing from the header")]
    MissingColumn { name: String },
}

impl FieldMap {
    /// Resolve column names to indices, failing fast on a header that
    /// lacks the id, title, or remote-id column.
    pub fn resolve(&self, schema: &Schema) -> Result<ResolvedFields, FieldMapError> {
        let require = |name: &str| {
            schema
                .index_of(name)
                .ok_or_else(|| FieldMapError::MissingColumn {
                    name: name.to_string(),
                })
        };

        Ok(ResolvedFields {
            id: require(&self.id)?,
            title: require(&self.title)?,
            description: schema.index_of(&self.description),
            remote_id: require(&self.remote_id)?,
        })
    }
}
