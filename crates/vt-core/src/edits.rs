//! Tag updates and import file export
//!
//! This module provides:
//! - Update sets (JSON) describing changed attribute values per tag
//! - Applying updates to a tag store, producing a new store
//! - Preparing rows to be imported as new tags
//! - Writing a store back out as a CSV import file

use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};
use crate::record::AttributeRecord;
use crate::store::TagStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// New attribute values for one existing tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagUpdate {
    /// Export key of the tag to change
    pub id: String,
    /// Columns to change; empty values leave the column untouched
    pub values: AttributeRecord,
}

impl TagUpdate {
    /// Create a new update
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: AttributeRecord::new(),
        }
    }

    /// Add a column value to the update
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.set(column, value);
        self
    }
}

/// A set of updates for one tag table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateSet {
    /// Table the updates apply to
    pub table: String,
    /// List of updates
    pub updates: Vec<TagUpdate>,
}

impl UpdateSet {
    /// Create a new empty update set
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            updates: Vec::new(),
        }
    }

    /// Add an update to the set
    pub fn add_update(&mut self, update: TagUpdate) {
        self.updates.push(update);
    }

    /// Load an update set from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::SourceUnavailable {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the update set to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Result of applying an update set
#[derive(Debug, Clone)]
pub struct UpdateResult {
    /// The store with all successful updates applied
    pub store: TagStore,
    /// Number of updates applied
    pub applied: usize,
    /// Updates that failed (tag not found, column not found)
    pub failed: Vec<(TagUpdate, String)>,
    /// Diagnostics from re-indexing the updated store
    pub diagnostics: Vec<Diagnostic>,
}

/// Apply updates to a store without modifying it
///
/// Each update changes only its non-empty values and never the export key.
/// An update naming an unknown tag or column is rejected as a whole.
pub fn apply_updates(store: &TagStore, updates: &UpdateSet) -> UpdateResult {
    let mut records: Vec<AttributeRecord> = store.all().cloned().collect();
    let mut applied = 0;
    let mut failed = Vec::new();

    for update in &updates.updates {
        let row_idx = match store.position_of_id(&update.id) {
            Some(idx) => idx,
            None => {
                failed.push((update.clone(), format!("Tag ID {} not found", update.id)));
                continue;
            }
        };

        let changes: Vec<(&str, &str)> = update
            .values
            .items()
            .filter(|(column, value)| *column != store.id_column() && !value.trim().is_empty())
            .collect();

        if let Some((column, _)) = changes.iter().find(|(column, _)| !store.has_column(column)) {
            failed.push((update.clone(), format!("Column '{}' not found", column)));
            continue;
        }

        let record = &mut records[row_idx];
        for (column, value) in changes {
            record.set(column, value);
        }
        applied += 1;
    }

    let header: Vec<String> = store.columns().into_iter().map(str::to_string).collect();
    let (store, diagnostics) =
        TagStore::load_with_header(&header, records, store.id_column(), store.name_column());

    tracing::debug!(applied, failed = failed.len(), table = %updates.table, "applied tag updates");

    UpdateResult {
        store,
        applied,
        failed,
        diagnostics,
    }
}

/// Blank the export key columns so the rows import as new tags
pub fn prepare_new_tags<I>(records: I, clear_columns: &[&str]) -> Vec<AttributeRecord>
where
    I: IntoIterator<Item = AttributeRecord>,
{
    records
        .into_iter()
        .map(|mut record| {
            for column in clear_columns {
                if record.contains(column) {
                    record.set(*column, "");
                }
            }
            record
        })
        .collect()
}

/// Render a store as CSV import text, header first, in column order
pub fn to_import_csv(store: &TagStore) -> Result<String> {
    let columns = store.columns();
    let mut writer = csv::Writer::from_writer(Vec::new());

    let csv_error = |e: csv::Error| Error::Csv {
        source_name: "import".to_string(),
        source: e,
    };

    writer.write_record(&columns).map_err(csv_error)?;
    for record in store.all() {
        writer
            .write_record(columns.iter().map(|c| record.get_or(c, "")))
            .map_err(csv_error)?;
    }

    let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| Error::malformed("import", e.to_string()))
}

/// Write a store to a CSV import file
pub fn write_import_csv<P: AsRef<Path>>(store: &TagStore, path: P) -> Result<()> {
    fs::write(path, to_import_csv(store)?)?;
    Ok(())
}
