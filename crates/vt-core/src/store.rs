//! Tag store: every tag row of one export table, indexed by key and by name

use crate::diagnostics::{Diagnostic, KeyIndex};
use crate::record::AttributeRecord;
use crate::resolver::short_name;
use std::collections::HashMap;

/// The tag definitions loaded from one table of a relational export
///
/// Records are owned in export order; both indexes map a key to a position in
/// that list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagStore {
    records: Vec<AttributeRecord>,
    columns: Vec<String>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    id_column: String,
    name_column: String,
}

impl TagStore {
    /// Build a store and its indexes in a single pass
    ///
    /// Duplicate keys are last-write-wins; every duplicate beyond the first
    /// occurrence produces one diagnostic for the index it collided in.
    pub fn load<I>(records: I, id_column: &str, name_column: &str) -> (TagStore, Vec<Diagnostic>)
    where
        I: IntoIterator<Item = AttributeRecord>,
    {
        Self::load_with_header(&[], records, id_column, name_column)
    }

    /// Like [`TagStore::load`], with the table's header as the leading columns
    ///
    /// Columns of short rows stay known to the store even when no record
    /// carries them.
    pub fn load_with_header<I>(
        header: &[String],
        records: I,
        id_column: &str,
        name_column: &str,
    ) -> (TagStore, Vec<Diagnostic>)
    where
        I: IntoIterator<Item = AttributeRecord>,
    {
        let mut store = TagStore {
            columns: header.to_vec(),
            id_column: id_column.to_string(),
            name_column: name_column.to_string(),
            ..Default::default()
        };
        let mut diagnostics = Vec::new();

        for (row, record) in records.into_iter().enumerate() {
            index_key(&mut store.by_id, KeyIndex::Id, record.get(id_column), row, &mut diagnostics);
            index_key(
                &mut store.by_name,
                KeyIndex::Name,
                record.get(name_column),
                row,
                &mut diagnostics,
            );
            for name in record.keys() {
                if !store.columns.iter().any(|c| c == name) {
                    store.columns.push(name.to_string());
                }
            }
            store.records.push(record);
        }

        tracing::debug!(
            records = store.records.len(),
            ids = store.by_id.len(),
            names = store.by_name.len(),
            diagnostics = diagnostics.len(),
            "loaded tag store"
        );

        (store, diagnostics)
    }

    /// Find a tag by export key
    pub fn get_by_id(&self, id: &str) -> Option<&AttributeRecord> {
        self.by_id.get(id).map(|&i| &self.records[i])
    }

    /// Find a tag by its full name
    pub fn get_by_name(&self, name: &str) -> Option<&AttributeRecord> {
        self.by_name.get(name).map(|&i| &self.records[i])
    }

    /// Find the first tag whose last name segment equals that of `name`
    ///
    /// Lets "Pumps\\P_101" and "P_101" find "Plant\\Pumps\\P_101".
    pub fn find_by_short_name(&self, name: &str) -> Option<&AttributeRecord> {
        let wanted = short_name(name);
        if wanted.is_empty() {
            return None;
        }
        self.records
            .iter()
            .find(|r| r.get(&self.name_column).map(short_name) == Some(wanted))
    }

    /// All records in export order
    pub fn all(&self) -> impl Iterator<Item = &AttributeRecord> + '_ {
        self.records.iter()
    }

    /// Records matching a predicate, lazily and in export order
    pub fn filter<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a AttributeRecord> + 'a
    where
        P: FnMut(&&'a AttributeRecord) -> bool + 'a,
    {
        self.records.iter().filter(predicate)
    }

    /// Get the number of records (including ones shadowed by a duplicate key)
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Header columns, then any other column names in first-seen order
    pub fn columns(&self) -> Vec<&str> {
        self.columns.iter().map(String::as_str).collect()
    }

    /// Check if the table has a column, even if no record carries a value for it
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Position of the record indexed under an export key
    pub(crate) fn position_of_id(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// The column used as export key
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// The column used as tag name
    pub fn name_column(&self) -> &str {
        &self.name_column
    }
}

fn index_key(
    index: &mut HashMap<String, usize>,
    which: KeyIndex,
    key: Option<&str>,
    row: usize,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let diagnostic = match key.filter(|k| !k.trim().is_empty()) {
        Some(key) => match index.insert(key.to_string(), row) {
            Some(_) => Diagnostic::DuplicateKey {
                index: which,
                key: key.to_string(),
                row,
            },
            None => return,
        },
        None => Diagnostic::MissingKey { index: which, row },
    };
    diagnostic.warn();
    diagnostics.push(diagnostic);
}
