//! Indexes built from the plain-text page and value dumps

use crate::diagnostics::Diagnostic;
use crate::record::AttributeRecord;
use crate::resolver::IdentifierMapping;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Page name -> full raw text of the page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageContentIndex {
    /// Pages keyed by name. Using BTreeMap for deterministic ordering
    pub pages: BTreeMap<String, String>,
    /// Blocks that were skipped or replaced while parsing
    pub diagnostics: Vec<Diagnostic>,
}

impl PageContentIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the text of a page by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pages.get(name).map(|s| s.as_str())
    }

    /// Get the number of pages
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Check if no pages were found
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Get all page names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.pages.keys().map(|s| s.as_str())
    }

    /// Number of blocks skipped because they had no name header
    pub fn skipped_blocks(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_skipped_block()).count()
    }

    /// Insert a page; a repeated name replaces the earlier text (last-write-wins)
    pub(crate) fn insert(&mut self, name: String, body: String) {
        if self.pages.insert(name.clone(), body).is_some() {
            self.push_diagnostic(Diagnostic::DuplicatePage { name });
        }
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        diagnostic.warn();
        self.diagnostics.push(diagnostic);
    }
}

/// Resolved tag id -> {property name -> current value text}
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagValueIndex {
    /// Property records keyed by canonical tag id
    pub values: BTreeMap<String, AttributeRecord>,
    /// Every composite group member seen for each canonical id, in first-seen order
    pub groups: BTreeMap<String, Vec<String>>,
    /// Lines that were skipped or could not be matched
    pub diagnostics: Vec<Diagnostic>,
}

impl TagValueIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all properties recorded for a tag
    pub fn get(&self, id: &str) -> Option<&AttributeRecord> {
        self.values.get(id)
    }

    /// Get one property value for a tag
    pub fn property(&self, id: &str, name: &str) -> Option<&str> {
        self.values.get(id).and_then(|r| r.get(name))
    }

    /// Get the full composite group recorded for a tag
    pub fn members(&self, id: &str) -> &[String] {
        self.groups.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Iterate over (id, properties) in id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeRecord)> + '_ {
        self.values.iter().map(|(id, record)| (id.as_str(), record))
    }

    /// Get the number of tags with values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no values were recorded
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Record a property value; later lines overwrite earlier ones (last-write-wins)
    pub(crate) fn accumulate(&mut self, mapping: &IdentifierMapping<'_>, property: &str, value: &str) {
        let canonical = mapping.canonical.to_string();

        let group = self.groups.entry(canonical.clone()).or_default();
        for member in &mapping.members {
            if !group.iter().any(|m| m == member) {
                group.push(member.to_string());
            }
        }

        self.values
            .entry(canonical)
            .or_default()
            .set(property, value);
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        diagnostic.warn();
        self.diagnostics.push(diagnostic);
    }
}
