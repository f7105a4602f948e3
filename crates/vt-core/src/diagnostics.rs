//! Non-fatal conditions collected while loading a snapshot

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which index of a [`crate::TagStore`] a key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyIndex {
    /// Export row key (e.g. "ID")
    Id,
    /// Tag name (e.g. "TAG")
    Name,
}

impl fmt::Display for KeyIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyIndex::Id => write!(f, "id"),
            KeyIndex::Name => write!(f, "name"),
        }
    }
}

/// A condition that was resolved leniently and returned alongside a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// A key appeared more than once; the later row replaced the earlier one
    DuplicateKey {
        index: KeyIndex,
        key: String,
        /// Zero-based position of the replacing row
        row: usize,
    },
    /// A row has no value for an indexed column and is not reachable by it
    MissingKey { index: KeyIndex, row: usize },
    /// A row had more fields than the header; the extras were dropped
    TruncatedRow {
        row: usize,
        fields: usize,
        columns: usize,
    },
    /// An export table without the configured id or name column
    SkippedTable { table: String, reason: String },
    /// A page block without a recognizable name header
    SkippedBlock { block: usize, reason: String },
    /// A page name appeared more than once; the later block replaced the earlier one
    DuplicatePage { name: String },
    /// A value dump line that does not have id, property and value fields
    SkippedLine { line: usize, reason: String },
    /// A value dump line referring to an id that the tag store does not know
    UnknownTag { line: usize, id: String },
    /// A composite id whose first component was empty, kept as the raw string
    DefaultedId { line: usize, raw: String },
}

impl Diagnostic {
    /// Check if this is a duplicate key in the given index
    pub fn is_duplicate_key(&self, which: KeyIndex) -> bool {
        matches!(self, Diagnostic::DuplicateKey { index, .. } if *index == which)
    }

    /// Check if this is a skipped page block
    pub fn is_skipped_block(&self) -> bool {
        matches!(self, Diagnostic::SkippedBlock { .. })
    }

    /// Emit this diagnostic as a warning event
    pub(crate) fn warn(&self) {
        tracing::warn!("{}", self);
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DuplicateKey { index, key, row } => {
                write!(f, "duplicate {} key '{}' at row {}, keeping the later row", index, key, row + 1)
            }
            Diagnostic::MissingKey { index, row } => {
                write!(f, "row {} has no {} key, not indexed", row + 1, index)
            }
            Diagnostic::TruncatedRow { row, fields, columns } => write!(
                f,
                "row {} has {} fields but only {} columns, truncating",
                row + 1,
                fields,
                columns
            ),
            Diagnostic::SkippedTable { table, reason } => {
                write!(f, "skipped table '{}': {}", table, reason)
            }
            Diagnostic::SkippedBlock { block, reason } => {
                write!(f, "skipped page block {}: {}", block + 1, reason)
            }
            Diagnostic::DuplicatePage { name } => {
                write!(f, "duplicate page '{}', keeping the later block", name)
            }
            Diagnostic::SkippedLine { line, reason } => {
                write!(f, "skipped value line {}: {}", line + 1, reason)
            }
            Diagnostic::UnknownTag { line, id } => {
                write!(f, "value line {} refers to unknown tag '{}'", line + 1, id)
            }
            Diagnostic::DefaultedId { line, raw } => {
                write!(f, "value line {} has unparseable id '{}', using it verbatim", line + 1, raw)
            }
        }
    }
}
