//! Reconciles the three tag identifier spaces
//!
//! - Export row keys (the store's id column)
//! - Runtime ids from the text dumps, possibly composite ("103,12")
//! - Human-readable tag names, possibly hierarchical ("Plant\\Pumps\\P_101")

use crate::record::AttributeRecord;
use crate::store::TagStore;
use serde::Serialize;

/// Separator between the components of a composite runtime id
pub const COMPOSITE_DELIMITER: char = ',';

/// Separator between the segments of a hierarchical tag name
pub const NAME_SEPARATOR: char = '\\';

/// Resolve a raw runtime id to its canonical export key
///
/// Surrounding whitespace is never part of an id: the input and every
/// component are trimmed. A composite id resolves to its first component.
/// Input without a comma, or whose first component is empty, is returned
/// trimmed but otherwise unchanged.
pub fn canonical_id(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.split_once(COMPOSITE_DELIMITER) {
        Some((first, _)) if !first.trim().is_empty() => first.trim(),
        _ => raw,
    }
}

/// All components of a composite runtime id, in order, each trimmed
pub fn group_members(raw: &str) -> Vec<&str> {
    raw.trim().split(COMPOSITE_DELIMITER).map(str::trim).collect()
}

/// Last segment of a hierarchical tag name
///
/// Examples:
/// - "Plant\\Pumps\\P_101" -> "P_101"
/// - "P_101" -> "P_101"
pub fn short_name(name: &str) -> &str {
    name.rsplit(NAME_SEPARATOR).next().unwrap_or(name)
}

/// The relation between one runtime id string and its canonical export key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifierMapping<'a> {
    /// The id exactly as it appeared in the source
    pub raw: &'a str,
    /// The export key it resolves to
    pub canonical: &'a str,
    /// Every component of the composite, kept for callers needing the full group
    pub members: Vec<&'a str>,
    /// True when the raw id was composite but could not be split usefully
    pub defaulted: bool,
}

impl<'a> IdentifierMapping<'a> {
    /// Resolve a raw id string
    pub fn resolve(raw: &'a str) -> Self {
        let members = group_members(raw);
        let defaulted = members.len() > 1 && members[0].is_empty();
        Self {
            raw,
            canonical: canonical_id(raw),
            members,
            defaulted,
        }
    }

    /// Check if the raw id held more than one component
    pub fn is_composite(&self) -> bool {
        self.members.len() > 1
    }
}

/// Identifier space in which a lookup succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IdSpace {
    /// Matched the export key (after composite resolution)
    ExportKey,
    /// Matched the full tag name
    Name,
    /// Matched the last segment of a hierarchical tag name
    ShortName,
}

/// A tag found by [`resolve_tag`]
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'s> {
    pub record: &'s AttributeRecord,
    pub space: IdSpace,
}

/// Find the tag a raw identifier refers to, in any identifier space
///
/// Tried in order: export key, full name, short-name suffix.
pub fn resolve_tag<'s>(store: &'s TagStore, raw: &str) -> Option<Resolution<'s>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(record) = store.get_by_id(canonical_id(raw)) {
        return Some(Resolution {
            record,
            space: IdSpace::ExportKey,
        });
    }

    if let Some(record) = store.get_by_name(raw) {
        return Some(Resolution {
            record,
            space: IdSpace::Name,
        });
    }

    store.find_by_short_name(raw).map(|record| Resolution {
        record,
        space: IdSpace::ShortName,
    })
}
