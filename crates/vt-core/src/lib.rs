//! vt-core: Core library for resolving SCADA tag snapshot exports
//!
//! This library provides functionality to:
//! - Parse delimited exports and page dumps into attribute records
//! - Index tag definitions by export key and by tag name
//! - Reconcile composite runtime ids, export keys and tag names
//! - Collect per-tag property values from value dumps
//! - Apply tag updates and write CSV import files

pub mod config;
pub mod diagnostics;
pub mod edits;
pub mod error;
pub mod loader;
pub mod parser;
pub mod record;
pub mod resolver;
pub mod store;
pub mod tag_type;
pub mod values;

pub use config::LoaderConfig;
pub use diagnostics::{Diagnostic, KeyIndex};
pub use edits::{apply_updates, prepare_new_tags, to_import_csv, write_import_csv, TagUpdate, UpdateResult, UpdateSet};
pub use error::{Error, Result};
pub use loader::{CsvExport, ExportReader, MemoryExport, Snapshot, SnapshotLoader, TableRows, TextFile, TextSource};
pub use parser::{parse, parse_pages, parse_pages_with, PageFormat, ParsedText};
pub use record::AttributeRecord;
pub use resolver::{canonical_id, group_members, resolve_tag, short_name, IdSpace, IdentifierMapping, Resolution};
pub use store::TagStore;
pub use tag_type::{TagTypeRule, TagTypeRules};
pub use values::{PageContentIndex, TagValueIndex};
