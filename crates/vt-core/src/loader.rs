//! Snapshot loader: reads exports and text dumps into stores and indexes
//!
//! Every source is opened, read fully and released within a single call; no
//! handle outlives the call that acquired it.

use crate::config::LoaderConfig;
use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};
use crate::parser::{parse, parse_pages, PageFormat};
use crate::record::AttributeRecord;
use crate::resolver::{resolve_tag, IdentifierMapping, Resolution};
use crate::store::TagStore;
use crate::values::{PageContentIndex, TagValueIndex};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// The rows of one export table, read in a single pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRows {
    /// Column names in export order
    pub columns: Vec<String>,
    /// Row values as raw text, keyed by column name
    pub rows: Vec<AttributeRecord>,
    /// Rows the reader had to adjust
    pub diagnostics: Vec<Diagnostic>,
}

/// A tabular export of the configuration database
pub trait ExportReader {
    /// Human-readable name of the export, for error messages
    fn source_name(&self) -> String;

    /// Names of all tables in the export
    fn table_names(&self) -> Result<Vec<String>>;

    /// Columns and rows of one table
    fn read_table(&self, table: &str) -> Result<TableRows>;
}

/// A plain-text dump (pages or values)
pub trait TextSource {
    /// Human-readable name of the source, for error messages
    fn source_name(&self) -> String;

    /// Read the entire text
    fn read_all_text(&self) -> Result<String>;
}

impl TextSource for str {
    fn source_name(&self) -> String {
        "text".to_string()
    }

    fn read_all_text(&self) -> Result<String> {
        Ok(self.to_string())
    }
}

impl TextSource for String {
    fn source_name(&self) -> String {
        "text".to_string()
    }

    fn read_all_text(&self) -> Result<String> {
        Ok(self.clone())
    }
}

/// A text dump stored in a file
#[derive(Debug, Clone)]
pub struct TextFile {
    pub path: PathBuf,
}

impl TextFile {
    /// Create a new text file source
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl TextSource for TextFile {
    fn source_name(&self) -> String {
        self.path.display().to_string()
    }

    fn read_all_text(&self) -> Result<String> {
        read_text_file(&self.path)
    }
}

/// Read a whole file as UTF-8 text
///
/// A file that opens but does not decode is malformed, not unavailable.
fn read_text_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::InvalidData => Error::malformed(path.display().to_string(), e.to_string()),
        _ => Error::SourceUnavailable {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

/// A database export as a directory holding one `<table>.csv` per table
#[derive(Debug, Clone)]
pub struct CsvExport {
    /// Directory the export was found in
    pub root: PathBuf,
    /// Table name -> CSV file. Using BTreeMap for deterministic ordering
    pub tables: BTreeMap<String, PathBuf>,
    /// Field separator of the CSV files
    pub delimiter: u8,
}

impl CsvExport {
    /// Discover the tables of an export directory
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if let Err(e) = fs::read_dir(root) {
            return Err(Error::SourceUnavailable {
                path: root.to_path_buf(),
                source: e,
            });
        }

        let mut tables = BTreeMap::new();
        for entry in WalkDir::new(root).max_depth(1).follow_links(true) {
            let entry = entry?;
            let path = entry.path();

            // Only CSV files are tables
            if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(table) = path.file_stem().and_then(|s| s.to_str()) {
                    tables.insert(table.to_string(), path.to_path_buf());
                }
            }
        }

        debug!(root = %root.display(), tables = tables.len(), "opened CSV export");

        Ok(Self {
            root: root.to_path_buf(),
            tables,
            delimiter: b',',
        })
    }

    /// Use a different field separator
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

impl ExportReader for CsvExport {
    fn source_name(&self) -> String {
        self.root.display().to_string()
    }

    fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    fn read_table(&self, table: &str) -> Result<TableRows> {
        let path = self.tables.get(table).ok_or_else(|| {
            Error::malformed(self.source_name(), format!("no table named '{}'", table))
        })?;

        let content = read_text_file(path)?;

        let parsed = parse(&content, self.delimiter, true)?;
        Ok(TableRows {
            columns: parsed.header,
            rows: parsed.records,
            diagnostics: parsed.diagnostics,
        })
    }
}

/// An export held in memory as CSV text per table (e.g. pasted from a spreadsheet)
#[derive(Debug, Clone, Default)]
pub struct MemoryExport {
    /// Table name -> CSV text
    pub tables: BTreeMap<String, String>,
    /// Field separator of the CSV text
    pub delimiter: u8,
}

impl MemoryExport {
    /// Create an empty export with the given field separator
    pub fn new(delimiter: u8) -> Self {
        Self {
            tables: BTreeMap::new(),
            delimiter,
        }
    }

    /// Add a table
    pub fn with_table(mut self, table: impl Into<String>, text: impl Into<String>) -> Self {
        self.tables.insert(table.into(), text.into());
        self
    }
}

impl ExportReader for MemoryExport {
    fn source_name(&self) -> String {
        "memory".to_string()
    }

    fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    fn read_table(&self, table: &str) -> Result<TableRows> {
        let text = self.tables.get(table).ok_or_else(|| {
            Error::malformed(self.source_name(), format!("no table named '{}'", table))
        })?;

        let parsed = parse(text, self.delimiter, true)?;
        Ok(TableRows {
            columns: parsed.header,
            rows: parsed.records,
            diagnostics: parsed.diagnostics,
        })
    }
}

/// Every tag table of an export
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Table name -> tag store
    pub tables: BTreeMap<String, TagStore>,
    /// Diagnostics of every table, tagged with the table name
    pub diagnostics: Vec<(String, Diagnostic)>,
}

impl Snapshot {
    /// Get one table's store
    pub fn table(&self, name: &str) -> Option<&TagStore> {
        self.tables.get(name)
    }

    /// Find a tag by raw id or name in any table
    ///
    /// The table named by the inferred tag type is searched first, then the
    /// rest in table order.
    pub fn resolve(&self, raw: &str, config: &LoaderConfig) -> Option<(&str, Resolution<'_>)> {
        let preferred = config.tag_types.infer(raw);

        let first = preferred.and_then(|t| self.tables.get_key_value(t));
        let rest = self
            .tables
            .iter()
            .filter(|(name, _)| Some(name.as_str()) != preferred);

        first
            .into_iter()
            .chain(rest)
            .find_map(|(name, store)| resolve_tag(store, raw).map(|r| (name.as_str(), r)))
    }

    /// Get the total number of tags across tables
    pub fn tag_count(&self) -> usize {
        self.tables.values().map(|s| s.len()).sum()
    }
}

/// Builds tag stores and text indexes from external sources
#[derive(Debug, Clone)]
pub struct SnapshotLoader {
    config: LoaderConfig,
    page_format: PageFormat,
}

impl SnapshotLoader {
    /// Create a loader; fails if the configured page patterns do not compile
    pub fn new(config: LoaderConfig) -> Result<Self> {
        let page_format = config.page_format()?;
        Ok(Self {
            config,
            page_format,
        })
    }

    /// The configuration in use
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load the configured tag table
    pub fn load_tag_store<E: ExportReader + ?Sized>(
        &self,
        export: &E,
    ) -> Result<(TagStore, Vec<Diagnostic>)> {
        self.load_table(export, &self.config.tag_table)
    }

    /// Load one table of the export as a tag store
    ///
    /// Values keep their raw text; nothing is coerced to numbers.
    pub fn load_table<E: ExportReader + ?Sized>(
        &self,
        export: &E,
        table: &str,
    ) -> Result<(TagStore, Vec<Diagnostic>)> {
        let table_rows = export.read_table(table)?;

        if let Some(reason) = self.unusable_reason(table, &table_rows) {
            return Err(Error::malformed(export.source_name(), reason));
        }

        Ok(self.build_store(table, table_rows))
    }

    /// Why a table cannot be loaded as tags, if it cannot
    fn unusable_reason(&self, table: &str, table_rows: &TableRows) -> Option<String> {
        if table_rows.columns.is_empty() {
            return Some(format!("table '{}' has no columns", table));
        }

        [&self.config.id_column, &self.config.name_column]
            .into_iter()
            .find(|column| !table_rows.columns.iter().any(|c| c == *column))
            .map(|column| format!("table '{}' has no '{}' column", table, column))
    }

    fn build_store(&self, table: &str, table_rows: TableRows) -> (TagStore, Vec<Diagnostic>) {
        let mut diagnostics = table_rows.diagnostics;
        let (store, store_diagnostics) = TagStore::load_with_header(
            &table_rows.columns,
            table_rows.rows,
            &self.config.id_column,
            &self.config.name_column,
        );
        diagnostics.extend(store_diagnostics);

        debug!(
            table,
            tags = store.len(),
            diagnostics = diagnostics.len(),
            "loaded tag table"
        );

        (store, diagnostics)
    }

    /// Load every table of the export
    ///
    /// Tables without the configured id and name columns are skipped and
    /// reported; failing to read a table still fails the whole load.
    pub fn load_all_tag_stores<E: ExportReader + ?Sized>(&self, export: &E) -> Result<Snapshot> {
        let mut snapshot = Snapshot::default();

        for table in export.table_names()? {
            let table_rows = export.read_table(&table)?;

            if let Some(reason) = self.unusable_reason(&table, &table_rows) {
                let diagnostic = Diagnostic::SkippedTable {
                    table: table.clone(),
                    reason,
                };
                diagnostic.warn();
                snapshot.diagnostics.push((table, diagnostic));
                continue;
            }

            let (store, diagnostics) = self.build_store(&table, table_rows);
            snapshot
                .diagnostics
                .extend(diagnostics.into_iter().map(|d| (table.clone(), d)));
            snapshot.tables.insert(table, store);
        }

        Ok(snapshot)
    }

    /// Split a page dump into named pages
    pub fn load_pages<S: TextSource + ?Sized>(&self, source: &S) -> Result<PageContentIndex> {
        let text = source.read_all_text()?;
        Ok(parse_pages(&text, &self.page_format))
    }

    /// Collect per-tag property values from a value dump
    ///
    /// Each line is `id<sep>property<sep>value`; the value is kept verbatim
    /// even if it contains the separator. The id is resolved to its canonical
    /// export key, and lines for the same tag accumulate into one record
    /// (last-write-wins per property). Lines for ids unknown to `store` are
    /// kept and reported.
    pub fn load_tag_values<S: TextSource + ?Sized>(
        &self,
        source: &S,
        store: &TagStore,
    ) -> Result<TagValueIndex> {
        let text = source.read_all_text()?;
        let delimiter = self.config.value_delimiter;

        let mut index = TagValueIndex::new();
        let mut non_blank = 0;

        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            non_blank += 1;

            let mut fields = line.splitn(3, delimiter);
            let (id, property, value) = match (fields.next(), fields.next(), fields.next()) {
                (Some(id), Some(property), Some(value)) => (id.trim(), property.trim(), value),
                _ => {
                    index.push_diagnostic(Diagnostic::SkippedLine {
                        line: line_no,
                        reason: "expected id, property and value fields".to_string(),
                    });
                    continue;
                }
            };

            if id.is_empty() || property.is_empty() {
                index.push_diagnostic(Diagnostic::SkippedLine {
                    line: line_no,
                    reason: "empty id or property".to_string(),
                });
                continue;
            }

            let mapping = IdentifierMapping::resolve(id);
            if mapping.defaulted {
                index.push_diagnostic(Diagnostic::DefaultedId {
                    line: line_no,
                    raw: id.to_string(),
                });
            }
            if store.get_by_id(mapping.canonical).is_none() {
                index.push_diagnostic(Diagnostic::UnknownTag {
                    line: line_no,
                    id: mapping.canonical.to_string(),
                });
            }

            index.accumulate(&mapping, property, value);
        }

        if non_blank > 0 && index.is_empty() {
            return Err(Error::malformed(
                source.source_name(),
                format!("no line has id, property and value separated by {:?}", delimiter),
            ));
        }

        debug!(
            tags = index.len(),
            diagnostics = index.diagnostics.len(),
            "loaded tag values"
        );

        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pumps() -> MemoryExport {
        MemoryExport::new(b',').with_table(
            "Tags",
            "ID,TAG,READADDR\n1,PUMP1,40001\n2,PUMP2,40002\n103,LIT_101,40003\n",
        )
    }

    fn loader() -> SnapshotLoader {
        SnapshotLoader::new(LoaderConfig::default()).unwrap()
    }

    #[test]
    fn test_load_tag_store() {
        let (store, diagnostics) = loader().load_tag_store(&pumps()).unwrap();

        assert!(diagnostics.is_empty());
        assert_eq!(store.get_by_name("PUMP1").unwrap().get("READADDR"), Some("40001"));
        assert_eq!(store.get_by_id("2").unwrap().get("TAG"), Some("PUMP2"));
    }

    #[test]
    fn test_load_is_idempotent() {
        let export = pumps();
        let (first, _) = loader().load_tag_store(&export).unwrap();
        let (second, _) = loader().load_tag_store(&export).unwrap();

        assert_eq!(first, second);
        assert!(first.all().eq(second.all()));
    }

    #[test]
    fn test_missing_table_is_malformed() {
        let err = loader().load_table(&pumps(), "AB_AI").unwrap_err();
        assert!(matches!(err, Error::MalformedSource { .. }));
    }

    #[test]
    fn test_zero_columns_is_malformed() {
        let export = MemoryExport::new(b',').with_table("Tags", "\n\n");
        let err = loader().load_tag_store(&export).unwrap_err();
        assert!(matches!(err, Error::MalformedSource { .. }));
    }

    #[test]
    fn test_missing_id_column_is_malformed() {
        let export = MemoryExport::new(b',').with_table("Tags", "Name,Value\nA,1\n");
        let err = loader().load_tag_store(&export).unwrap_err();
        assert!(matches!(err, Error::MalformedSource { .. }));
    }

    #[test]
    fn test_load_tag_values() {
        let (store, _) = loader().load_tag_store(&pumps()).unwrap();
        let dump = "103,12\tREADADDR\t40001\n103\tValue\t4.2\n103,12\tValue\t4.5\n";
        let values = loader().load_tag_values(dump, &store).unwrap();

        assert_eq!(values.property("103", "READADDR"), Some("40001"));
        assert_eq!(values.property("103", "Value"), Some("4.5"));
        assert_eq!(values.members("103"), ["103".to_string(), "12".to_string()]);
        assert!(values.diagnostics.is_empty());
    }

    #[test]
    fn test_load_tag_values_diagnostics() {
        let (store, _) = loader().load_tag_store(&pumps()).unwrap();
        let dump = "999\tValue\t1\nbroken line\n,5\tValue\t2\n1\tNote\ta\tb\n";
        let values = loader().load_tag_values(dump, &store).unwrap();

        assert_eq!(values.property("999", "Value"), Some("1"));
        assert_eq!(values.property(",5", "Value"), Some("2"));
        assert_eq!(values.property("1", "Note"), Some("a\tb"));
        assert!(values
            .diagnostics
            .contains(&Diagnostic::UnknownTag { line: 0, id: "999".to_string() }));
        assert!(matches!(values.diagnostics[1], Diagnostic::SkippedLine { line: 1, .. }));
        assert!(values
            .diagnostics
            .contains(&Diagnostic::DefaultedId { line: 2, raw: ",5".to_string() }));
    }

    #[test]
    fn test_unrecognizable_value_dump() {
        let (store, _) = loader().load_tag_store(&pumps()).unwrap();
        let err = loader().load_tag_values("just,some,csv\n", &store).unwrap_err();
        assert!(matches!(err, Error::MalformedSource { .. }));

        let empty = loader().load_tag_values("", &store).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_load_pages() {
        let dump = "===\nOverview:\nbody\n===\nmissing header\n";
        let pages = loader().load_pages(dump).unwrap();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages.get("Overview"), Some("body"));
        assert_eq!(pages.skipped_blocks(), 1);
    }

    #[test]
    fn test_load_all_skips_tables_without_tag_columns() {
        let export = pumps().with_table("Settings", "Key,Value\nunits,metric\n");
        let snapshot = loader().load_all_tag_stores(&export).unwrap();

        assert_eq!(snapshot.tables.len(), 1);
        assert!(snapshot.table("Tags").is_some());
        assert_eq!(snapshot.diagnostics.len(), 1);
        let (table, diagnostic) = &snapshot.diagnostics[0];
        assert_eq!(table, "Settings");
        assert!(matches!(diagnostic, Diagnostic::SkippedTable { .. }));

        // Loading that table on its own is still an error
        let err = loader().load_table(&export, "Settings").unwrap_err();
        assert!(matches!(err, Error::MalformedSource { .. }));
    }

    #[test]
    fn test_non_utf8_export_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Tags.csv"), b"ID,TAG\n1,Caf\xe9\n").unwrap();

        let export = CsvExport::open(dir.path()).unwrap();
        let err = loader().load_tag_store(&export).unwrap_err();
        assert!(matches!(err, Error::MalformedSource { .. }));

        let err = TextFile::new(dir.path().join("Tags.csv")).read_all_text().unwrap_err();
        assert!(matches!(err, Error::MalformedSource { .. }));

        let err = TextFile::new(dir.path().join("gone.txt")).read_all_text().unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
    }

    #[test]
    fn test_snapshot_resolve_prefers_inferred_table() {
        let export = MemoryExport::new(b',')
            .with_table("AB_AI", "ID,TAG\n1,Plant\\LIT_101\n")
            .with_table("AB_MOTOR", "ID,TAG\n1,Plant\\P_101\n");
        let config = LoaderConfig::default();
        let snapshot = SnapshotLoader::new(config.clone())
            .unwrap()
            .load_all_tag_stores(&export)
            .unwrap();

        assert_eq!(snapshot.tag_count(), 2);

        let (table, found) = snapshot.resolve("P_101", &config).unwrap();
        assert_eq!(table, "AB_MOTOR");
        assert_eq!(found.record.get("TAG"), Some("Plant\\P_101"));

        let (table, _) = snapshot.resolve("1", &config).unwrap();
        assert_eq!(table, "AB_AI");
    }
}
