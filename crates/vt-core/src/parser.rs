//! Delimited text and page dump parsers

use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};
use crate::record::AttributeRecord;
use crate::values::PageContentIndex;
use regex::Regex;
use std::sync::OnceLock;

/// Default page boundary: a line of three or more `=`
pub const DEFAULT_PAGE_BOUNDARY: &str = r"^={3,}\s*$";

/// Default page header: the page name followed by `:` on its own line
pub const DEFAULT_PAGE_HEADER: &str = r"^\s*(?P<name>[^:]+?)\s*:\s*$";

/// Records parsed from delimited text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedText {
    /// Field names, from the header row or by position
    pub header: Vec<String>,
    /// One record per non-blank data row, in source order
    pub records: Vec<AttributeRecord>,
    /// Rows that had to be adjusted
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse delimited text into records
///
/// Standard CSV quoting applies: a quoted field may contain the delimiter and
/// line breaks, and `""` escapes a quote. An unterminated quoted field is
/// closed at end of input. Rows shorter than the header leave the trailing
/// attributes absent; longer rows are truncated to the header width. Blank
/// rows (empty or whitespace-only lines) are skipped; a row of only delimiters
/// is kept with empty values. Without a header, fields are named by zero-based
/// position.
pub fn parse(text: &str, delimiter: u8, has_header: bool) -> Result<ParsedText> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true) // Allow varying number of fields
        .from_reader(text.as_bytes());

    let mut parsed = ParsedText::default();
    let mut header: Option<Vec<String>> = None;

    for result in csv_reader.records() {
        let record = result.map_err(|e| Error::Csv {
            source_name: "text".to_string(),
            source: e,
        })?;

        // A line holding only delimiters is a row of empty fields, not a blank row
        let blank = match record.len() {
            0 => true,
            1 => record[0].trim().is_empty(),
            _ => false,
        };
        if blank {
            continue;
        }

        if has_header && header.is_none() {
            header = Some(record.iter().map(str::to_string).collect());
            continue;
        }

        let row = parsed.records.len();
        let fields: Vec<&str> = record.iter().collect();

        let mut attributes = AttributeRecord::new();
        match &header {
            Some(names) => {
                if fields.len() > names.len() {
                    let diagnostic = Diagnostic::TruncatedRow {
                        row,
                        fields: fields.len(),
                        columns: names.len(),
                    };
                    diagnostic.warn();
                    parsed.diagnostics.push(diagnostic);
                }
                for (name, value) in names.iter().zip(fields) {
                    attributes.set(name.as_str(), value);
                }
            }
            None => {
                for (i, value) in fields.into_iter().enumerate() {
                    attributes.set(i.to_string(), value);
                }
            }
        }

        parsed.records.push(attributes);
    }

    parsed.header = match header {
        Some(names) => names,
        None => {
            let width = parsed.records.iter().map(|r| r.len()).max().unwrap_or(0);
            (0..width).map(|i| i.to_string()).collect()
        }
    };

    Ok(parsed)
}

/// How page dumps are split into named pages
#[derive(Debug, Clone)]
pub struct PageFormat {
    /// A line matching this starts a new block
    pub boundary: Regex,
    /// First non-blank line of a block; must capture `name`
    pub header: Regex,
}

impl PageFormat {
    /// Compile a page format from pattern strings
    pub fn new(boundary: &str, header: &str) -> Result<Self> {
        Ok(Self {
            boundary: compile(boundary)?,
            header: compile(header)?,
        })
    }

    /// Default header with a custom boundary pattern
    pub fn with_boundary(boundary: &str) -> Result<Self> {
        Ok(Self {
            boundary: compile(boundary)?,
            header: default_header().clone(),
        })
    }
}

impl Default for PageFormat {
    fn default() -> Self {
        Self {
            boundary: default_boundary().clone(),
            header: default_header().clone(),
        }
    }
}

fn default_boundary() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(DEFAULT_PAGE_BOUNDARY).unwrap())
}

fn default_header() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(DEFAULT_PAGE_HEADER).unwrap())
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        source: e,
    })
}

/// Split a page dump into page name -> page body
///
/// Blocks that are entirely blank are ignored. A block whose first non-blank
/// line is not a name header is skipped and reported.
pub fn parse_pages(text: &str, format: &PageFormat) -> PageContentIndex {
    let mut blocks: Vec<Vec<&str>> = vec![Vec::new()];
    for line in text.lines() {
        if format.boundary.is_match(line) {
            blocks.push(Vec::new());
        } else if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }

    let mut index = PageContentIndex::new();
    for (block_idx, lines) in blocks.iter().enumerate() {
        let Some(header_idx) = lines.iter().position(|l| !l.trim().is_empty()) else {
            continue;
        };

        let name = format
            .header
            .captures(lines[header_idx])
            .and_then(|c| c.name("name"))
            .map(|m| m.as_str().trim())
            .filter(|n| !n.is_empty());

        match name {
            Some(name) => {
                let body = lines[header_idx + 1..].join("\n");
                index.insert(name.to_string(), body);
            }
            None => index.push_diagnostic(Diagnostic::SkippedBlock {
                block: block_idx,
                reason: format!("no page name header in '{}'", lines[header_idx].trim()),
            }),
        }
    }

    tracing::debug!(
        pages = index.len(),
        skipped = index.skipped_blocks(),
        "parsed page dump"
    );

    index
}

/// Split a page dump using a boundary pattern and the default header
pub fn parse_pages_with(text: &str, boundary_pattern: &str) -> Result<PageContentIndex> {
    Ok(parse_pages(text, &PageFormat::with_boundary(boundary_pattern)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_csv() {
        let csv = "ID,TAG,READADDR\n1,PUMP1,40001\n2,PUMP2,40002\n";
        let parsed = parse(csv, b',', true).unwrap();

        assert_eq!(parsed.header, vec!["ID", "TAG", "READADDR"]);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].get("TAG"), Some("PUMP1"));
        assert_eq!(parsed.records[1].get("READADDR"), Some("40002"));
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_round_trip_unquoted() {
        let text = "ID\tTAG\tREADADDR\n1\tPUMP1\t40001\n2\tPUMP2\n3\t\t40003\n";
        let parsed = parse(text, b'\t', true).unwrap();

        let mut rendered = parsed.header.join("\t");
        rendered.push('\n');
        for record in &parsed.records {
            rendered.push_str(&record.to_delimited_string("\t"));
            rendered.push('\n');
        }
        assert_eq!(rendered, text);
    }

    #[test]
    fn test_quoted_fields() {
        let csv = "ID,Description\n1,\"Pump, main\"\n2,\"line one\nline two\"\n3,\"say \"\"hi\"\"\"\n";
        let parsed = parse(csv, b',', true).unwrap();

        assert_eq!(parsed.records[0].get("Description"), Some("Pump, main"));
        assert_eq!(parsed.records[1].get("Description"), Some("line one\nline two"));
        assert_eq!(parsed.records[2].get("Description"), Some("say \"hi\""));
    }

    #[test]
    fn test_short_rows_leave_fields_absent() {
        let parsed = parse("ID,TAG,Units\n1,PUMP1\n", b',', true).unwrap();
        let record = &parsed.records[0];

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("Units"), None);
        assert_eq!(record.get_or("Units", "-"), "-");
    }

    #[test]
    fn test_long_rows_truncated() {
        let parsed = parse("ID,TAG\n1,PUMP1,extra\n", b',', true).unwrap();

        assert_eq!(parsed.records[0].len(), 2);
        assert_eq!(
            parsed.diagnostics,
            vec![Diagnostic::TruncatedRow {
                row: 0,
                fields: 3,
                columns: 2
            }]
        );
    }

    #[test]
    fn test_blank_rows_skipped() {
        let parsed = parse("ID,TAG\n\n1,A\n  \n2,B\n", b',', true).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[1].get("ID"), Some("2"));
    }

    #[test]
    fn test_delimiter_only_row_kept() {
        let parsed = parse("ID,TAG\n1,A\n,\n2,B\n", b',', true).unwrap();

        assert_eq!(parsed.records.len(), 3);
        assert_eq!(parsed.records[1].get("ID"), Some(""));
        assert_eq!(parsed.records[1].get("TAG"), Some(""));
    }

    #[test]
    fn test_round_trip_with_empty_fields_row() {
        let text = "ID\tTAG\tREADADDR\n1\tPUMP1\t40001\n\t\t\n3\tP3\t40003\n";
        let parsed = parse(text, b'\t', true).unwrap();
        assert_eq!(parsed.records.len(), 3);

        let mut rendered = parsed.header.join("\t");
        rendered.push('\n');
        for record in &parsed.records {
            rendered.push_str(&record.to_delimited_string("\t"));
            rendered.push('\n');
        }
        assert_eq!(rendered, text);
    }

    #[test]
    fn test_unterminated_quote_closed_at_end() {
        let parsed = parse("ID,Note\n1,\"open\n2,x", b',', true).unwrap();

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].get("Note"), Some("open\n2,x"));
    }

    #[test]
    fn test_parse_without_header() {
        let parsed = parse("a;b\nc;d;e\n", b';', false).unwrap();

        assert_eq!(parsed.header, vec!["0", "1", "2"]);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].get("1"), Some("b"));
        assert_eq!(parsed.records[1].get("2"), Some("e"));
    }

    #[test]
    fn test_parse_pages() {
        let dump = "===\nOverview:\nGroup\n  Pump1\n===\nno header here\nmore\n===\nAlarms:\nList\n";
        let index = parse_pages(dump, &PageFormat::default());

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("Overview"), Some("Group\n  Pump1"));
        assert_eq!(index.get("Alarms"), Some("List"));
        assert_eq!(index.skipped_blocks(), 1);
    }

    #[test]
    fn test_parse_pages_duplicate_name() {
        let dump = "First:\nold\n===\nFirst:\nnew\n";
        let index = parse_pages(dump, &PageFormat::default());

        assert_eq!(index.get("First"), Some("new"));
        assert_eq!(
            index.diagnostics,
            vec![Diagnostic::DuplicatePage {
                name: "First".to_string()
            }]
        );
    }

    #[test]
    fn test_parse_pages_custom_boundary() {
        let dump = "Main:\nbody\n#PAGE\nSecond:\nmore\n";
        let index = parse_pages_with(dump, r"^#PAGE$").unwrap();
        assert_eq!(index.names().collect::<Vec<_>>(), vec!["Main", "Second"]);

        assert!(matches!(
            parse_pages_with(dump, "("),
            Err(Error::InvalidPattern { .. })
        ));
    }
}
