//! Loader configuration, stored as JSON

use crate::error::{Error, Result};
use crate::parser::{PageFormat, DEFAULT_PAGE_BOUNDARY, DEFAULT_PAGE_HEADER};
use crate::tag_type::TagTypeRules;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Column names, delimiters and patterns describing one SCADA export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Column holding the export row key
    pub id_column: String,
    /// Column holding the tag name
    pub name_column: String,
    /// Table loaded when no table is named explicitly
    pub tag_table: String,
    /// Field separator of the value dump
    pub value_delimiter: char,
    /// Regex for the line separating page blocks
    pub page_boundary: String,
    /// Regex for a page name header line, with a `name` group
    pub page_header: String,
    /// Rules for inferring a tag type from its name
    pub tag_types: TagTypeRules,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            id_column: "ID".to_string(),
            name_column: "TAG".to_string(),
            tag_table: "Tags".to_string(),
            value_delimiter: '\t',
            page_boundary: DEFAULT_PAGE_BOUNDARY.to_string(),
            page_header: DEFAULT_PAGE_HEADER.to_string(),
            tag_types: TagTypeRules::default(),
        }
    }
}

impl LoaderConfig {
    /// Load a config file from JSON; missing fields take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::SourceUnavailable {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the config file to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Compile the page patterns
    pub fn page_format(&self) -> Result<PageFormat> {
        PageFormat::new(&self.page_boundary, &self.page_header)
    }
}
