//! Attribute record: one row of exported data as ordered name/value text pairs

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An ordered, schema-less set of text attributes
///
/// Names are case-sensitive and match the export's column headers exactly.
/// Values are stored as text; typed interpretation is always explicit via
/// [`AttributeRecord::get_parsed`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeRecord {
    attributes: Vec<(String, String)>,
}

impl AttributeRecord {
    /// Create a new empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from pairs; a repeated name overwrites the earlier value in place
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::new();
        for (name, value) in pairs {
            record.set(name, value);
        }
        record
    }

    /// Get a value by exact attribute name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a value, falling back to `default` when the attribute is absent
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    /// Get a value ignoring ASCII case in the attribute name
    ///
    /// An exact match wins over a case-folded one.
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.get(name).or_else(|| {
            self.attributes
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        })
    }

    /// Parse a value into `T`; `None` when absent
    pub fn get_parsed<T: FromStr>(&self, name: &str) -> Option<Result<T, T::Err>> {
        self.get(name).map(|v| v.trim().parse())
    }

    /// Set a value, replacing an existing attribute or appending a new one
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Check if the record has an attribute
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.iter().any(|(n, _)| n == name)
    }

    /// Attribute names in column order
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.attributes.iter().map(|(n, _)| n.as_str())
    }

    /// Values in column order
    pub fn values(&self) -> impl Iterator<Item = &str> + '_ {
        self.attributes.iter().map(|(_, v)| v.as_str())
    }

    /// (name, value) pairs in column order
    pub fn items(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.attributes
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Get the number of attributes
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the record has no attributes
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Render all values joined by `separator`, in column order
    pub fn to_delimited_string(&self, separator: &str) -> String {
        self.values().collect::<Vec<_>>().join(separator)
    }
}

impl fmt::Display for AttributeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_delimited_string("\t"))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttributeRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

// Serialized as a JSON object; entry order follows column order.
impl Serialize for AttributeRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attributes.len()))?;
        for (name, value) in &self.attributes {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AttributeRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = AttributeRecord;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a map of attribute names to text values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut record = AttributeRecord::new();
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    record.set(name, value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}
