//! Tag type inference from tag naming conventions

use crate::resolver::short_name;
use serde::{Deserialize, Serialize};

/// One tag type and the name prefixes that identify it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagTypeRule {
    /// Tag type, which is also the export table holding tags of that type
    pub tag_type: String,
    /// Instrument prefixes (the part of the short name before the first `_`)
    pub prefixes: Vec<String>,
}

impl TagTypeRule {
    /// Create a new rule
    pub fn new(tag_type: impl Into<String>, prefixes: &[&str]) -> Self {
        Self {
            tag_type: tag_type.into(),
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Ordered rules for guessing a tag's type from its name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagTypeRules {
    pub rules: Vec<TagTypeRule>,
}

impl TagTypeRules {
    /// Create a rule set
    pub fn new(rules: Vec<TagTypeRule>) -> Self {
        Self { rules }
    }

    /// Infer the tag type of a (possibly hierarchical) tag name
    ///
    /// Examples with the default rules:
    /// - "Plant\\LIT_101" -> Some("AB_AI")
    /// - "FCV_3" -> Some("AB_FCV")
    /// - "XYZ_1" -> None
    pub fn infer(&self, name: &str) -> Option<&str> {
        let prefix = short_name(name).split('_').next().unwrap_or_default();
        self.rules
            .iter()
            .find(|rule| rule.prefixes.iter().any(|p| p == prefix))
            .map(|rule| rule.tag_type.as_str())
    }

    /// Get all tag type names, in rule order
    pub fn tag_types(&self) -> impl Iterator<Item = &str> + '_ {
        self.rules.iter().map(|r| r.tag_type.as_str())
    }
}

impl Default for TagTypeRules {
    /// Allen-Bradley naming conventions
    fn default() -> Self {
        Self::new(vec![
            TagTypeRule::new(
                "AB_AI",
                &["LT", "LIT", "AIT", "FIT", "PIT", "TT", "WIT", "ZA", "ZS"],
            ),
            TagTypeRule::new(
                "AB_DA",
                &["TAH", "TAL", "LAHH", "SD", "LS", "VAH", "PAH", "PAL", "FAL", "LAL", "LAH"],
            ),
            TagTypeRule::new("AB_FV", &["FV"]),
            TagTypeRule::new("AB_FCV", &["FCV"]),
            TagTypeRule::new("AB_MOTOR", &["P", "CP", "SC", "BL", "CF"]),
            TagTypeRule::new("AB_TOTALIZER", &[]),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_default_rules() {
        let rules = TagTypeRules::default();
        assert_eq!(rules.infer("LIT_101"), Some("AB_AI"));
        assert_eq!(rules.infer("Plant\\Pumps\\P_7"), Some("AB_MOTOR"));
        assert_eq!(rules.infer("FCV_3"), Some("AB_FCV"));
        assert_eq!(rules.infer("LAHH_2"), Some("AB_DA"));
    }

    #[test]
    fn test_infer_unknown() {
        let rules = TagTypeRules::default();
        assert_eq!(rules.infer("XYZ_1"), None);
        assert_eq!(rules.infer(""), None);
        // Prefix match is exact, not a substring
        assert_eq!(rules.infer("PUMP1"), None);
    }

    #[test]
    fn test_rules_from_json() {
        let rules: TagTypeRules =
            serde_json::from_str(r#"[{"tag_type": "DIGITAL", "prefixes": ["XS", "HS"]}]"#).unwrap();
        assert_eq!(rules.infer("HS_1"), Some("DIGITAL"));
        assert_eq!(rules.tag_types().collect::<Vec<_>>(), vec!["DIGITAL"]);
    }
}
