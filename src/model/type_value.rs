//! The `type; value` field grammar shared by several DSN fields.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A field of the form `type; value`, e.g. `Remote-MTA: dns; mx.example.com`.
///
/// `kind` is empty when the source had no `;`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeValueField {
    /// Address, MTA-name or diagnostic type (`rfc822`, `dns`, `smtp`, …).
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl TypeValueField {
    /// Parse a raw field value.
    ///
    /// Splits on the first `;` only. Input without a `;` is tolerated and
    /// yields an empty type, so this never fails.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(';') {
            Some((kind, value)) => Self {
                kind: kind.trim().to_string(),
                value: value.trim().to_string(),
            },
            None => Self {
                kind: String::new(),
                value: raw.trim().to_string(),
            },
        }
    }

    /// True when both halves are empty (the field was absent).
    pub fn is_empty(&self) -> bool {
        self.kind.is_empty() && self.value.is_empty()
    }
}

impl fmt::Display for TypeValueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_empty() {
            f.write_str(&self.value)
        } else {
            write!(f, "{}; {}", self.kind, self.value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_and_value() {
        let f = TypeValueField::parse("rfc822; louisl@larry.slip.umd.edu");
        assert_eq!(f.kind, "rfc822");
        assert_eq!(f.value, "louisl@larry.slip.umd.edu");
    }

    #[test]
    fn test_parse_trims_both_halves() {
        let f = TypeValueField::parse("  dns ;   cs.utk.edu  ");
        assert_eq!(f.kind, "dns");
        assert_eq!(f.value, "cs.utk.edu");
    }

    #[test]
    fn test_parse_without_semicolon() {
        let f = TypeValueField::parse("  user@example.com ");
        assert_eq!(f.kind, "");
        assert_eq!(f.value, "user@example.com");
    }

    #[test]
    fn test_parse_splits_on_first_semicolon_only() {
        let f = TypeValueField::parse("smtp; 550 5.1.1 <a@b.c>; user unknown");
        assert_eq!(f.kind, "smtp");
        assert_eq!(f.value, "550 5.1.1 <a@b.c>; user unknown");
    }

    #[test]
    fn test_parse_empty_type() {
        let f = TypeValueField::parse("; value");
        assert_eq!(f.kind, "");
        assert_eq!(f.value, "value");
        assert_eq!(f.to_string(), "value");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            TypeValueField::parse("rfc822;user@example.com").to_string(),
            "rfc822; user@example.com"
        );
        assert_eq!(TypeValueField::parse("bare").to_string(), "bare");
        assert_eq!(TypeValueField::default().to_string(), "");
    }

    #[test]
    fn test_display_reparses_to_same_field() {
        for raw in ["dns;mx.example.com", " x400 ;  C=US;A=ATTMAIL ", "plain"] {
            let field = TypeValueField::parse(raw);
            assert_eq!(TypeValueField::parse(&field.to_string()), field, "{raw}");
        }
    }

    #[test]
    fn test_json_shape() {
        let f = TypeValueField::parse("dns; cs.utk.edu");
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["type"], "dns");
        assert_eq!(json["value"], "cs.utk.edu");
    }
}
