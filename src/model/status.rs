//! Enhanced mail system status codes (RFC 3463), as found in the `Status` field.

use std::fmt;

use serde::Serialize;

/// A decoded `class.subject.detail` status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCode {
    pub class: u8,
    pub subject: u16,
    pub detail: u16,
    /// Text trailing the numeric code, usually a parenthesized comment.
    pub comment: Option<String>,
}

/// Meaning of the first sub-field of a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Success,
    PersistentTransientFailure,
    PermanentFailure,
}

impl StatusCode {
    /// Decode a `Status` field value.
    ///
    /// Returns `None` for anything that is not three dotted numbers, which is
    /// common in bounces from non-conformant MTAs.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let (code, rest) = match input.find(|c: char| c.is_whitespace() || c == '(') {
            Some(pos) => (&input[..pos], input[pos..].trim()),
            None => (input, ""),
        };

        let mut fields = code.split('.');
        let class = fields.next()?.parse().ok()?;
        let subject = fields.next()?.parse().ok()?;
        let detail = fields.next()?.parse().ok()?;
        if fields.next().is_some() {
            return None;
        }

        Some(Self {
            class,
            subject,
            detail,
            comment: (!rest.is_empty()).then(|| rest.to_string()),
        })
    }

    /// `None` for classes other than 2, 4 and 5.
    pub fn class_kind(&self) -> Option<StatusClass> {
        match self.class {
            2 => Some(StatusClass::Success),
            4 => Some(StatusClass::PersistentTransientFailure),
            5 => Some(StatusClass::PermanentFailure),
            _ => None,
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::PersistentTransientFailure => "temporary failure",
            Self::PermanentFailure => "permanent failure",
        })
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.class, self.subject, self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        let s = StatusCode::parse("4.0.0").unwrap();
        assert_eq!((s.class, s.subject, s.detail), (4, 0, 0));
        assert_eq!(s.comment, None);
        assert_eq!(s.class_kind(), Some(StatusClass::PersistentTransientFailure));
    }

    #[test]
    fn test_class_display() {
        assert_eq!(StatusClass::Success.to_string(), "success");
        assert_eq!(
            StatusClass::PersistentTransientFailure.to_string(),
            "temporary failure"
        );
        assert_eq!(StatusClass::PermanentFailure.to_string(), "permanent failure");
    }

    #[test]
    fn test_parse_with_comment() {
        let s = StatusCode::parse("5.1.1 (bad destination mailbox address)").unwrap();
        assert_eq!(s.to_string(), "5.1.1");
        assert_eq!(
            s.comment.as_deref(),
            Some("(bad destination mailbox address)")
        );
        assert_eq!(s.class_kind(), Some(StatusClass::PermanentFailure));
    }

    #[test]
    fn test_parse_comment_without_space() {
        let s = StatusCode::parse("2.0.0(ok)").unwrap();
        assert_eq!(s.class_kind(), Some(StatusClass::Success));
        assert_eq!(s.comment.as_deref(), Some("(ok)"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(StatusCode::parse(""), None);
        assert_eq!(StatusCode::parse("5.1"), None);
        assert_eq!(StatusCode::parse("5.1.1.1"), None);
        assert_eq!(StatusCode::parse("550 user unknown"), None);
        assert_eq!(StatusCode::parse("x.y.z"), None);
    }

    #[test]
    fn test_unknown_class() {
        let s = StatusCode::parse("3.1.0").unwrap();
        assert_eq!(s.class_kind(), None);
    }
}
