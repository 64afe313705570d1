//! `Content-Type` resolution for the report envelope and its parts.

use mail_parser::{MessageParser, MimeHeaders};

use crate::error::{DsnError, Result};
use crate::parser::header::HeaderBlock;

/// A parsed `type/subtype` with the one parameter the decoder cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub ctype: String,
    pub subtype: String,
    pub boundary: Option<String>,
}

impl MediaType {
    /// Case-insensitive `type/subtype` comparison.
    pub fn is(&self, ctype: &str, subtype: &str) -> bool {
        self.ctype.eq_ignore_ascii_case(ctype) && self.subtype.eq_ignore_ascii_case(subtype)
    }
}

/// Parse a `Content-Type` value.
///
/// Returns `None` when the value is empty or has no subtype.
pub fn parse_media_type(value: &str) -> Option<MediaType> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    // Wrap the value in a minimal RFC 5322 message so mail-parser can parse it
    let fake_msg = format!("Content-Type: {value}\r\n\r\n");
    let parser = MessageParser::default();
    let parsed = parser.parse(fake_msg.as_bytes())?;
    let ct = parsed.content_type()?;

    let subtype = ct.subtype()?.trim();
    if subtype.is_empty() {
        return None;
    }

    Some(MediaType {
        ctype: ct.ctype().trim().to_string(),
        subtype: subtype.to_string(),
        boundary: ct.attribute("boundary").map(str::to_string),
    })
}

/// Boundary of a `multipart/report` envelope.
///
/// `report-type` is not checked; real MTAs emit reports with a
/// missing or non-`delivery-status` report type.
pub fn report_boundary(headers: &HeaderBlock) -> Result<String> {
    headers
        .get("Content-Type")
        .and_then(parse_media_type)
        .filter(|mt| mt.is("multipart", "report"))
        .and_then(|mt| mt.boundary)
        .filter(|b| !b.is_empty())
        .ok_or(DsnError::InvalidContentTypeHeader)
}

/// Whether a part's `Content-Type` is `message/delivery-status`.
pub fn is_delivery_status(headers: &HeaderBlock) -> bool {
    headers
        .get("Content-Type")
        .and_then(parse_media_type)
        .is_some_and(|mt| mt.is("message", "delivery-status"))
}
