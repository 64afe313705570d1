//! MIME-style header blocks: reading, unfolding and name canonicalization.
//!
//! The same reader handles the outer message headers, the headers of every
//! multipart part, and the blank-line separated blocks inside a
//! `message/delivery-status` body.

use std::io::BufRead;

use tracing::trace;

use crate::error::{DsnError, Result};

/// Canonical form of a header name: each hyphen-separated word capitalized,
/// the rest lowercased (`x-postfix-queue-id` becomes `X-Postfix-Queue-Id`).
///
/// Names containing bytes that are not valid in a header name (spaces,
/// control characters, non-ASCII) are returned unchanged.
pub fn canonical_key(name: &str) -> String {
    if !name.bytes().all(is_token_byte) {
        return name.to_string();
    }

    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// One block of header fields, in the order they appeared.
///
/// Names are canonical; a field occurring more than once keeps every value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    fields: Vec<(String, Vec<String>)>,
}

impl HeaderBlock {
    /// Add a value for `name`, after any existing values.
    pub fn append(&mut self, name: &str, value: String) {
        let key = canonical_key(name);
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.fields.push((key, vec![value])),
        }
    }

    /// First value for `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// Every value for `name` (case-insensitive).
    pub fn get_all(&self, name: &str) -> &[String] {
        let key = canonical_key(name);
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate `(canonical_name, values)` in order of first appearance.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of distinct field names.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Pull-based reader producing one [`HeaderBlock`] per call.
pub struct HeaderReader<R> {
    inner: R,
    line_buf: Vec<u8>,
    /// Fields read before the last `read_block` error.
    interrupted: HeaderBlock,
}

impl<R: BufRead> HeaderReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line_buf: Vec::with_capacity(256),
            interrupted: HeaderBlock::default(),
        }
    }

    /// Read the next block, up to and including its terminating blank line.
    ///
    /// Returns `Ok(None)` once the stream is exhausted. A block cut short by
    /// the end of the stream is still returned; the following call yields
    /// `None`. Folded continuation lines are joined with a single space, and
    /// a whitespace-only line directly after a field is such a continuation.
    ///
    /// On error, the fields completed so far are kept and can be retrieved
    /// with [`HeaderReader::take_interrupted`].
    pub fn read_block(&mut self) -> Result<Option<HeaderBlock>> {
        let mut block = HeaderBlock::default();
        match self.fill_block(&mut block) {
            Ok(true) => Ok(Some(block)),
            Ok(false) => Ok(None),
            Err(e) => {
                self.interrupted = block;
                Err(e)
            }
        }
    }

    /// Fields of the block the last `read_block` error interrupted.
    ///
    /// Empty if the error hit before any field was complete.
    pub fn take_interrupted(&mut self) -> HeaderBlock {
        std::mem::take(&mut self.interrupted)
    }

    /// Returns `false` if the stream ended before the first line.
    fn fill_block(&mut self, block: &mut HeaderBlock) -> Result<bool> {
        let mut started = false;

        loop {
            let Some(line) = self.read_line()? else {
                return Ok(started);
            };
            started = true;

            if line.trim().is_empty() {
                return Ok(true);
            }
            if line.starts_with([' ', '\t']) {
                // Continuation with nothing to continue
                return Err(DsnError::MalformedHeader(line));
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(DsnError::MalformedHeader(line));
            };
            let name = name.trim_end();
            if name.is_empty() || name.contains([' ', '\t']) {
                return Err(DsnError::MalformedHeader(line));
            }

            let mut value = value.trim().to_string();
            let unfolded = self.unfold(&mut value);

            trace!(name, value = value.as_str(), "header field");
            block.append(name, value);
            unfolded?;
        }
    }

    /// Append folded continuation lines to `value`.
    fn unfold(&mut self, value: &mut String) -> Result<()> {
        while self.next_is_continuation()? {
            let Some(cont) = self.read_line()? else {
                break;
            };
            let cont = cont.trim();
            if !cont.is_empty() {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(cont);
            }
        }
        Ok(())
    }

    /// One line without its `\r\n` / `\n` terminator, or `None` at end of stream.
    fn read_line(&mut self) -> Result<Option<String>> {
        self.line_buf.clear();
        let n = self.inner.read_until(b'\n', &mut self.line_buf)?;
        if n == 0 {
            return Ok(None);
        }
        let mut end = self.line_buf.len();
        if end > 0 && self.line_buf[end - 1] == b'\n' {
            end -= 1;
        }
        if end > 0 && self.line_buf[end - 1] == b'\r' {
            end -= 1;
        }
        Ok(Some(decode_header_bytes(&self.line_buf[..end])))
    }

    fn next_is_continuation(&mut self) -> Result<bool> {
        let buf = self.inner.fill_buf()?;
        Ok(matches!(buf.first(), Some(b' ' | b'\t')))
    }
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
pub fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            trace!(len = bytes.len(), "non UTF-8 header line, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(input: &str) -> Vec<HeaderBlock> {
        let mut reader = HeaderReader::new(input.as_bytes());
        let mut out = Vec::new();
        while let Some(b) = reader.read_block().unwrap() {
            out.push(b);
        }
        out
    }

    #[test]
    fn test_canonical_key() {
        assert_eq!(canonical_key("x-postfix-queue-id"), "X-Postfix-Queue-Id");
        assert_eq!(canonical_key("Final-Log-ID"), "Final-Log-Id");
        assert_eq!(canonical_key("REPORTING-MTA"), "Reporting-Mta");
        assert_eq!(canonical_key("content-type"), "Content-Type");
        assert_eq!(canonical_key("x--y"), "X--Y");
        assert_eq!(canonical_key(""), "");
    }

    #[test]
    fn test_canonical_key_invalid_left_alone() {
        assert_eq!(canonical_key("bad key"), "bad key");
        assert_eq!(canonical_key("clé-x"), "clé-x");
    }

    #[test]
    fn test_read_single_block() {
        let b = blocks("Subject: Hi\r\nFrom: a@b.c\r\n\r\nBody\r\n");
        assert_eq!(b[0].len(), 2);
        assert_eq!(b[0].get("subject"), Some("Hi"));
        assert_eq!(b[0].get("FROM"), Some("a@b.c"));
    }

    #[test]
    fn test_unfold_continuation() {
        let b = blocks("Content-Type: multipart/report;\n\treport-type=delivery-status;\n boundary=\"x\"\n\n");
        assert_eq!(
            b[0].get("Content-Type"),
            Some("multipart/report; report-type=delivery-status; boundary=\"x\"")
        );
    }

    #[test]
    fn test_blocks_separated_by_blank_lines() {
        let b = blocks("A: 1\n\nB: 2\nC: 3\n\nD: 4");
        assert_eq!(b.len(), 3);
        assert_eq!(b[1].get("c"), Some("3"));
        // Last block unterminated by a blank line
        assert_eq!(b[2].get("d"), Some("4"));
    }

    #[test]
    fn test_consecutive_blank_lines_give_empty_block() {
        let b = blocks("A: 1\n\n\nB: 2\n");
        assert_eq!(b.len(), 3);
        assert!(b[1].is_empty());
    }

    #[test]
    fn test_repeated_field_keeps_all_values() {
        let b = blocks("Received: one\nreceived: two\n\n");
        assert_eq!(b[0].get_all("Received"), ["one", "two"]);
        assert_eq!(b[0].len(), 1);
    }

    #[test]
    fn test_empty_stream() {
        assert!(blocks("").is_empty());
    }

    #[test]
    fn test_malformed_line() {
        let mut reader = HeaderReader::new("A: 1\nnot a header\n".as_bytes());
        let err = reader.read_block().unwrap_err();
        assert!(matches!(err, DsnError::MalformedHeader(l) if l == "not a header"));
    }

    #[test]
    fn test_leading_continuation_is_malformed() {
        let mut reader = HeaderReader::new(" orphan\n".as_bytes());
        assert!(matches!(
            reader.read_block(),
            Err(DsnError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_whitespace_only_line_after_field_continues_it() {
        let b = blocks("Final-Recipient: rfc822; a@example.com\n  \nFinal-Recipient: rfc822; b@example.com\n\n");
        assert_eq!(b.len(), 1);
        assert_eq!(
            b[0].get_all("Final-Recipient"),
            ["rfc822; a@example.com", "rfc822; b@example.com"]
        );
    }

    #[test]
    fn test_whitespace_only_line_at_block_start_is_blank() {
        let b = blocks("A: 1\n\n \t\nB: 2\n");
        assert_eq!(b.len(), 3);
        assert!(b[1].is_empty());
        assert_eq!(b[2].get("b"), Some("2"));
    }

    #[test]
    fn test_error_keeps_completed_fields() {
        let mut reader = HeaderReader::new("A: 1\nB: two\n  folded\nbroken line\n".as_bytes());
        assert!(reader.read_block().is_err());

        let partial = reader.take_interrupted();
        assert_eq!(partial.len(), 2);
        assert_eq!(partial.get("b"), Some("two folded"));
        assert!(reader.take_interrupted().is_empty());
    }

    #[test]
    fn test_latin1_fallback() {
        let mut reader = HeaderReader::new(&b"X-Name: M\xfcller\n\n"[..]);
        let b = reader.read_block().unwrap().unwrap();
        assert_eq!(b.get("x-name"), Some("Müller"));
    }
}
