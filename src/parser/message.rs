//! Minimal RFC 5322 framing: a header block followed by a body stream.

use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{DsnError, Result};
use crate::parser::header::{HeaderBlock, HeaderReader};

/// A mail message split into its parsed headers and an unread body.
#[derive(Debug)]
pub struct Message<R> {
    pub headers: HeaderBlock,
    pub body: R,
}

impl<R: BufRead> Message<R> {
    /// Read the header block from `reader`, leaving it positioned at the body.
    ///
    /// A leading UTF-8 BOM or MBOX `From ` separator line is skipped.
    pub fn read(mut reader: R) -> Result<Self> {
        skip_bom(&mut reader)?;
        skip_from_line(&mut reader)?;

        let headers = HeaderReader::new(&mut reader)
            .read_block()?
            .unwrap_or_default();

        Ok(Self {
            headers,
            body: reader,
        })
    }
}

impl<'a> Message<&'a [u8]> {
    /// Split an in-memory message.
    pub fn from_bytes(raw: &'a [u8]) -> Result<Self> {
        Self::read(raw)
    }
}

impl Message<BufReader<std::fs::File>> {
    /// Open an `.eml` file and read its headers.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DsnError::FileNotFound(path.to_path_buf())
            } else {
                DsnError::Io(e)
            }
        })?;
        Self::read(BufReader::new(file))
    }
}

impl<R> Message<R> {
    /// Content of the `Subject` header, or `""`.
    pub fn subject(&self) -> &str {
        self.headers.get("Subject").unwrap_or("")
    }
}

fn skip_bom<R: BufRead>(reader: &mut R) -> Result<()> {
    if reader.fill_buf()?.starts_with(&[0xEF, 0xBB, 0xBF]) {
        reader.consume(3);
    }
    Ok(())
}

/// Skip the `From ` separator line at the start of MBOX messages.
fn skip_from_line<R: BufRead>(reader: &mut R) -> Result<()> {
    if reader.fill_buf()?.starts_with(b"From ") {
        let mut discard = Vec::new();
        reader.read_until(b'\n', &mut discard)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_split_headers_and_body() {
        let mut msg = Message::from_bytes(b"Subject: Test\nX-A: 1\n\nBody here\n").unwrap();
        assert_eq!(msg.subject(), "Test");
        assert_eq!(msg.headers.get("x-a"), Some("1"));
        let mut body = String::new();
        msg.body.read_to_string(&mut body).unwrap();
        assert_eq!(body, "Body here\n");
    }

    #[test]
    fn test_skip_from_line() {
        let data = b"From user@example.com Thu Jan 01 00:00:00 2024\nSubject: Test\n\nBody\n";
        let msg = Message::from_bytes(data).unwrap();
        assert_eq!(msg.subject(), "Test");
    }

    #[test]
    fn test_skip_bom() {
        let data = b"\xEF\xBB\xBFSubject: Hi\n\n";
        let msg = Message::from_bytes(data).unwrap();
        assert_eq!(msg.subject(), "Hi");
    }

    #[test]
    fn test_headers_only() {
        let msg = Message::from_bytes(b"Subject: no body").unwrap();
        assert_eq!(msg.subject(), "no body");
        assert!(msg.body.is_empty());
    }

    #[test]
    fn test_open_missing_file() {
        let err = Message::open("/definitely/not/here.eml").unwrap_err();
        assert!(matches!(err, DsnError::FileNotFound(_)));
    }
}
