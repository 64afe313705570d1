//! Streaming MBOX splitter used by `dsnshell scan`.
//!
//! Reads the file line by line through a large buffer and hands each message
//! to a callback. Never loads the entire file into memory.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{DsnError, Result};

/// Default read buffer size (1 MB).
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Default maximum message size in bytes (64 MB). Bounces are small; anything
/// larger is truncated.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// How often the progress callback fires, in bytes.
const PROGRESS_INTERVAL: u64 = 4 * 1024 * 1024;

/// Splits an MBOX file into raw messages.
///
/// Tolerates mixed line endings, a UTF-8 BOM, truncated final messages and
/// `From ` separators without a preceding blank line (logged).
pub struct MboxParser {
    path: PathBuf,
    file_size: u64,
    buffer_size: usize,
    max_message_size: usize,
}

/// Accumulates the lines of the message currently being read.
struct Pending {
    offset: u64,
    data: Vec<u8>,
    truncated: bool,
}

impl MboxParser {
    /// Create a parser for the given MBOX file.
    ///
    /// Checks that the file exists but not that it is an MBOX.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DsnError::FileNotFound(path.clone())
            } else {
                DsnError::Io(e)
            }
        })?;
        Ok(Self {
            path,
            file_size: metadata.len(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        })
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(4096);
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Total size of the underlying file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Walk the file, calling `on_message(offset, raw_bytes)` per message.
    ///
    /// `raw_bytes` starts with the `From ` separator line. Return `false` from
    /// the callback to stop early. Returns the number of messages delivered.
    pub fn parse(
        &self,
        on_message: &mut dyn FnMut(u64, &[u8]) -> bool,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<u64> {
        if self.file_size == 0 {
            return Ok(0);
        }

        let file = File::open(&self.path)?;
        let mut reader = BufReader::with_capacity(self.buffer_size, file);

        let mut count = 0u64;
        let mut offset = 0u64;
        let mut last_progress = 0u64;
        let mut prev_blank = true;
        let mut current: Option<Pending> = None;
        let mut line = Vec::with_capacity(4096);

        loop {
            line.clear();
            let n = reader.read_until(b'\n', &mut line)? as u64;
            if n == 0 {
                break;
            }

            if is_mbox_separator(&line) {
                if !prev_blank && current.is_some() {
                    warn!(offset, "Found 'From ' separator without preceding blank line");
                }
                if let Some(done) = current.take() {
                    count += 1;
                    if !on_message(done.offset, &done.data) {
                        return Ok(count);
                    }
                }
                current = Some(Pending {
                    offset,
                    data: line.clone(),
                    truncated: false,
                });
            } else if let Some(msg) = current.as_mut() {
                if msg.data.len() + line.len() <= self.max_message_size {
                    msg.data.extend_from_slice(&line);
                } else if !msg.truncated {
                    warn!(
                        offset = msg.offset,
                        max_size = self.max_message_size,
                        "Message exceeds maximum size, truncating"
                    );
                    msg.truncated = true;
                }
            }
            // Anything before the first separator is not part of a message

            prev_blank = is_blank_line(&line);
            offset += n;

            if let Some(cb) = progress {
                if offset - last_progress >= PROGRESS_INTERVAL {
                    cb(offset, self.file_size);
                    last_progress = offset;
                }
            }
        }

        if let Some(done) = current.take() {
            count += 1;
            on_message(done.offset, &done.data);
        }

        if let Some(cb) = progress {
            cb(self.file_size, self.file_size);
        }

        Ok(count)
    }
}

/// Check whether a line is an MBOX separator (`From ` at the start).
fn is_mbox_separator(line: &[u8]) -> bool {
    line.strip_prefix(&[0xEF, 0xBB, 0xBF])
        .unwrap_or(line)
        .starts_with(b"From ")
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| matches!(b, b'\n' | b'\r' | b' ' | b'\t'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_mbox_separator() {
        assert!(is_mbox_separator(
            b"From MAILER-DAEMON Thu Jul  7 17:16:05 1994\n"
        ));
        assert!(!is_mbox_separator(b"from user@example.com\n"));
        assert!(!is_mbox_separator(b">From user@example.com\n"));
        assert!(!is_mbox_separator(b"Subject: From here\n"));

        let mut bom = vec![0xEF, 0xBB, 0xBF];
        bom.extend_from_slice(b"From a@b Thu Jan 01 00:00:00 2024\n");
        assert!(is_mbox_separator(&bom));
    }

    #[test]
    fn test_is_blank_line() {
        assert!(is_blank_line(b"\n"));
        assert!(is_blank_line(b"\r\n"));
        assert!(is_blank_line(b"  \n"));
        assert!(!is_blank_line(b"hello\n"));
    }

    #[test]
    fn test_split_messages() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "From a Thu Jan 01 00:00:00 2024\nSubject: one\n\nbody\n>From not a separator\n\n\
             From b Thu Jan 01 00:00:00 2024\nSubject: two\n\nbody two"
        )
        .unwrap();

        let parser = MboxParser::new(file.path()).unwrap();
        let mut seen = Vec::new();
        let count = parser
            .parse(
                &mut |offset, data| {
                    seen.push((offset, String::from_utf8_lossy(data).into_owned()));
                    true
                },
                None,
            )
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(seen[0].0, 0);
        assert!(seen[0].1.contains(">From not a separator"));
        assert!(seen[1].1.starts_with("From b"));
        assert!(seen[1].1.ends_with("body two"));
    }

    #[test]
    fn test_stop_early() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "From a x\n\nFrom b x\n\nFrom c x\n").unwrap();
        let parser = MboxParser::new(file.path()).unwrap();
        let count = parser.parse(&mut |_, _| false, None).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_truncates_oversized_message() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "From a x\n{}\n", "y".repeat(100)).unwrap();
        let parser = MboxParser::new(file.path())
            .unwrap()
            .with_max_message_size(20);
        let mut len = 0;
        parser
            .parse(
                &mut |_, data| {
                    len = data.len();
                    true
                },
                None,
            )
            .unwrap();
        assert_eq!(len, "From a x\n".len());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            MboxParser::new("/no/such/file.mbox"),
            Err(DsnError::FileNotFound(_))
        ));
    }
}
