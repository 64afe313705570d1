//! Streaming `multipart/*` body reader.
//!
//! Parts are produced one at a time and their bodies are read lazily, so a
//! report is scanned in a single forward pass without buffering the whole
//! message.

use std::io::{self, BufRead, Read};

use tracing::trace;

use crate::error::{DsnError, Result};
use crate::parser::header::{HeaderBlock, HeaderReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Before the first delimiter line.
    Preamble,
    /// A part body is being (or can be) read.
    InPart,
    /// The current part body hit its closing delimiter.
    PartDone,
    /// The final `--boundary--` line was consumed.
    Finished,
}

/// Reader over the parts of a multipart body delimited by `boundary`.
pub struct MultipartReader<R> {
    inner: R,
    /// `--boundary`
    delimiter: Vec<u8>,
    state: State,
    parts_read: usize,
    /// Delimiter line that ended the last part, consumed by the next `next_part`.
    pending_delimiter: Option<Vec<u8>>,
    /// Body line held back until we know whether a delimiter follows it.
    held: Option<Vec<u8>>,
    /// Body bytes ready to hand out.
    out: Vec<u8>,
    out_pos: usize,
}

impl<R: BufRead> MultipartReader<R> {
    pub fn new(inner: R, boundary: &str) -> Self {
        let mut delimiter = Vec::with_capacity(boundary.len() + 2);
        delimiter.extend_from_slice(b"--");
        delimiter.extend_from_slice(boundary.as_bytes());
        Self {
            inner,
            delimiter,
            state: State::Preamble,
            parts_read: 0,
            pending_delimiter: None,
            held: None,
            out: Vec::new(),
            out_pos: 0,
        }
    }

    /// Advance to the next part, skipping whatever is left of the current one.
    ///
    /// Returns `Ok(None)` after the closing `--boundary--` line. Reaching the
    /// end of the stream before that line is a framing error.
    pub fn next_part(&mut self) -> Result<Option<Part<'_, R>>> {
        Ok(self.advance()?.map(|headers| Part {
            headers,
            multipart: self,
        }))
    }

    /// First remaining part whose headers satisfy `pred`; earlier parts are skipped.
    pub fn find_part<F>(&mut self, mut pred: F) -> Result<Option<Part<'_, R>>>
    where
        F: FnMut(&HeaderBlock) -> bool,
    {
        while let Some(headers) = self.advance()? {
            if pred(&headers) {
                return Ok(Some(Part {
                    headers,
                    multipart: self,
                }));
            }
        }
        Ok(None)
    }

    /// Move past the next delimiter and read that part's headers.
    fn advance(&mut self) -> Result<Option<HeaderBlock>> {
        if self.state == State::InPart {
            io::copy(&mut PartBody { multipart: &mut *self }, &mut io::sink())?;
        }

        loop {
            if self.state == State::Finished {
                return Ok(None);
            }

            let line = match self.pending_delimiter.take() {
                Some(line) => line,
                None => match read_raw_line(&mut self.inner)? {
                    Some(line) => line,
                    None => {
                        return Err(DsnError::Multipart(format!(
                            "stream ended after {} part(s) without closing boundary",
                            self.parts_read
                        )))
                    }
                },
            };

            if self.is_final_boundary(&line) {
                self.state = State::Finished;
                return Ok(None);
            }

            if self.is_delimiter(&line) {
                let headers = HeaderReader::new(&mut self.inner)
                    .read_block()?
                    .unwrap_or_default();
                self.state = State::InPart;
                self.held = None;
                self.out.clear();
                self.out_pos = 0;
                self.parts_read += 1;
                trace!(part = self.parts_read, fields = headers.len(), "multipart part");
                return Ok(Some(headers));
            }

            if self.state == State::Preamble {
                continue;
            }

            return Err(DsnError::Multipart(format!(
                "unexpected line between parts: {:?}",
                String::from_utf8_lossy(&line)
            )));
        }
    }

    /// Number of parts returned so far.
    pub fn parts_read(&self) -> usize {
        self.parts_read
    }

    fn is_delimiter(&self, line: &[u8]) -> bool {
        line.strip_prefix(self.delimiter.as_slice())
            .is_some_and(only_trailing_whitespace)
    }

    fn is_final_boundary(&self, line: &[u8]) -> bool {
        line.strip_prefix(self.delimiter.as_slice())
            .and_then(|rest| rest.strip_prefix(b"--"))
            .is_some_and(only_trailing_whitespace)
    }

    /// Make body bytes available in `out`. Leaves `out` empty at end of part.
    fn fill_part(&mut self) -> io::Result<()> {
        while self.out_pos >= self.out.len() {
            self.out.clear();
            self.out_pos = 0;

            if self.state != State::InPart {
                return Ok(());
            }

            let Some(line) = read_raw_line(&mut self.inner)? else {
                // Hand out the last line before reporting the truncation
                if let Some(last) = self.held.take() {
                    self.out = last;
                    continue;
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "multipart: part body not terminated by a boundary",
                ));
            };

            if self.is_delimiter(&line) || self.is_final_boundary(&line) {
                // The line break before a delimiter belongs to the delimiter.
                if let Some(mut last) = self.held.take() {
                    strip_line_break(&mut last);
                    self.out = last;
                }
                self.pending_delimiter = Some(line);
                self.state = State::PartDone;
            } else if let Some(prev) = self.held.replace(line) {
                self.out = prev;
            }
        }
        Ok(())
    }
}

/// One part of a multipart body.
///
/// The body is streamed through [`Read`] / [`BufRead`] and ends at the next
/// delimiter line.
pub struct Part<'a, R> {
    pub headers: HeaderBlock,
    multipart: &'a mut MultipartReader<R>,
}

impl<R> Part<'_, R> {
    /// 1-based position of this part in the multipart body.
    pub fn index(&self) -> usize {
        self.multipart.parts_read
    }
}

impl<R> std::fmt::Debug for Part<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Part").field("headers", &self.headers).finish()
    }
}

impl<R: BufRead> Read for Part<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        PartBody {
            multipart: &mut *self.multipart,
        }
        .read(buf)
    }
}

impl<R: BufRead> BufRead for Part<'_, R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.multipart.fill_part()?;
        Ok(&self.multipart.out[self.multipart.out_pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.multipart.out_pos = (self.multipart.out_pos + amt).min(self.multipart.out.len());
    }
}

/// Body cursor used both by [`Part`] and for draining skipped parts.
struct PartBody<'a, R> {
    multipart: &'a mut MultipartReader<R>,
}

impl<R: BufRead> Read for PartBody<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mp = &mut *self.multipart;
        mp.fill_part()?;
        let available = &mp.out[mp.out_pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        mp.out_pos += n;
        Ok(n)
    }
}

/// One raw line including its terminator, or `None` at end of stream.
fn read_raw_line<R: BufRead>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    let n = reader.read_until(b'\n', &mut line)?;
    Ok((n > 0).then_some(line))
}

fn only_trailing_whitespace(rest: &[u8]) -> bool {
    rest.iter().all(|&b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}

fn strip_line_break(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}
