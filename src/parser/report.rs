//! RFC 3464 report decoding: envelope check, part location and block parsing.

use std::io::BufRead;
use std::path::Path;

use tracing::debug;

use crate::error::{DsnError, Result};
use crate::model::dsn::Dsn;
use crate::model::recipient::RecipientRecord;
use crate::parser::header::HeaderReader;
use crate::parser::media_type::{is_delivery_status, report_boundary};
use crate::parser::message::Message;
use crate::parser::multipart::{MultipartReader, Part};

/// Decode the Delivery Status Notification carried by `message`.
///
/// `None` yields [`DsnError::NilMessage`]. If the recipient blocks cannot be
/// read to the end, the error is [`DsnError::Incomplete`] and carries every
/// record decoded so far.
///
/// ```no_run
/// use dsnshell::parser::message::Message;
///
/// let mut msg = Message::open("bounce.eml")?;
/// let dsn = dsnshell::parse(Some(&mut msg))?;
/// for r in dsn.failed_recipients() {
///     println!("{} {}", r.final_recipient.value, r.status);
/// }
/// # Ok::<(), dsnshell::error::DsnError>(())
/// ```
pub fn parse<R: BufRead>(message: Option<&mut Message<R>>) -> Result<Dsn> {
    let message = message.ok_or(DsnError::NilMessage)?;

    let boundary = report_boundary(&message.headers)?;
    let mut multipart = MultipartReader::new(&mut message.body, &boundary);
    let part = find_report(&mut multipart)?;

    parse_report(part)
}

/// Whether `message` has a `multipart/report` envelope with a boundary.
///
/// Only the headers are inspected; the body is left untouched.
pub fn is_dsn<R>(message: Option<&Message<R>>) -> bool {
    message.is_some_and(|m| report_boundary(&m.headers).is_ok())
}

/// Parse a complete raw message held in memory.
pub fn parse_bytes(raw: &[u8]) -> Result<Dsn> {
    let mut message = Message::from_bytes(raw)?;
    parse(Some(&mut message))
}

/// Parse an `.eml` file.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Dsn> {
    let mut message = Message::open(path)?;
    parse(Some(&mut message))
}

/// First part whose `Content-Type` is `message/delivery-status`.
///
/// Later delivery-status parts, if any, are never looked at.
fn find_report<R: BufRead>(multipart: &mut MultipartReader<R>) -> Result<Part<'_, R>> {
    match multipart.find_part(is_delivery_status)? {
        Some(part) => {
            debug!(part = part.index(), "found message/delivery-status part");
            Ok(part)
        }
        None => Err(DsnError::DsnPartNotFound),
    }
}

/// Read the message block, then recipient blocks until the part is exhausted.
///
/// When a recipient block is cut short, the fields read before the error
/// still become a record of the partial result.
fn parse_report<R: BufRead>(part: R) -> Result<Dsn> {
    let mut reader = HeaderReader::new(part);

    let mut dsn = match reader.read_block()? {
        Some(block) => Dsn::from_header_block(&block),
        None => return Ok(Dsn::default()),
    };

    loop {
        match reader.read_block() {
            Ok(Some(block)) if block.is_empty() => continue,
            Ok(Some(block)) => dsn
                .recipients
                .push(RecipientRecord::from_header_block(&block)),
            Ok(None) => return Ok(dsn),
            Err(err) => {
                let interrupted = reader.take_interrupted();
                if !interrupted.is_empty() {
                    dsn.recipients
                        .push(RecipientRecord::from_header_block(&interrupted));
                }
                return Err(DsnError::Incomplete {
                    partial: Box::new(dsn),
                    source: Box::new(err),
                })
            }
        }
    }
}
