//! Centralized error types for dsnshell.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::dsn::Dsn;

/// All errors produced by the dsnshell library.
#[derive(Error, Debug)]
pub enum DsnError {
    /// No message was supplied to the decoder.
    #[error("Message is missing")]
    NilMessage,

    /// The outer `Content-Type` is not a `multipart/report` with a boundary.
    ///
    /// Valid examples:
    /// - `multipart/report; report-type=delivery-status; boundary="RAA14128.773615765/CS.UTK.EDU"`
    /// - `multipart/report; report-type="delivery-status"; boundary="RAA14128.773615765/CS.UTK.EDU"`
    #[error("Invalid Content-Type header")]
    InvalidContentTypeHeader,

    /// The multipart body ended without a `message/delivery-status` part.
    #[error("DSN part not found in message body")]
    DsnPartNotFound,

    /// A header line that is neither `Name: value` nor a continuation.
    #[error("Malformed header line: {0:?}")]
    MalformedHeader(String),

    /// Broken multipart framing between parts.
    #[error("Multipart framing error: {0}")]
    Multipart(String),

    /// I/O error from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The recipient blocks could not be read to the end.
    ///
    /// Carries every record decoded before the failure.
    #[error(
        "Delivery status truncated after {} recipient(s): {source}",
        .partial.recipients.len()
    )]
    Incomplete {
        partial: Box<Dsn>,
        source: Box<DsnError>,
    },

    /// The specified file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

/// Convenience alias for `Result<T, DsnError>`.
pub type Result<T> = std::result::Result<T, DsnError>;

impl DsnError {
    /// The partially decoded report, if this error interrupted the recipient loop.
    pub fn partial(&self) -> Option<&Dsn> {
        match self {
            Self::Incomplete { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Take ownership of the partially decoded report.
    pub fn into_partial(self) -> Option<Dsn> {
        match self {
            Self::Incomplete { partial, .. } => Some(*partial),
            _ => None,
        }
    }

    /// The error underneath any `Incomplete` wrapper.
    pub fn root_cause(&self) -> &DsnError {
        match self {
            Self::Incomplete { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
