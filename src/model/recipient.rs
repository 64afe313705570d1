//! Per-recipient DSN fields (RFC 3464 section 2.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::RecipientAction;
use super::extensions::Extensions;
use super::status::StatusCode;
use super::type_value::TypeValueField;
use crate::parser::date::parse_date;
use crate::parser::header::HeaderBlock;

/// Delivery outcome for one recipient of the original message.
///
/// `final_recipient`, `action` and `status` are mandatory in the RFC, but a
/// block missing them still yields a record with those fields left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientRecord {
    /// Recipient address as given by the sender (`Original-Recipient`).
    pub original_recipient: Option<TypeValueField>,

    /// Recipient this block applies to, as seen by the Reporting MTA.
    pub final_recipient: TypeValueField,

    pub action: RecipientAction,

    /// Dotted status code, e.g. `5.1.1`, possibly followed by a comment.
    /// See [`RecipientRecord::status_code`].
    pub status: String,

    /// MTA that reported the status to the Reporting MTA.
    pub remote_mta: Option<TypeValueField>,

    /// Transport-specific diagnostic, e.g. `smtp; 550 user unknown`.
    pub diagnostic_code: Option<TypeValueField>,

    /// RFC 822 date-time, kept verbatim.
    pub last_attempt_date: Option<String>,

    pub final_log_id: Option<String>,

    /// RFC 822 date-time, kept verbatim. Only meaningful for `delayed`.
    pub will_retry_until: Option<String>,

    /// Every field not listed above, keyed by canonical name.
    pub extensions: Extensions,
}

impl RecipientRecord {
    /// Build a record from one per-recipient header block.
    ///
    /// Repeated fields are joined with `\n`. Unrecognized names always land in
    /// [`Extensions`].
    pub fn from_header_block(block: &HeaderBlock) -> Self {
        let mut record = Self::default();

        for (name, values) in block.iter() {
            let value = values.join("\n");

            match name {
                "Original-Recipient" => {
                    record.original_recipient = Some(TypeValueField::parse(&value))
                }
                "Final-Recipient" => record.final_recipient = TypeValueField::parse(&value),
                "Action" => record.action = RecipientAction::new(value),
                "Status" => record.status = value,
                "Remote-Mta" => record.remote_mta = Some(TypeValueField::parse(&value)),
                "Diagnostic-Code" => record.diagnostic_code = Some(TypeValueField::parse(&value)),
                "Last-Attempt-Date" => record.last_attempt_date = Some(value),
                "Final-Log-Id" => record.final_log_id = Some(value),
                "Will-Retry-Until" => record.will_retry_until = Some(value),
                _ => record.extensions.set(name, value),
            }
        }

        record
    }

    /// Decoded `Status`, or `None` when it is not a well-formed code.
    pub fn status_code(&self) -> Option<StatusCode> {
        StatusCode::parse(&self.status)
    }

    /// `Last-Attempt-Date` as a UTC timestamp, if it parses.
    pub fn last_attempt_date_utc(&self) -> Option<DateTime<Utc>> {
        self.last_attempt_date.as_deref().and_then(parse_date)
    }

    /// `Will-Retry-Until` as a UTC timestamp, if it parses.
    pub fn will_retry_until_utc(&self) -> Option<DateTime<Utc>> {
        self.will_retry_until.as_deref().and_then(parse_date)
    }
}
