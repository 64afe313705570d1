//! The top-level delivery status report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::extensions::Extensions;
use super::recipient::RecipientRecord;
use super::type_value::TypeValueField;
use crate::parser::date::parse_date;
use crate::parser::header::HeaderBlock;

/// A decoded RFC 3464 Delivery Status Notification.
///
/// The per-message fields come from the first header block of the
/// `message/delivery-status` part; each later block becomes one entry of
/// `recipients`, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dsn {
    /// Envelope identifier from the original submission (`Original-Envelope-Id`).
    pub original_envelope_id: String,

    /// MTA that generated this report, e.g. `dns; cs.utk.edu`.
    pub reporting_mta: TypeValueField,

    /// Gateway that translated a foreign report into this DSN.
    pub dsn_gateway: Option<TypeValueField>,

    /// MTA the Reporting MTA received the original message from.
    pub received_from_mta: Option<TypeValueField>,

    /// RFC 822 date-time, kept verbatim.
    pub arrival_date: String,

    pub extensions: Extensions,

    pub recipients: Vec<RecipientRecord>,
}

impl Dsn {
    /// Build the per-message part of a report from its header block.
    ///
    /// `recipients` starts out empty.
    pub fn from_header_block(block: &HeaderBlock) -> Self {
        let mut dsn = Self::default();

        for (name, values) in block.iter() {
            let value = values.join("\n");

            match name {
                "Original-Envelope-Id" => dsn.original_envelope_id = value,
                "Reporting-Mta" => dsn.reporting_mta = TypeValueField::parse(&value),
                "Dsn-Gateway" => dsn.dsn_gateway = Some(TypeValueField::parse(&value)),
                "Received-From-Mta" => dsn.received_from_mta = Some(TypeValueField::parse(&value)),
                "Arrival-Date" => dsn.arrival_date = value,
                _ => dsn.extensions.set(name, value),
            }
        }

        dsn
    }

    /// `Arrival-Date` as a UTC timestamp, if it parses.
    pub fn arrival_date_utc(&self) -> Option<DateTime<Utc>> {
        parse_date(&self.arrival_date)
    }

    /// Recipients whose action is `failed`.
    pub fn failed_recipients(&self) -> impl Iterator<Item = &RecipientRecord> {
        self.recipients.iter().filter(|r| r.action.is_failed())
    }
}
