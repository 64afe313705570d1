//! `dsnshell`: decode RFC 3464 Delivery Status Notifications.
//!
//! This crate provides the core library for recognizing bounce reports,
//! locating their `message/delivery-status` part and decoding the per-message
//! and per-recipient fields into typed records.

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;

pub use error::{DsnError, Result};
pub use model::action::RecipientAction;
pub use model::dsn::Dsn;
pub use model::extensions::Extensions;
pub use model::recipient::RecipientRecord;
pub use model::status::{StatusClass, StatusCode};
pub use model::type_value::TypeValueField;
pub use parser::message::Message;
pub use parser::report::{is_dsn, parse, parse_bytes, parse_file};
