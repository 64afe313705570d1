//! Message framing and RFC 3464 report decoding.
//!
//! `header` and `multipart` implement the line-level framing, `media_type`
//! inspects `Content-Type`, and `report` ties them together into [`crate::Dsn`].

pub mod date;
pub mod header;
pub mod mbox;
pub mod media_type;
pub mod message;
pub mod multipart;
pub mod report;
