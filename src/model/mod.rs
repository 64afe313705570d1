//! Data model for decoded delivery status reports.

pub mod action;
pub mod dsn;
pub mod extensions;
pub mod recipient;
pub mod status;
pub mod type_value;
