//! JSON rendering of decoded reports.

use std::io::Write;

use serde_json::{json, Value};

use crate::model::dsn::Dsn;

/// Write `dsn` as pretty-printed JSON followed by a newline.
pub fn write_dsn(out: &mut dyn Write, dsn: &Dsn) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, dsn)?;
    writeln!(out)?;
    Ok(())
}

/// One JSON object per line for `dsnshell scan`.
///
/// Adds the message offset and subject next to the report. With
/// `only_failed`, non-failed recipients are dropped from the output.
pub fn scan_record(
    offset: u64,
    subject: &str,
    dsn: &Dsn,
    only_failed: bool,
    error: Option<&str>,
) -> Value {
    let recipients: Vec<Value> = dsn
        .recipients
        .iter()
        .filter(|r| !only_failed || r.action.is_failed())
        .map(|r| {
            let mut value = serde_json::to_value(r).unwrap_or(Value::Null);
            if let (Some(obj), Some(code)) = (value.as_object_mut(), r.status_code()) {
                obj.insert(
                    "status_class".to_string(),
                    json!(code.class_kind()),
                );
            }
            value
        })
        .collect();

    json!({
        "offset": offset,
        "subject": subject,
        "reporting_mta": dsn.reporting_mta,
        "arrival_date": dsn.arrival_date,
        "recipients": recipients,
        "error": error,
    })
}
