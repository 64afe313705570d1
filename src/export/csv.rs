//! Export recipient records to CSV, one row per recipient.

use std::io::Write;

use crate::model::dsn::Dsn;
use crate::model::type_value::TypeValueField;

const COLUMNS: [&str; 9] = [
    "Source",
    "Reporting_MTA",
    "Arrival_Date",
    "Final_Recipient",
    "Original_Recipient",
    "Action",
    "Status",
    "Remote_MTA",
    "Diagnostic_Code",
];

/// Write the header row.
pub fn write_header(out: &mut dyn Write, separator: char) -> std::io::Result<()> {
    writeln!(out, "{}", COLUMNS.join(&separator.to_string()))
}

/// Write one row per recipient of `dsn`.
///
/// `source` identifies where the report came from (a file name or an mbox
/// offset). With `only_failed`, recipients whose action is not `failed` are
/// skipped. Returns the number of rows written.
pub fn write_rows(
    out: &mut dyn Write,
    source: &str,
    dsn: &Dsn,
    separator: char,
    only_failed: bool,
) -> std::io::Result<usize> {
    let mut rows = 0;
    let sep = separator.to_string();

    for r in dsn
        .recipients
        .iter()
        .filter(|r| !only_failed || r.action.is_failed())
    {
        let fields = [
            source.to_string(),
            dsn.reporting_mta.to_string(),
            dsn.arrival_date.clone(),
            r.final_recipient.value.clone(),
            optional(&r.original_recipient),
            r.action.to_string(),
            r.status.clone(),
            optional(&r.remote_mta),
            optional(&r.diagnostic_code),
        ];
        let row = fields
            .iter()
            .map(|f| csv_escape(f, separator))
            .collect::<Vec<_>>()
            .join(&sep);
        writeln!(out, "{row}")?;
        rows += 1;
    }

    Ok(rows)
}

fn optional(field: &Option<TypeValueField>) -> String {
    field.as_ref().map(ToString::to_string).unwrap_or_default()
}

/// Escape a value for CSV (RFC 4180).
///
/// Wraps in double quotes if the value contains the separator, quotes, or newlines.
fn csv_escape(value: &str, separator: char) -> String {
    if value.contains(separator) || value.contains('"') || value.contains('\n') || value.contains('\r')
    {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
