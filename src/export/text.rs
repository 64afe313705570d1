//! Human-readable rendering of a report.

use std::io::Write;

use crate::model::dsn::Dsn;
use crate::model::extensions::Extensions;
use crate::model::recipient::RecipientRecord;
use crate::model::type_value::TypeValueField;

/// Write `dsn` as aligned `Label: value` lines, one section per recipient.
///
/// Absent optional fields are omitted. Extension fields are listed after the
/// standard ones when `show_extensions` is set.
pub fn write_dsn(out: &mut dyn Write, dsn: &Dsn, show_extensions: bool) -> std::io::Result<()> {
    field(out, "Reporting-MTA", &dsn.reporting_mta.to_string())?;
    field(out, "Original-Envelope-Id", &dsn.original_envelope_id)?;
    optional(out, "DSN-Gateway", &dsn.dsn_gateway)?;
    optional(out, "Received-From-MTA", &dsn.received_from_mta)?;
    field(out, "Arrival-Date", &dsn.arrival_date)?;
    if show_extensions {
        extensions(out, &dsn.extensions)?;
    }

    for (i, r) in dsn.recipients.iter().enumerate() {
        writeln!(out, "\n{}", "-".repeat(72))?;
        writeln!(out, "Recipient {} of {}", i + 1, dsn.recipients.len())?;
        write_recipient(out, r, show_extensions)?;
    }

    Ok(())
}

fn write_recipient(
    out: &mut dyn Write,
    r: &RecipientRecord,
    show_extensions: bool,
) -> std::io::Result<()> {
    optional(out, "Original-Recipient", &r.original_recipient)?;
    field(out, "Final-Recipient", &r.final_recipient.to_string())?;
    field(out, "Action", r.action.as_str())?;

    let status = match r.status_code().and_then(|c| c.class_kind()) {
        Some(class) => format!("{} ({class})", r.status),
        None => r.status.clone(),
    };
    field(out, "Status", &status)?;

    optional(out, "Remote-MTA", &r.remote_mta)?;
    optional(out, "Diagnostic-Code", &r.diagnostic_code)?;
    field(out, "Last-Attempt-Date", r.last_attempt_date.as_deref().unwrap_or(""))?;
    field(out, "Final-Log-ID", r.final_log_id.as_deref().unwrap_or(""))?;
    field(out, "Will-Retry-Until", r.will_retry_until.as_deref().unwrap_or(""))?;
    if show_extensions {
        extensions(out, &r.extensions)?;
    }
    Ok(())
}

/// One-line summary of a recipient for `dsnshell scan`.
///
/// Fields are tab separated: source, action, status, recipient, diagnostic.
pub fn recipient_line(source: &str, r: &RecipientRecord) -> String {
    let diagnostic = r
        .diagnostic_code
        .as_ref()
        .map(|d| d.value.replace('\n', " "))
        .unwrap_or_default();
    format!(
        "{source}\t{}\t{}\t{}\t{diagnostic}",
        r.action, r.status, r.final_recipient.value
    )
}

fn field(out: &mut dyn Write, label: &str, value: &str) -> std::io::Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    // Continuation lines line up under the value column
    let value = value.replace('\n', &format!("\n{:22}", ""));
    writeln!(out, "{:22}{value}", format!("{label}:"))
}

fn optional(
    out: &mut dyn Write,
    label: &str,
    value: &Option<TypeValueField>,
) -> std::io::Result<()> {
    match value {
        Some(v) => field(out, label, &v.to_string()),
        None => Ok(()),
    }
}

fn extensions(out: &mut dyn Write, ext: &Extensions) -> std::io::Result<()> {
    for (name, value) in ext.iter() {
        field(out, name, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::action::RecipientAction;

    fn render(dsn: &Dsn, show_extensions: bool) -> String {
        let mut out = Vec::new();
        write_dsn(&mut out, dsn, show_extensions).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn sample() -> Dsn {
        let mut dsn = Dsn {
            reporting_mta: TypeValueField::parse("dns; cs.utk.edu"),
            ..Dsn::default()
        };
        dsn.extensions.set("X-Postfix-Queue-Id", "ABC123");
        dsn.recipients.push(RecipientRecord {
            final_recipient: TypeValueField::parse("rfc822; louisl@larry.slip.umd.edu"),
            action: RecipientAction::new("failed"),
            status: "4.0.0".into(),
            diagnostic_code: Some(TypeValueField::parse("smtp; 426 connection timed out")),
            ..RecipientRecord::default()
        });
        dsn
    }

    #[test]
    fn test_render() {
        let text = render(&sample(), true);
        assert!(text.starts_with("Reporting-MTA:        dns; cs.utk.edu\n"));
        assert!(text.contains("X-Postfix-Queue-Id:   ABC123"));
        assert!(text.contains("Recipient 1 of 1"));
        assert!(text.contains("Status:               4.0.0 (temporary failure)"));
        assert!(!text.contains("Remote-MTA"));
    }

    #[test]
    fn test_render_without_extensions() {
        assert!(!render(&sample(), false).contains("X-Postfix-Queue-Id"));
    }

    #[test]
    fn test_multiline_value_is_indented() {
        let mut dsn = Dsn::default();
        dsn.arrival_date = "one\ntwo".into();
        assert_eq!(render(&dsn, false), format!("Arrival-Date:         one\n{:22}two\n", ""));
    }

    #[test]
    fn test_recipient_line() {
        let dsn = sample();
        assert_eq!(
            recipient_line("msg#1", &dsn.recipients[0]),
            "msg#1\tfailed\t4.0.0\tlouisl@larry.slip.umd.edu\t426 connection timed out"
        );
    }
}
