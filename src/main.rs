//! CLI entry point for `dsnshell`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use dsnshell::config::{Config, OutputFormat};
use dsnshell::export::{csv, json, text};
use dsnshell::parser::mbox::MboxParser;
use dsnshell::{Dsn, DsnError, Message};

#[derive(Parser)]
#[command(
    name = "dsnshell",
    version,
    about = "Decode RFC 3464 delivery status notifications (bounces)"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse one message and print its delivery status report
    Parse {
        path: PathBuf,
        /// Print JSON
        #[arg(long, conflicts_with = "csv")]
        json: bool,
        /// Print one CSV row per recipient
        #[arg(long)]
        csv: bool,
    },
    /// Exit with status 0 if the message is a delivery status report, 1 otherwise
    Check { path: PathBuf },
    /// Report every delivery status notification in an MBOX file
    Scan {
        path: PathBuf,
        /// Print one JSON object per report
        #[arg(long)]
        json: bool,
        /// Only report recipients whose action is `failed`
        #[arg(long)]
        only_failed: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = dsnshell::config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Parse { path, json, csv } => {
            let format = if json {
                OutputFormat::Json
            } else if csv {
                OutputFormat::Csv
            } else {
                config.output.format
            };
            cmd_parse(&path, format, &config)
        }
        Commands::Check { path } => cmd_check(&path),
        Commands::Scan {
            path,
            json,
            only_failed,
        } => cmd_scan(&path, json, only_failed || config.scan.only_failed, &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = dsnshell::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "dsnshell.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "dsnshell", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let man = clap_mangen::Man::new(Cli::command());
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}

/// Parse one `.eml` file and print the report.
///
/// A truncated report is still printed before the error is returned.
fn cmd_parse(path: &Path, format: OutputFormat, config: &Config) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let (dsn, error) = match dsnshell::parse_file(path) {
        Ok(dsn) => (dsn, None),
        Err(DsnError::Incomplete { partial, source }) => (*partial, Some(*source)),
        Err(e) => return Err(e.into()),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Text => text::write_dsn(&mut out, &dsn, config.output.show_extensions)?,
        OutputFormat::Json => json::write_dsn(&mut out, &dsn)?,
        OutputFormat::Csv => {
            let sep = config.output.csv_separator;
            csv::write_header(&mut out, sep)?;
            csv::write_rows(&mut out, &path.display().to_string(), &dsn, sep, false)?;
        }
    }
    out.flush()?;

    match error {
        Some(e) => anyhow::bail!(
            "report truncated after {} recipient(s): {e}",
            dsn.recipients.len()
        ),
        None => Ok(()),
    }
}

/// Exit 0 when the file looks like a delivery status report, 1 otherwise.
fn cmd_check(path: &Path) -> anyhow::Result<()> {
    let message = Message::open(path)?;
    let is_dsn = dsnshell::is_dsn(Some(&message));
    println!(
        "{}: {}",
        path.display(),
        if is_dsn { "delivery status notification" } else { "not a DSN" }
    );
    if !is_dsn {
        std::process::exit(1);
    }
    Ok(())
}

#[derive(Default)]
struct ScanStats {
    messages: u64,
    reports: u64,
    recipients: u64,
    failed: u64,
    errors: u64,
}

/// Stream an MBOX file and report every DSN found in it.
fn cmd_scan(path: &Path, as_json: bool, only_failed: bool, config: &Config) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let parser = MboxParser::new(path)?
        .with_buffer_size(config.scan.read_buffer_size)
        .with_max_message_size(config.scan.max_message_size);
    let file_size = parser.file_size();

    let pb = ProgressBar::new(file_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} Scanning [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut stats = ScanStats::default();
    let mut write_error: Option<std::io::Error> = None;

    parser.parse(
        &mut |offset, data| {
            stats.messages += 1;
            let Some((dsn, subject, error)) = decode(offset, data) else {
                return true;
            };
            stats.reports += 1;
            stats.recipients += dsn.recipients.len() as u64;
            stats.failed += dsn.failed_recipients().count() as u64;
            if error.is_some() {
                stats.errors += 1;
            }

            let written = if as_json {
                let record = json::scan_record(offset, &subject, &dsn, only_failed, error.as_deref());
                writeln!(out, "{record}")
            } else {
                dsn.recipients
                    .iter()
                    .filter(|r| !only_failed || r.action.is_failed())
                    .try_for_each(|r| writeln!(out, "{}", text::recipient_line(&offset.to_string(), r)))
            };
            match written {
                Ok(()) => true,
                Err(e) => {
                    write_error = Some(e);
                    false
                }
            }
        },
        Some(&|current, total| {
            pb.set_length(total);
            pb.set_position(current);
        }),
    )?;

    pb.finish_and_clear();
    if let Some(e) = write_error {
        return Err(e.into());
    }
    out.flush()?;

    print_scan_summary(path, file_size, &stats, start.elapsed());
    Ok(())
}

/// Decode one raw mbox message.
///
/// Returns `None` for messages that are not DSNs. Parse failures are logged;
/// whatever was decoded before the failure is still returned.
fn decode(offset: u64, data: &[u8]) -> Option<(Dsn, String, Option<String>)> {
    let mut message = match Message::from_bytes(data) {
        Ok(m) => m,
        Err(e) => {
            warn!(offset, error = %e, "Unreadable message headers");
            return None;
        }
    };
    if !dsnshell::is_dsn(Some(&message)) {
        return None;
    }

    let subject = message.subject().to_string();
    match dsnshell::parse(Some(&mut message)) {
        Ok(dsn) => Some((dsn, subject, None)),
        Err(e) => {
            warn!(offset, error = %e, "Failed to parse delivery status report");
            let reason = e.root_cause().to_string();
            let dsn = e.into_partial().unwrap_or_default();
            Some((dsn, subject, Some(reason)))
        }
    }
}

fn print_scan_summary(path: &Path, file_size: u64, stats: &ScanStats, elapsed: std::time::Duration) {
    use humansize::{format_size, BINARY};

    eprintln!();
    eprintln!("  File:        {}", path.display());
    eprintln!("  Scanned:     {}", format_size(file_size, BINARY));
    eprintln!("  Messages:    {}", stats.messages);
    eprintln!("  Reports:     {}", stats.reports);
    eprintln!("  Recipients:  {}", stats.recipients);
    eprintln!("  Failed:      {}", stats.failed);
    eprintln!("  Errors:      {}", stats.errors);
    eprintln!("  Time:        {:.2}s", elapsed.as_secs_f64());
}
