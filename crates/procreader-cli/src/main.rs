use std::path::PathBuf;

use clap::{Parser, Subcommand};
use procreader_core::{get_platform, ProcReaderError};
use procreader_proc::{
    clock_ticks_per_second, record_report, top_report, DockerTopRow, ProcFs, ReaderConfig,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Read Linux per-process pseudo-files as typed records.
#[derive(Parser, Debug)]
#[command(name = "procreader", version, about, long_about = None)]
struct Cli {
    /// The format for log output.
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// The minimum log level to display.
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: tracing::Level,

    /// Root of the procfs mount to read from.
    #[arg(
        long,
        value_name = "DIR",
        env = "PROCREADER_PROC_ROOT",
        default_value = "/proc"
    )]
    proc_root: PathBuf,

    /// Clock ticks per second (default: sysconf(_SC_CLK_TCK)).
    #[arg(long, value_name = "N", env = "PROCREADER_HZ")]
    hz: Option<u64>,

    /// Report whatever parsed for partly unreadable processes instead of
    /// skipping them.
    #[arg(long)]
    best_effort: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print parsed stat, statm, status, cmdline and environ records.
    ///
    /// Output is a JSON report. PIDs that cannot be read are listed under
    /// `warnings` and make the exit status non-zero.
    Record(RecordArgs),

    /// Print `docker top` style rows.
    ///
    /// Output is JSON by default, or a `ps -f` like table with --table.
    Top(TopArgs),
}

#[derive(Parser, Debug)]
struct RecordArgs {
    /// Process IDs to read.
    #[arg(value_name = "PID", required = true, num_args = 1..)]
    pids: Vec<u64>,
}

#[derive(Parser, Debug)]
struct TopArgs {
    /// Process IDs to read.
    #[arg(value_name = "PID", required = true, num_args = 1..)]
    pids: Vec<u64>,

    /// Output as human-readable table.
    #[arg(long)]
    table: bool,
}

#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Eq)]
enum LogFormat {
    /// Human-readable text format.
    Text,
    /// Machine-readable JSON format.
    Json,
}

/// Exit status when at least one PID could not be reported in full.
///
/// Kept apart from every `ProcReaderError::error_code()` value.
const EXIT_PARTIAL: i32 = 4;

fn main() {
    let cli = Cli::parse();

    // Initialize the tracing subscriber
    let filter = EnvFilter::from_default_env().add_directive(cli.log_level.into());

    match cli.log_format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    }

    info!("Initialization complete. Starting main logic.");
    let config = ReaderConfig {
        proc_root: cli.proc_root,
        ticks_per_second: cli.hz.unwrap_or_else(clock_ticks_per_second),
        best_effort: cli.best_effort,
    };
    if let Some(command) = cli.command {
        match run_command(command, &config) {
            Ok(exit_code) => {
                info!("Main logic finished.");
                std::process::exit(exit_code);
            }
            Err(err) => {
                eprintln!("Error: {err}");
                std::process::exit(err.error_code());
            }
        }
    } else {
        println!("Platform: {}", get_platform());
    }
    info!("Main logic finished.");
}

fn run_command(command: Command, config: &ReaderConfig) -> Result<i32, ProcReaderError> {
    config.validate()?;
    debug!(
        proc_root = %config.proc_root.display(),
        ticks_per_second = config.ticks_per_second,
        best_effort = config.best_effort,
        "reader configured"
    );
    let source = ProcFs::new(&config.proc_root);

    match command {
        Command::Record(args) => {
            let report = record_report(&args.pids, &source, config);
            print_json(&report)?;
            Ok(exit_status(report.has_failures()))
        }
        Command::Top(args) => {
            let report = top_report(&args.pids, &source, config)?;
            if args.table {
                print_top_table(&report.processes);
                for warning in &report.warnings {
                    eprintln!("warning: {warning}");
                }
            } else {
                print_json(&report)?;
            }
            Ok(exit_status(report.has_failures()))
        }
    }
}

fn exit_status(has_failures: bool) -> i32 {
    if has_failures {
        EXIT_PARTIAL
    } else {
        0
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ProcReaderError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ProcReaderError::internal(format!("failed to serialize report: {e}")))?;
    println!("{json}");
    Ok(())
}

fn print_top_table(rows: &[DockerTopRow]) {
    // Header
    println!(
        "{:>7} {:>7} {:>7} {:>3} {:>5} {:<8} {:>8} {:<8} CMD",
        "UID", "PID", "PPID", "C", "STIME", "TTY", "TIME", "STATE"
    );
    println!("{:-<80}", "");

    if rows.is_empty() {
        println!("(no processes)");
        return;
    }

    for row in rows {
        println!(
            "{:>7} {:>7} {:>7} {:>3} {:>5} {:<8} {:>8} {:<8} {}",
            row.uid,
            row.pid,
            row.ppid,
            row.c,
            format_stime(row.start_time),
            truncate(&row.tty, 8),
            format_cputime(row.cputime),
            truncate(row.state.as_str(), 8),
            truncate(&row.command, 64)
        );
    }
}

/// `HH:MM` of a Unix timestamp in UTC.
fn format_stime(unix_secs: f64) -> String {
    match OffsetDateTime::from_unix_timestamp(unix_secs as i64) {
        Ok(dt) => format!("{:02}:{:02}", dt.hour(), dt.minute()),
        Err(_) => "?".to_string(),
    }
}

/// CPU seconds as `HH:MM:SS`.
fn format_cputime(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

/// Truncate string to max characters (not bytes).
fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}
