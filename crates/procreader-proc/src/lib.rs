//! procreader-proc: typed records from Linux per-process pseudo-files
//!
//! Reads `/proc/[pid]/{stat,statm,status,cmdline,environ}` into strongly typed
//! records and derives the values `ps` and `docker top` print from them.
//!
//! ## Layers
//!
//! | Layer | Items |
//! |-------|-------|
//! | Raw bytes | [`SourceProvider`], [`ProcFs`], [`FixtureSource`] |
//! | Parsers | [`parse_stat`], [`parse_statm`], [`parse_status`], [`parse_nul_list`] |
//! | Records | [`ProcessRecord`], [`read_process`], [`read_process_partial`] |
//! | Metrics | [`derive_metrics`], [`TtyDriverTable`], [`SystemFacts`] |
//! | Reports | [`record_report`], [`top_report`] |
//!
//! Parsers are pure functions of their input. Only the source and the
//! system-fact loaders touch the filesystem.
//!
//! ## Example
//!
//! ```rust,no_run
//! use procreader_proc::{derive_metrics_from_source, read_process, ProcFs, ReaderConfig};
//!
//! let config = ReaderConfig::default();
//! let source = ProcFs::new(&config.proc_root);
//! let record = read_process(std::process::id() as u64, &source, &config).unwrap();
//! let metrics = derive_metrics_from_source(&record, &source, &config).unwrap();
//! println!("{} {:.1}% {}", record.stat.comm, metrics.pcpu, metrics.state);
//! ```

use procreader_core::schema::{DOCKER_TOP_V1, PROCESS_RECORD_V1};
use procreader_core::ProcReaderResult;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub mod config;
pub mod docker;
pub mod list;
pub mod metrics;
pub mod record;
pub mod source;
pub mod stat;
pub mod statm;
pub mod status;
pub mod system;
pub mod tty;

pub use config::{clock_ticks_per_second, page_size, ReaderConfig};
pub use docker::DockerTopRow;
pub use list::parse_nul_list;
pub use metrics::{
    derive_metrics, derive_metrics_from_source, DerivedMetrics, DivisionHazard, HumanState,
    StateFlag,
};
pub use record::{read_process, read_process_partial, PartialProcessRecord, ProcessRecord};
pub use source::{FixtureSource, ProcFile, ProcFs, SourceProvider};
pub use stat::{parse_stat, StatFields};
pub use statm::{parse_statm, StatmFields};
pub use status::{parse_status, StatusFields};
pub use system::SystemFacts;
pub use tty::{resolve_tty, TtyDriverTable};

// ============================================================================
// Report envelopes
// ============================================================================

/// A record report entry: complete in strict mode, possibly partial in
/// best-effort mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordEntry {
    Complete(ProcessRecord),
    Partial(PartialProcessRecord),
}

impl RecordEntry {
    pub fn pid(&self) -> u64 {
        match self {
            RecordEntry::Complete(record) => record.pid,
            RecordEntry::Partial(partial) => partial.pid,
        }
    }
}

/// Parsed records for a set of PIDs.
#[derive(Debug, Clone, Serialize)]
pub struct RecordReport {
    /// Schema identifier for version detection.
    pub schema_id: &'static str,

    /// Report timestamp (RFC 3339).
    pub timestamp: String,

    pub processes: Vec<RecordEntry>,

    /// One entry per PID that could not be read.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RecordReport {
    /// True when at least one PID could not be read in full.
    pub fn has_failures(&self) -> bool {
        !self.warnings.is_empty()
            || self
                .processes
                .iter()
                .any(|entry| matches!(entry, RecordEntry::Partial(_)))
    }
}

/// `docker top` rows for a set of PIDs.
#[derive(Debug, Clone, Serialize)]
pub struct TopReport {
    /// Schema identifier for version detection.
    pub schema_id: &'static str,

    /// Report timestamp (RFC 3339).
    pub timestamp: String,

    pub processes: Vec<DockerTopRow>,

    /// Failed PIDs and metric fallbacks, prefixed with the PID.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    #[serde(skip)]
    failed: usize,
}

impl TopReport {
    /// True when at least one PID produced no row.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

fn current_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Read every PID in `pids`.
///
/// A PID that fails becomes a warning instead of aborting the report. With
/// `config.best_effort`, PIDs that are only partly readable are reported
/// with the sub-records that did parse.
pub fn record_report(
    pids: &[u64],
    source: &dyn SourceProvider,
    config: &ReaderConfig,
) -> RecordReport {
    let mut processes = Vec::with_capacity(pids.len());
    let mut warnings = Vec::new();

    for &pid in pids {
        let entry = if config.best_effort {
            read_process_partial(pid, source, config).map(|partial| match partial.into_complete() {
                Ok(record) => RecordEntry::Complete(record),
                Err(partial) => RecordEntry::Partial(partial),
            })
        } else {
            read_process(pid, source, config).map(RecordEntry::Complete)
        };
        match entry {
            Ok(entry) => processes.push(entry),
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(pid, error = %err, "process skipped");
                warnings.push(format!("pid {pid}: {err}"));
            }
        }
    }

    RecordReport {
        schema_id: PROCESS_RECORD_V1,
        timestamp: current_timestamp(),
        processes,
        warnings,
    }
}

/// Read every PID in `pids` and turn it into a `docker top` row.
///
/// System facts are sampled once for the whole report and the tty driver
/// table is loaded on first use. Failing to read the system facts fails the
/// report; everything per-PID becomes a warning.
pub fn top_report(
    pids: &[u64],
    source: &dyn SourceProvider,
    config: &ReaderConfig,
) -> ProcReaderResult<TopReport> {
    config.validate()?;
    let facts = SystemFacts::load(source)?;
    let no_ttys = TtyDriverTable::default();
    let mut ttys: Option<TtyDriverTable> = None;

    let mut processes = Vec::with_capacity(pids.len());
    let mut warnings = Vec::new();
    let mut failed = 0;

    for &pid in pids {
        let row = read_process(pid, source, config).and_then(|record| {
            if record.stat.tty_nr != 0 && ttys.is_none() {
                ttys = Some(TtyDriverTable::load(source)?);
            }
            let table = ttys.as_ref().unwrap_or(&no_ttys);
            let metrics = derive_metrics(&record, &facts, table, config);
            Ok((DockerTopRow::from_record(&record, &metrics, config), metrics.warnings))
        });
        match row {
            Ok((row, metric_warnings)) => {
                warnings.extend(metric_warnings.into_iter().map(|w| format!("pid {pid}: {w}")));
                processes.push(row);
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(pid, error = %err, "process skipped");
                warnings.push(format!("pid {pid}: {err}"));
                failed += 1;
            }
        }
    }

    Ok(TopReport {
        schema_id: DOCKER_TOP_V1,
        timestamp: current_timestamp(),
        processes,
        warnings,
        failed,
    })
}
