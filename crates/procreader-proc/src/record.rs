//! Assembling the five per-process files into one record.

use procreader_core::{ProcReaderError, ProcReaderResult};
use serde::Serialize;

use crate::config::ReaderConfig;
use crate::list::parse_nul_list;
use crate::source::{fetch_process_file, ProcFile, SourceProvider};
use crate::stat::{parse_stat, StatFields};
use crate::statm::{parse_statm, StatmFields};
use crate::status::{parse_status, StatusFields};

/// Everything procfs says about one process at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRecord {
    pub pid: u64,
    pub stat: StatFields,
    pub statm: StatmFields,
    pub status: StatusFields,
    pub cmdline: Vec<String>,
    pub environ: Vec<String>,
}

/// Whatever could be read of one process, plus why the rest could not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartialProcessRecord {
    pub pid: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stat: Option<StatFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statm: Option<StatmFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmdline: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environ: Option<Vec<String>>,
    pub warnings: Vec<String>,
}

impl PartialProcessRecord {
    /// True when every sub-record was read.
    pub fn is_complete(&self) -> bool {
        self.stat.is_some()
            && self.statm.is_some()
            && self.status.is_some()
            && self.cmdline.is_some()
            && self.environ.is_some()
    }

    /// Convert into a full record, or give `self` back if anything is missing.
    pub fn into_complete(self) -> Result<ProcessRecord, Self> {
        match self {
            PartialProcessRecord {
                pid,
                stat: Some(stat),
                statm: Some(statm),
                status: Some(status),
                cmdline: Some(cmdline),
                environ: Some(environ),
                ..
            } => Ok(ProcessRecord {
                pid,
                stat,
                statm,
                status,
                cmdline,
                environ,
            }),
            partial => Err(partial),
        }
    }
}

fn check_request(pid: u64, config: &ReaderConfig) -> ProcReaderResult<()> {
    if pid == 0 {
        return Err(ProcReaderError::invalid_argument("PID 0 is not valid"));
    }
    config.validate()
}

fn read_text(source: &dyn SourceProvider, pid: u64, file: ProcFile) -> ProcReaderResult<String> {
    let bytes = fetch_process_file(source, pid, file)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn read_list(source: &dyn SourceProvider, pid: u64, file: ProcFile) -> ProcReaderResult<Vec<String>> {
    Ok(parse_nul_list(&fetch_process_file(source, pid, file)?))
}

/// Read and parse all five files for `pid`.
///
/// Fails on the first file that can't be read or parsed.
pub fn read_process(
    pid: u64,
    source: &dyn SourceProvider,
    config: &ReaderConfig,
) -> ProcReaderResult<ProcessRecord> {
    check_request(pid, config)?;

    let stat = parse_stat(&read_text(source, pid, ProcFile::Stat)?)?;
    let statm = parse_statm(&read_text(source, pid, ProcFile::Statm)?)?;
    let status = parse_status(&read_text(source, pid, ProcFile::Status)?)?;
    let cmdline = read_list(source, pid, ProcFile::Cmdline)?;
    let environ = read_list(source, pid, ProcFile::Environ)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(pid, comm = %stat.comm, "read process record");

    Ok(ProcessRecord {
        pid,
        stat,
        statm,
        status,
        cmdline,
        environ,
    })
}

/// Read every sub-record that succeeds, collecting failures as warnings.
///
/// `environ` is usually unreadable for other users' processes; this keeps the
/// rest of the record in that case. Fails with the first error when none of
/// `stat`, `statm` and `status` could be read, and on invalid arguments.
pub fn read_process_partial(
    pid: u64,
    source: &dyn SourceProvider,
    config: &ReaderConfig,
) -> ProcReaderResult<PartialProcessRecord> {
    check_request(pid, config)?;

    let mut skipped = Skipped::default();
    let stat = skipped.keep(
        pid,
        ProcFile::Stat,
        read_text(source, pid, ProcFile::Stat).and_then(|s| parse_stat(&s)),
    );
    let statm = skipped.keep(
        pid,
        ProcFile::Statm,
        read_text(source, pid, ProcFile::Statm).and_then(|s| parse_statm(&s)),
    );
    let status = skipped.keep(
        pid,
        ProcFile::Status,
        read_text(source, pid, ProcFile::Status).and_then(|s| parse_status(&s)),
    );
    let cmdline = skipped.keep(pid, ProcFile::Cmdline, read_list(source, pid, ProcFile::Cmdline));
    let environ = skipped.keep(pid, ProcFile::Environ, read_list(source, pid, ProcFile::Environ));

    // cmdline and environ parse from any bytes, so they alone don't count.
    if stat.is_none() && statm.is_none() && status.is_none() {
        if let Some(err) = skipped.first {
            return Err(err);
        }
    }

    let record = PartialProcessRecord {
        pid,
        stat,
        statm,
        status,
        cmdline,
        environ,
        warnings: skipped.warnings,
    };
    Ok(record)
}

/// Failures collected by [`read_process_partial`].
#[derive(Default)]
struct Skipped {
    first: Option<ProcReaderError>,
    warnings: Vec<String>,
}

impl Skipped {
    fn keep<T>(&mut self, pid: u64, file: ProcFile, result: ProcReaderResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(pid, file = file.file_name(), error = %err, "sub-record skipped");
                #[cfg(not(feature = "tracing"))]
                let _ = pid;
                self.warnings.push(format!("{}: {}", file.file_name(), err));
                self.first.get_or_insert(err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FixtureSource;

    const STAT: &str = "15220 (bash) S 15160 15220 15220 34817 29367 4218880 4598 38412 0 2 5 2 58 16 20 0 1 0 2427237 21516288 1043 18446744073709551615 4194304 5173404 140736934226816 140736934225296 139877616052318 0 65536 3686404 1266761467 18446744071579314207 0 0 17 3 0 0 0 0 0\n";
    const STATM: &str = "5253 1043 450 240 0 680 0\n";
    const STATUS: &str = "Name:\tbash\nState:\tS (sleeping)\nTgid:\t15220\nPid:\t15220\nPPid:\t15160\nVmRSS:\t    4172 kB\nThreads:\t1\n";

    fn source() -> FixtureSource {
        FixtureSource::new().with_process(15220, STAT, STATM, STATUS, b"-bash\0", b"TERM=xterm\0HOME=/root\0")
    }

    fn config() -> ReaderConfig {
        ReaderConfig {
            ticks_per_second: 100,
            ..Default::default()
        }
    }

    #[test]
    fn test_read_process() {
        let record = read_process(15220, &source(), &config()).unwrap();
        assert_eq!(record.pid, 15220);
        assert_eq!(record.stat.comm, "bash");
        assert_eq!(record.statm.resident, 1043);
        assert_eq!(record.status.vm_rss, 4172);
        assert_eq!(record.cmdline, vec!["-bash"]);
        assert_eq!(record.environ, vec!["TERM=xterm", "HOME=/root"]);
    }

    #[test]
    fn test_pid_zero_rejected() {
        let err = read_process(0, &source(), &config()).unwrap_err();
        assert!(matches!(err, ProcReaderError::InvalidArgument { .. }));
        let err = read_process_partial(0, &source(), &config()).unwrap_err();
        assert!(matches!(err, ProcReaderError::InvalidArgument { .. }));
    }

    #[test]
    fn test_zero_ticks_rejected() {
        let config = ReaderConfig {
            ticks_per_second: 0,
            ..Default::default()
        };
        assert!(read_process(15220, &source(), &config).is_err());
    }

    #[test]
    fn test_missing_process() {
        let err = read_process(4242, &source(), &config()).unwrap_err();
        assert!(err.is_not_found(), "{err}");
    }

    #[test]
    fn test_strict_fails_on_bad_statm() {
        let source = source().with_process_file(15220, ProcFile::Statm, "x y z");
        let err = read_process(15220, &source, &config()).unwrap_err();
        assert_eq!(err.record_kind(), Some(procreader_core::RecordKind::Statm));
    }

    #[test]
    fn test_empty_kernel_thread_cmdline() {
        let source = source().with_process_file(15220, ProcFile::Cmdline, "");
        let record = read_process(15220, &source, &config()).unwrap();
        assert!(record.cmdline.is_empty());
    }

    #[test]
    fn test_partial_keeps_good_subrecords() {
        let source = FixtureSource::new()
            .with_process_file(15220, ProcFile::Stat, STAT)
            .with_process_file(15220, ProcFile::Statm, "garbage")
            .with_process_file(15220, ProcFile::Status, STATUS)
            .with_process_file(15220, ProcFile::Cmdline, "-bash\0");
        let partial = read_process_partial(15220, &source, &config()).unwrap();
        assert!(partial.stat.is_some());
        assert!(partial.status.is_some());
        assert!(partial.statm.is_none());
        assert!(partial.environ.is_none());
        assert_eq!(partial.warnings.len(), 2);
        assert!(partial.warnings[0].starts_with("statm: "));
        assert!(partial.warnings[1].starts_with("environ: "));
        assert!(!partial.is_complete());
        assert!(partial.into_complete().is_err());
    }

    #[test]
    fn test_partial_complete_matches_strict() {
        let partial = read_process_partial(15220, &source(), &config()).unwrap();
        assert!(partial.warnings.is_empty());
        assert!(partial.is_complete());
        let strict = read_process(15220, &source(), &config()).unwrap();
        assert_eq!(partial.into_complete(), Ok(strict));
    }

    #[test]
    fn test_partial_nothing_readable() {
        let err = read_process_partial(15220, &FixtureSource::new(), &config()).unwrap_err();
        assert!(matches!(err, ProcReaderError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_partial_all_empty_is_an_error() {
        let source = FixtureSource::new().with_process(1, "", "", "", b"", b"");
        let config = ReaderConfig {
            best_effort: true,
            ..config()
        };
        let err = read_process_partial(1, &source, &config).unwrap_err();
        assert_eq!(err.record_kind(), Some(procreader_core::RecordKind::Stat));
    }

    #[test]
    fn test_partial_lists_only_is_an_error() {
        let source = FixtureSource::new()
            .with_process_file(15220, ProcFile::Cmdline, "-bash\0")
            .with_process_file(15220, ProcFile::Environ, "HOME=/root\0");
        let err = read_process_partial(15220, &source, &config()).unwrap_err();
        assert!(err.is_not_found(), "{err}");
    }

    #[test]
    fn test_partial_statm_alone_is_kept() {
        let source = FixtureSource::new().with_process_file(15220, ProcFile::Statm, STATM);
        let partial = read_process_partial(15220, &source, &config()).unwrap();
        assert_eq!(partial.statm.map(|m| m.resident), Some(1043));
        assert_eq!(partial.warnings.len(), 4);
    }
}
