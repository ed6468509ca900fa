//! Sources of raw pseudo-file content.
//!
//! The parsers never touch the filesystem themselves. Everything they consume
//! comes through a [`SourceProvider`], which is either the real procfs
//! ([`ProcFs`]) or an in-memory set of captured files ([`FixtureSource`]).

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use procreader_core::{ProcReaderError, ProcReaderResult, RecordKind};

/// One of the five per-process pseudo-files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcFile {
    Stat,
    Statm,
    Status,
    Cmdline,
    Environ,
}

impl ProcFile {
    pub const ALL: [ProcFile; 5] = [
        ProcFile::Stat,
        ProcFile::Statm,
        ProcFile::Status,
        ProcFile::Cmdline,
        ProcFile::Environ,
    ];

    /// File name below `/proc/[pid]/`.
    pub fn file_name(&self) -> &'static str {
        self.record_kind().as_str()
    }

    pub fn record_kind(&self) -> RecordKind {
        match self {
            ProcFile::Stat => RecordKind::Stat,
            ProcFile::Statm => RecordKind::Statm,
            ProcFile::Status => RecordKind::Status,
            ProcFile::Cmdline => RecordKind::Cmdline,
            ProcFile::Environ => RecordKind::Environ,
        }
    }
}

/// Supplies raw pseudo-file bytes.
///
/// Implementations do plain reads only: no caching, no retries. A missing
/// process should surface as `io::ErrorKind::NotFound`.
pub trait SourceProvider {
    /// Read `/proc/[pid]/<file>`.
    fn read_process_file(&self, pid: u64, file: ProcFile) -> io::Result<Vec<u8>>;

    /// Read a system-wide file relative to the procfs root, e.g. `uptime`,
    /// `meminfo` or `tty/drivers`.
    fn read_system_file(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// Read a per-process file and map IO failures to `SourceUnavailable`.
pub(crate) fn fetch_process_file(
    source: &dyn SourceProvider,
    pid: u64,
    file: ProcFile,
) -> ProcReaderResult<Vec<u8>> {
    source
        .read_process_file(pid, file)
        .map_err(|e| ProcReaderError::source_unavailable(format!("{pid}/{}", file.file_name()), e))
}

/// Read a system file as text and map IO failures to `SourceUnavailable`.
pub(crate) fn fetch_system_text(
    source: &dyn SourceProvider,
    kind: RecordKind,
) -> ProcReaderResult<String> {
    let path = kind.as_str();
    let bytes = source
        .read_system_file(path)
        .map_err(|e| ProcReaderError::source_unavailable(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ============================================================================
// Real procfs
// ============================================================================

/// Reads from a procfs mount, `/proc` by default.
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ProcFs { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        ProcFs::new("/proc")
    }
}

impl SourceProvider for ProcFs {
    fn read_process_file(&self, pid: u64, file: ProcFile) -> io::Result<Vec<u8>> {
        fs::read(self.root.join(pid.to_string()).join(file.file_name()))
    }

    fn read_system_file(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.root.join(path))
    }
}

// ============================================================================
// In-memory fixtures
// ============================================================================

/// In-memory source for tests and replays of captured data.
///
/// Anything not added reads as `io::ErrorKind::NotFound`.
#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    process_files: HashMap<(u64, ProcFile), Vec<u8>>,
    system_files: HashMap<String, Vec<u8>>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single per-process file.
    pub fn with_process_file(
        mut self,
        pid: u64,
        file: ProcFile,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        self.process_files.insert((pid, file), content.into());
        self
    }

    /// Add all five per-process files at once.
    pub fn with_process(
        self,
        pid: u64,
        stat: &str,
        statm: &str,
        status: &str,
        cmdline: &[u8],
        environ: &[u8],
    ) -> Self {
        self.with_process_file(pid, ProcFile::Stat, stat)
            .with_process_file(pid, ProcFile::Statm, statm)
            .with_process_file(pid, ProcFile::Status, status)
            .with_process_file(pid, ProcFile::Cmdline, cmdline)
            .with_process_file(pid, ProcFile::Environ, environ)
    }

    /// Add a system file such as `uptime` or `tty/drivers`.
    pub fn with_system_file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.system_files.insert(path.to_string(), content.into());
        self
    }
}

fn not_found(what: String) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, what)
}

impl SourceProvider for FixtureSource {
    fn read_process_file(&self, pid: u64, file: ProcFile) -> io::Result<Vec<u8>> {
        self.process_files
            .get(&(pid, file))
            .cloned()
            .ok_or_else(|| not_found(format!("no fixture for {pid}/{}", file.file_name())))
    }

    fn read_system_file(&self, path: &str) -> io::Result<Vec<u8>> {
        self.system_files
            .get(path)
            .cloned()
            .ok_or_else(|| not_found(format!("no fixture for {path}")))
    }
}
