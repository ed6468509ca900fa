//! Error types for procreader operations.
//!
//! - [`ProcReaderError`] - Canonical error type for all procreader operations
//! - [`RecordKind`] - Which pseudo-file parser produced a failure
//!
//! ## Design Principles
//!
//! - **Structured**: Errors carry typed context (record kind, source name) not just messages
//! - **Two failure classes**: an unreadable source is a system-level failure; a
//!   readable source with the wrong shape is a format-drift failure
//! - **Bounded**: offending content is quoted, but never more than
//!   [`SNIPPET_MAX_CHARS`] characters of it

use std::fmt;
use std::io;
use thiserror::Error;

/// Maximum number of characters of offending content kept in a
/// [`ProcReaderError::MalformedRecord`] snippet.
pub const SNIPPET_MAX_CHARS: usize = 64;

// ============================================================================
// Record Kind
// ============================================================================

/// The pseudo-file (and therefore the parser) an error relates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Stat,
    Statm,
    Status,
    Cmdline,
    Environ,
    TtyDrivers,
    Uptime,
    Meminfo,
}

impl RecordKind {
    /// Name of the record as it appears under procfs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Stat => "stat",
            RecordKind::Statm => "statm",
            RecordKind::Status => "status",
            RecordKind::Cmdline => "cmdline",
            RecordKind::Environ => "environ",
            RecordKind::TtyDrivers => "tty/drivers",
            RecordKind::Uptime => "uptime",
            RecordKind::Meminfo => "meminfo",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Canonical Error Type
// ============================================================================

/// Canonical error type for all procreader operations.
///
/// ## Error Code Mapping
///
/// | Variant | Code |
/// |---------|------|
/// | `InvalidArgument` | 1 |
/// | `SourceUnavailable` | 2 |
/// | `MalformedRecord` | 3 |
/// | `Internal` | 99 |
#[derive(Debug, Error)]
pub enum ProcReaderError {
    /// Invalid argument provided.
    ///
    /// Returned when input validation fails (e.g., pid = 0, zero tick rate).
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of what was invalid.
        message: String,
    },

    /// The underlying pseudo-file could not be read.
    ///
    /// Usually the process does not exist or was reaped between discovery
    /// and read, or the caller lacks permission.
    #[error("Source '{source_name}' unavailable: {source}")]
    SourceUnavailable {
        /// Which source failed, e.g. `15220/stat` or `tty/drivers`.
        source_name: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Content was read but does not have the expected shape.
    #[error("Malformed {kind} record: {reason} (near '{snippet}')")]
    MalformedRecord {
        /// Which sub-parser rejected the content.
        kind: RecordKind,
        /// What was wrong.
        reason: String,
        /// Bounded excerpt of the offending content.
        snippet: String,
    },

    /// Internal error (should not happen in normal operation).
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl ProcReaderError {
    /// Get the numeric error code for this error.
    ///
    /// The CLI uses this as its exit status.
    pub fn error_code(&self) -> i32 {
        match self {
            ProcReaderError::InvalidArgument { .. } => 1,
            ProcReaderError::SourceUnavailable { .. } => 2,
            ProcReaderError::MalformedRecord { .. } => 3,
            ProcReaderError::Internal { .. } => 99,
        }
    }

    /// The record kind for `MalformedRecord`, `None` otherwise.
    pub fn record_kind(&self) -> Option<RecordKind> {
        match self {
            ProcReaderError::MalformedRecord { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True when the process most likely vanished (the source was not found).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ProcReaderError::SourceUnavailable { source, .. }
                if source.kind() == io::ErrorKind::NotFound
        )
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl ProcReaderError {
    /// Create an `InvalidArgument` error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ProcReaderError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a `SourceUnavailable` error.
    pub fn source_unavailable(source_name: impl Into<String>, source: io::Error) -> Self {
        ProcReaderError::SourceUnavailable {
            source_name: source_name.into(),
            source,
        }
    }

    /// Create a `MalformedRecord` error, clamping the snippet.
    pub fn malformed(kind: RecordKind, reason: impl Into<String>, content: &str) -> Self {
        ProcReaderError::MalformedRecord {
            kind,
            reason: reason.into(),
            snippet: snippet(content),
        }
    }

    /// Create an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        ProcReaderError::Internal {
            message: message.into(),
        }
    }
}

/// Trim and cut `content` to at most [`SNIPPET_MAX_CHARS`] characters.
///
/// Cuts on a char boundary so multi-byte process names never split.
pub fn snippet(content: &str) -> String {
    let trimmed = content.trim();
    match trimmed.char_indices().nth(SNIPPET_MAX_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for procreader operations.
pub type ProcReaderResult<T> = Result<T, ProcReaderError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProcReaderError::invalid_argument("PID 0 is not valid");
        assert_eq!(err.to_string(), "Invalid argument: PID 0 is not valid");

        let err = ProcReaderError::malformed(RecordKind::Stat, "missing ')'", "1 (bash S 0");
        assert_eq!(
            err.to_string(),
            "Malformed stat record: missing ')' (near '1 (bash S 0')"
        );

        let err = ProcReaderError::source_unavailable(
            "15220/status",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.to_string(), "Source '15220/status' unavailable: gone");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ProcReaderError::invalid_argument("").error_code(), 1);
        assert_eq!(
            ProcReaderError::source_unavailable("x", io::Error::other("test")).error_code(),
            2
        );
        assert_eq!(
            ProcReaderError::malformed(RecordKind::Statm, "", "").error_code(),
            3
        );
        assert_eq!(ProcReaderError::internal("").error_code(), 99);
    }

    #[test]
    fn test_record_kind() {
        let err = ProcReaderError::malformed(RecordKind::TtyDrivers, "bad row", "x");
        assert_eq!(err.record_kind(), Some(RecordKind::TtyDrivers));
        assert_eq!(ProcReaderError::internal("x").record_kind(), None);
        assert_eq!(RecordKind::TtyDrivers.to_string(), "tty/drivers");
    }

    #[test]
    fn test_is_not_found() {
        let err = ProcReaderError::source_unavailable(
            "1/stat",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());

        let err = ProcReaderError::source_unavailable(
            "1/environ",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_source_is_accessible() {
        use std::error::Error as _;

        let err = ProcReaderError::source_unavailable(
            "1/stat",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let source = err.source().expect("source should be set");
        assert_eq!(source.to_string(), "denied");
    }

    #[test]
    fn test_snippet_is_bounded() {
        let long = "x".repeat(500);
        let s = snippet(&long);
        assert_eq!(s.chars().count(), SNIPPET_MAX_CHARS + 3);
        assert!(s.ends_with("..."));

        assert_eq!(snippet("  short\n"), "short");
    }

    #[test]
    fn test_snippet_respects_char_boundaries() {
        let multibyte = "é".repeat(100);
        let s = snippet(&multibyte);
        assert!(s.starts_with("éé"));
        assert_eq!(s.chars().count(), SNIPPET_MAX_CHARS + 3);
    }
}
