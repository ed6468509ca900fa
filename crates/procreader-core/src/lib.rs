//! procreader-core: Core types and errors
//!
//! This crate provides the foundational types shared by the procreader crates:
//! - The canonical error type [`ProcReaderError`] and its [`RecordKind`] tag
//! - Schema ID constants for JSON output contracts
//!
//! ## Error Handling
//!
//! procreader uses a single error type that separates "the pseudo-file could
//! not be read" ([`ProcReaderError::SourceUnavailable`]) from "the pseudo-file
//! was read but its content has the wrong shape"
//! ([`ProcReaderError::MalformedRecord`]). Callers processing many PIDs get one
//! result per PID and decide themselves whether to skip, log, or abort.

use std::env::consts::OS;

pub mod error;
pub mod schema;

// Re-export canonical error type at crate root
pub use error::{ProcReaderError, ProcReaderResult, RecordKind};

/// Get the current platform identifier.
///
/// Returns one of: "linux", "macos", "windows", "freebsd", etc.
#[inline]
pub fn get_platform() -> &'static str {
    OS
}

/// Check if running on Linux, the only platform with a procfs layout we parse.
#[inline]
#[cfg(target_os = "linux")]
pub const fn is_linux() -> bool {
    true
}

#[inline]
#[cfg(not(target_os = "linux"))]
pub const fn is_linux() -> bool {
    false
}
