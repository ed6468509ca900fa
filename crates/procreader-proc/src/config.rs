//! Reader configuration.

use std::path::PathBuf;
use std::sync::OnceLock;

use procreader_core::schema::READER_CONFIG_V1;
use procreader_core::{ProcReaderError, ProcReaderResult};
use serde::Deserialize;

/// Fallback when `sysconf(_SC_CLK_TCK)` is unavailable (`USER_HZ` on Linux).
pub const DEFAULT_TICKS_PER_SECOND: u64 = 100;

/// Fallback when `sysconf(_SC_PAGESIZE)` is unavailable.
pub const DEFAULT_PAGE_SIZE: u64 = 4096;

/// How records are read and how metrics are derived.
///
/// Unknown fields in JSON input are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ReaderConfig {
    /// Root of the procfs mount.
    pub proc_root: PathBuf,

    /// Clock ticks per second used to convert `stat` times to seconds.
    pub ticks_per_second: u64,

    /// Return whichever sub-records parsed instead of failing the whole
    /// process on the first bad one.
    pub best_effort: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            proc_root: PathBuf::from("/proc"),
            ticks_per_second: clock_ticks_per_second(),
            best_effort: false,
        }
    }
}

impl ReaderConfig {
    /// Validate config values.
    pub fn validate(&self) -> ProcReaderResult<()> {
        if self.ticks_per_second == 0 {
            return Err(ProcReaderError::invalid_argument(
                "ticks_per_second must be greater than 0",
            ));
        }
        if self.proc_root.as_os_str().is_empty() {
            return Err(ProcReaderError::invalid_argument(
                "proc_root must not be empty",
            ));
        }
        Ok(())
    }

    pub fn schema_id() -> &'static str {
        READER_CONFIG_V1
    }
}

/// Clock ticks per second, read once and cached for the process lifetime.
pub fn clock_ticks_per_second() -> u64 {
    static TICKS: OnceLock<u64> = OnceLock::new();
    *TICKS.get_or_init(|| sysconf_or(sysconf_name::CLK_TCK, DEFAULT_TICKS_PER_SECOND))
}

/// Page size in bytes, read once and cached for the process lifetime.
pub fn page_size() -> u64 {
    static PAGE: OnceLock<u64> = OnceLock::new();
    *PAGE.get_or_init(|| sysconf_or(sysconf_name::PAGESIZE, DEFAULT_PAGE_SIZE))
}

#[cfg(unix)]
mod sysconf_name {
    pub const CLK_TCK: libc::c_int = libc::_SC_CLK_TCK;
    pub const PAGESIZE: libc::c_int = libc::_SC_PAGESIZE;
}

#[cfg(not(unix))]
mod sysconf_name {
    pub const CLK_TCK: i32 = 0;
    pub const PAGESIZE: i32 = 0;
}

/// Returns `fallback` if sysconf fails (returns -1).
#[cfg(unix)]
fn sysconf_or(name: libc::c_int, fallback: u64) -> u64 {
    let result = unsafe { libc::sysconf(name) };
    if result <= 0 {
        fallback
    } else {
        result as u64
    }
}

#[cfg(not(unix))]
fn sysconf_or(_name: i32, fallback: u64) -> u64 {
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_ticks() {
        let ticks = clock_ticks_per_second();
        assert!(ticks > 0, "Clock ticks should be positive");
        assert!((100..=10000).contains(&ticks));
        assert_eq!(ticks, clock_ticks_per_second());
    }

    #[test]
    fn test_page_size() {
        let size = page_size();
        assert!(size >= 1024);
    }

    #[test]
    fn test_default_is_valid() {
        let config = ReaderConfig::default();
        assert_eq!(config.proc_root, PathBuf::from("/proc"));
        assert!(!config.best_effort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_ticks_rejected() {
        let config = ReaderConfig {
            ticks_per_second: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ProcReaderError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_deserialization_fills_defaults() {
        let json = r#"{"ticks_per_second": 250}"#;
        let config: ReaderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.ticks_per_second, 250);
        assert_eq!(config.proc_root, PathBuf::from("/proc"));
        assert!(!config.best_effort);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let json = r#"{"hertz": 100}"#;
        let result: Result<ReaderConfig, _> = serde_json::from_str(json);
        assert!(result.is_err(), "Unknown fields should be rejected");
    }

    #[test]
    fn test_schema_id() {
        assert!(ReaderConfig::schema_id().contains("reader-config"));
    }
}
