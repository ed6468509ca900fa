//! Parser for `/proc/[pid]/statm`.
//!
//! Format: `size resident shared text lib data dt`, all in pages.

use procreader_core::{ProcReaderError, ProcReaderResult, RecordKind};
use serde::Serialize;

/// size, resident and shared have been printed by every kernel.
pub const MIN_STATM_FIELDS: usize = 3;

/// Parsed `/proc/[pid]/statm`. All values are pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatmFields {
    pub size: u64,
    pub resident: u64,
    pub shared: u64,
    pub text: u64,
    /// Always 0 since Linux 2.6.
    pub lib: u64,
    pub data: u64,
    /// Always 0 since Linux 2.6.
    pub dirty: u64,
}

impl StatmFields {
    /// Resident set size in kilobytes for the given page size.
    pub fn resident_kb(&self, page_size: u64) -> u64 {
        self.resident.saturating_mul(page_size) / 1024
    }
}

/// Parse `/proc/[pid]/statm` content.
pub fn parse_statm(content: &str) -> ProcReaderResult<StatmFields> {
    let mut values = [0u64; 7];
    let mut count = 0;

    for (i, tok) in content.split_whitespace().enumerate() {
        // Anything past the seventh field is a newer kernel's addition.
        if i >= values.len() {
            break;
        }
        values[i] = tok.parse().map_err(|_| {
            ProcReaderError::malformed(
                RecordKind::Statm,
                format!("invalid field {i} '{tok}'"),
                content,
            )
        })?;
        count += 1;
    }

    if count < MIN_STATM_FIELDS {
        return Err(ProcReaderError::malformed(
            RecordKind::Statm,
            format!("expected at least {MIN_STATM_FIELDS} fields, got {count}"),
            content,
        ));
    }

    let [size, resident, shared, text, lib, data, dirty] = values;
    Ok(StatmFields {
        size,
        resident,
        shared,
        text,
        lib,
        data,
        dirty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_statm() {
        let statm = parse_statm("5355 985 450 239 0 533 0\n").unwrap();
        assert_eq!(
            statm,
            StatmFields {
                size: 5355,
                resident: 985,
                shared: 450,
                text: 239,
                lib: 0,
                data: 533,
                dirty: 0,
            }
        );
    }

    #[test]
    fn test_short_statm() {
        let statm = parse_statm("100 20 10").unwrap();
        assert_eq!(statm.size, 100);
        assert_eq!(statm.resident, 20);
        assert_eq!(statm.shared, 10);
        assert_eq!(statm.text, 0);
        assert_eq!(statm.data, 0);
    }

    #[test]
    fn test_too_short() {
        let err = parse_statm("100 20").unwrap_err();
        assert_eq!(err.record_kind(), Some(RecordKind::Statm));
        assert!(parse_statm("").is_err());
    }

    #[test]
    fn test_invalid_value() {
        let err = parse_statm("100 x 10 0 0 0 0").unwrap_err();
        assert!(err.to_string().contains("invalid field 1 'x'"), "{err}");
    }

    #[test]
    fn test_resident_kb() {
        let statm = parse_statm("5355 985 450 239 0 533 0").unwrap();
        assert_eq!(statm.resident_kb(4096), 3940);
    }
}
