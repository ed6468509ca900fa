//! Controlling terminal names from packed device numbers.
//!
//! `stat` reports the controlling terminal as the kernel's packed device
//! number. The name is recovered by matching the decoded major/minor against
//! `/proc/tty/drivers`:
//!
//! ```text
//! /dev/tty             /dev/tty        5       0 system:/dev/tty
//! serial               /dev/ttyS       4 64-111 serial
//! pty_slave            /dev/pts      136 0-1048575 pty:slave
//! ```
//!
//! Only installed drivers are known, so devices without a driver row resolve
//! to [`NO_TTY`] just like a process without a terminal.

use procreader_core::{ProcReaderError, ProcReaderResult, RecordKind};
use serde::Serialize;

use crate::source::{fetch_system_text, SourceProvider};

/// Name reported when there is no (resolvable) controlling terminal.
pub const NO_TTY: &str = "?";

// Packed layout (new_encode_dev): minor bits 0-7, major bits 8-19,
// minor bits 20-31.
const MAJOR_SHIFT: u32 = 8;
const MAJOR_MASK: u32 = 0xfff;
const MINOR_LOW_MASK: u32 = 0xff;
const MINOR_HIGH_MASK: u32 = 0xfff0_0000;
const MINOR_HIGH_SHIFT: u32 = 12;

const DEV_PREFIX: &str = "/dev/";

/// Driver nodes that multiplex many devices below a directory.
const MULTIPLEXED_NODES: [&str; 2] = ["/dev/pts", "/dev/ptm"];

/// Split a packed device number into `(major, minor)`.
pub fn decode_device(packed: u32) -> (u32, u32) {
    let major = (packed >> MAJOR_SHIFT) & MAJOR_MASK;
    let minor = (packed & MINOR_LOW_MASK) | ((packed & MINOR_HIGH_MASK) >> MINOR_HIGH_SHIFT);
    (major, minor)
}

/// One row of `/proc/tty/drivers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TtyDriver {
    pub name: String,
    pub default_node: String,
    pub major: u32,
    pub minor_min: u32,
    pub minor_max: u32,
    pub tty_type: String,
}

impl TtyDriver {
    fn matches(&self, major: u32, minor: u32) -> bool {
        self.major == major && (self.minor_min..=self.minor_max).contains(&minor)
    }

    /// Device name for `minor`, which must be inside this driver's range.
    fn device_name(&self, minor: u32) -> String {
        let offset = minor - self.minor_min;
        let name = if self.minor_min == self.minor_max {
            self.default_node.clone()
        } else if MULTIPLEXED_NODES.contains(&self.default_node.as_str()) {
            format!("{}/{}", self.default_node, offset)
        } else {
            format!("{}{}", self.default_node, offset)
        };
        match name.strip_prefix(DEV_PREFIX) {
            Some(stripped) => stripped.to_string(),
            None => name,
        }
    }
}

/// Parsed `/proc/tty/drivers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TtyDriverTable {
    pub drivers: Vec<TtyDriver>,
}

impl TtyDriverTable {
    /// Parse the driver listing. Blank lines are skipped.
    pub fn parse(content: &str) -> ProcReaderResult<Self> {
        let mut drivers = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            drivers.push(parse_driver_row(line)?);
        }
        Ok(TtyDriverTable { drivers })
    }

    /// Read and parse `tty/drivers` from `source`.
    pub fn load(source: &dyn SourceProvider) -> ProcReaderResult<Self> {
        Self::parse(&fetch_system_text(source, RecordKind::TtyDrivers)?)
    }

    /// Resolve a packed device number to a terminal name such as `pts/1`.
    pub fn resolve(&self, packed: u32) -> String {
        if packed == 0 {
            return NO_TTY.to_string();
        }
        let (major, minor) = decode_device(packed);
        self.drivers
            .iter()
            .find(|drv| drv.matches(major, minor))
            .map(|drv| drv.device_name(minor))
            .unwrap_or_else(|| NO_TTY.to_string())
    }
}

/// Resolve `packed`, loading the driver table only when there is a terminal.
pub fn resolve_tty(packed: u32, source: &dyn SourceProvider) -> ProcReaderResult<String> {
    if packed == 0 {
        return Ok(NO_TTY.to_string());
    }
    Ok(TtyDriverTable::load(source)?.resolve(packed))
}

fn parse_driver_row(line: &str) -> ProcReaderResult<TtyDriver> {
    let malformed =
        |reason: &str| ProcReaderError::malformed(RecordKind::TtyDrivers, reason, line);

    let fields: Vec<&str> = line.split_whitespace().collect();
    let [name, default_node, major, minors, tty_type] = fields.as_slice() else {
        return Err(malformed(&format!(
            "expected 5 fields, got {}",
            fields.len()
        )));
    };

    let major: u32 = major.parse().map_err(|_| malformed("invalid major"))?;
    let parse_minor = |s: &str| s.parse::<u32>().map_err(|_| malformed("bad minor range"));
    let (minor_min, minor_max) = match minors.split_once('-') {
        Some((lo, hi)) => (parse_minor(lo)?, parse_minor(hi)?),
        None => {
            let single = parse_minor(*minors)?;
            (single, single)
        }
    };
    if minor_min > minor_max {
        return Err(malformed("bad minor range"));
    }

    Ok(TtyDriver {
        name: name.to_string(),
        default_node: default_node.to_string(),
        major,
        minor_min,
        minor_max,
        tty_type: tty_type.to_string(),
    })
}
