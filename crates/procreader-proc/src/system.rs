//! System-wide facts the metrics need: uptime, total memory and "now".

use procreader_core::{ProcReaderError, ProcReaderResult, RecordKind};
use serde::Serialize;
use time::OffsetDateTime;

use crate::source::{fetch_system_text, SourceProvider};

/// Uptime, total memory and wall-clock time, sampled together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SystemFacts {
    /// Seconds since boot (first field of `/proc/uptime`).
    pub uptime_secs: f64,
    /// `MemTotal` from `/proc/meminfo`, in kB.
    pub mem_total_kb: u64,
    /// Current time as Unix seconds.
    pub now_unix: f64,
}

impl SystemFacts {
    /// Read `uptime` and `meminfo` from `source` and stamp the current time.
    pub fn load(source: &dyn SourceProvider) -> ProcReaderResult<Self> {
        let uptime_secs = parse_uptime(&fetch_system_text(source, RecordKind::Uptime)?)?;
        let mem_total_kb = parse_meminfo_total(&fetch_system_text(source, RecordKind::Meminfo)?)?;
        Ok(SystemFacts {
            uptime_secs,
            mem_total_kb,
            now_unix: now_unix(),
        })
    }
}

/// Current wall-clock time as fractional Unix seconds.
pub fn now_unix() -> f64 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1e9
}

/// Parse `/proc/uptime`: `<uptime> <idle>`, both in seconds.
pub fn parse_uptime(content: &str) -> ProcReaderResult<f64> {
    let malformed = |reason: &str| ProcReaderError::malformed(RecordKind::Uptime, reason, content);

    let mut fields = content.split_whitespace();
    let uptime: f64 = fields
        .next()
        .ok_or_else(|| malformed("empty uptime"))?
        .parse()
        .map_err(|_| malformed("invalid uptime"))?;
    if fields.next().is_none() {
        return Err(malformed("expected 2 fields"));
    }
    if !uptime.is_finite() || uptime < 0.0 {
        return Err(malformed("uptime out of range"));
    }
    Ok(uptime)
}

/// Parse the `MemTotal:` line of `/proc/meminfo`, in kB.
pub fn parse_meminfo_total(content: &str) -> ProcReaderResult<u64> {
    for line in content.lines() {
        let Some(rest) = line.strip_prefix("MemTotal:") else {
            continue;
        };
        // We expect "MemTotal:\s+(\d+)\s+kB"
        let fields: Vec<&str> = rest.split_whitespace().collect();
        if fields.len() != 2 || fields[1] != "kB" {
            return Err(ProcReaderError::malformed(
                RecordKind::Meminfo,
                "bad MemTotal line",
                line,
            ));
        }
        return fields[0].parse().map_err(|_| {
            ProcReaderError::malformed(RecordKind::Meminfo, "invalid MemTotal value", line)
        });
    }
    Err(ProcReaderError::malformed(
        RecordKind::Meminfo,
        "MemTotal not found",
        content,
    ))
}
