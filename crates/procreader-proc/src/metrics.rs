//! ps-compatible values derived from a [`ProcessRecord`].
//!
//! The arithmetic follows procps `ps/output.c`: CPU time is compared against
//! whole seconds of process life using integer tick math, so results match
//! what `ps -o pcpu,c` prints for the same inputs.
//!
//! Zero divisors are never errors here. The affected metric falls back to
//! `0` and the reason lands in [`DerivedMetrics::warnings`].

use std::fmt;

use procreader_core::ProcReaderResult;
use serde::Serialize;

use crate::config::ReaderConfig;
use crate::record::ProcessRecord;
use crate::source::SourceProvider;
use crate::stat::StatFields;
use crate::status::StatusFields;
use crate::system::SystemFacts;
use crate::tty::TtyDriverTable;

/// Upper bound for CPU% and memory%.
pub const PERCENT_CLAMP: f64 = 99.9;

/// Upper bound for the `C` column.
pub const C_CLAMP: u64 = 99;

/// Long-form process state, as `docker top` prints it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HumanState {
    Running,
    Sleeping,
    Uninterruptible,
    Zombie,
    Stopped,
    Unknown,
}

impl HumanState {
    /// Map a `stat` state code. Codes other than `R S D Z T` are `Unknown`.
    pub fn from_code(code: char) -> Self {
        match code {
            'R' => HumanState::Running,
            'S' => HumanState::Sleeping,
            'D' => HumanState::Uninterruptible,
            'Z' => HumanState::Zombie,
            'T' => HumanState::Stopped,
            _ => HumanState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HumanState::Running => "running",
            HumanState::Sleeping => "sleeping",
            HumanState::Uninterruptible => "uninterruptible",
            HumanState::Zombie => "zombie",
            HumanState::Stopped => "stopped",
            HumanState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HumanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Modifiers `ps -o stat` appends to the state letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateFlag {
    /// `N`: positive nice.
    Low,
    /// `<`: negative nice.
    High,
    /// `L`: has locked pages.
    Lock,
    /// `s`: session leader.
    Leader,
    /// `l`: multi-threaded.
    Threads,
    /// `+`: in the foreground process group of its terminal.
    Foreground,
}

impl StateFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateFlag::Low => "low",
            StateFlag::High => "high",
            StateFlag::Lock => "lock",
            StateFlag::Leader => "leader",
            StateFlag::Threads => "threads",
            StateFlag::Foreground => "foreground",
        }
    }
}

/// A metric whose divisor was zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivisionHazard {
    ZeroTicksPerSecond,
    ZeroElapsed,
    ZeroMemTotal,
}

impl fmt::Display for DivisionHazard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DivisionHazard::ZeroTicksPerSecond => {
                f.write_str("ticks_per_second is 0; time-based metrics set to 0")
            }
            DivisionHazard::ZeroElapsed => {
                f.write_str("process started less than a second ago; pcpu set to 0")
            }
            DivisionHazard::ZeroMemTotal => f.write_str("MemTotal is 0; pmem set to 0"),
        }
    }
}

/// Values computed from one record and a system sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub pcpu: f64,
    pub c: u64,
    pub pmem: f64,
    pub state: HumanState,
    pub state_flags: Vec<StateFlag>,
    /// Process start as Unix seconds.
    pub start_time: f64,
    /// Seconds the process has been alive.
    pub elapsed_secs: f64,
    pub tty: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// CPU% over the life of the process, clamped to [`PERCENT_CLAMP`].
pub fn cpu_percent(
    stat: &StatFields,
    uptime_secs: f64,
    ticks_per_second: u64,
) -> Result<f64, DivisionHazard> {
    if ticks_per_second == 0 {
        return Err(DivisionHazard::ZeroTicksPerSecond);
    }
    let total_ticks = stat.utime.saturating_add(stat.stime);
    let started_at = stat.start_time / ticks_per_second;
    let uptime = uptime_secs as u64;
    if uptime < started_at {
        return Ok(0.0);
    }
    let seconds = uptime - started_at;
    if seconds == 0 {
        return Err(DivisionHazard::ZeroElapsed);
    }
    let busy = total_ticks.saturating_mul(100) / ticks_per_second;
    Ok((busy as f64 / seconds as f64).min(PERCENT_CLAMP))
}

/// The `C` column: whole-number CPU%.
pub fn c_value(pcpu: f64) -> u64 {
    (pcpu.max(0.0).floor() as u64).min(C_CLAMP)
}

/// Resident memory as a share of `MemTotal`, clamped to [`PERCENT_CLAMP`].
pub fn mem_percent(vm_rss_kb: u64, mem_total_kb: u64) -> Result<f64, DivisionHazard> {
    if mem_total_kb == 0 {
        return Err(DivisionHazard::ZeroMemTotal);
    }
    let pmem = vm_rss_kb as f64 / mem_total_kb as f64 * 100.0;
    Ok(pmem.min(PERCENT_CLAMP))
}

/// Seconds since the process started, never negative.
pub fn elapsed_secs(
    stat: &StatFields,
    uptime_secs: f64,
    ticks_per_second: u64,
) -> Result<f64, DivisionHazard> {
    if ticks_per_second == 0 {
        return Err(DivisionHazard::ZeroTicksPerSecond);
    }
    let started_at = stat.start_time as f64 / ticks_per_second as f64;
    Ok((uptime_secs - started_at).max(0.0))
}

/// State flags in `ps` order, each at most once.
pub fn state_flags(stat: &StatFields, status: &StatusFields) -> Vec<StateFlag> {
    let mut flags = Vec::new();
    let mut add = |flag: StateFlag, cond: bool| {
        if cond && !flags.contains(&flag) {
            flags.push(flag);
        }
    };
    add(StateFlag::Low, stat.nice > 0);
    add(StateFlag::High, stat.nice < 0);
    add(StateFlag::Lock, status.vm_lck > 0);
    add(
        StateFlag::Leader,
        i64::try_from(status.tgid).is_ok_and(|tgid| tgid == stat.session),
    );
    add(StateFlag::Threads, status.threads > 1);
    add(StateFlag::Foreground, stat.pgrp == stat.tpgid);
    flags
}

/// Derive all metrics for `record`.
pub fn derive_metrics(
    record: &ProcessRecord,
    facts: &SystemFacts,
    ttys: &TtyDriverTable,
    config: &ReaderConfig,
) -> DerivedMetrics {
    let stat = &record.stat;
    let hz = config.ticks_per_second;
    let mut warnings: Vec<String> = Vec::new();
    let mut fallback = |result: Result<f64, DivisionHazard>| {
        result.unwrap_or_else(|hazard| {
            #[cfg(feature = "tracing")]
            tracing::warn!(pid = record.pid, %hazard, "metric fallback");
            let msg = hazard.to_string();
            if !warnings.contains(&msg) {
                warnings.push(msg);
            }
            0.0
        })
    };

    let pcpu = fallback(cpu_percent(stat, facts.uptime_secs, hz));
    let pmem = fallback(mem_percent(record.status.vm_rss, facts.mem_total_kb));
    let elapsed = fallback(elapsed_secs(stat, facts.uptime_secs, hz));

    let metrics = DerivedMetrics {
        pcpu,
        c: c_value(pcpu),
        pmem,
        state: HumanState::from_code(stat.state),
        state_flags: state_flags(stat, &record.status),
        start_time: facts.now_unix - elapsed,
        elapsed_secs: elapsed,
        tty: ttys.resolve(stat.tty_nr as u32),
        warnings,
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(
        pid = record.pid,
        pcpu = metrics.pcpu,
        pmem = metrics.pmem,
        tty = %metrics.tty,
        "derived metrics"
    );

    metrics
}

/// Load the system sample (and the tty table when the process has a
/// terminal) from `source`, then derive metrics.
pub fn derive_metrics_from_source(
    record: &ProcessRecord,
    source: &dyn SourceProvider,
    config: &ReaderConfig,
) -> ProcReaderResult<DerivedMetrics> {
    config.validate()?;
    let facts = SystemFacts::load(source)?;
    let ttys = if record.stat.tty_nr == 0 {
        TtyDriverTable::default()
    } else {
        TtyDriverTable::load(source)?
    };
    Ok(derive_metrics(record, &facts, &ttys, config))
}
