//! One row of `docker top` output.
//!
//! Mirrors the column set of
//! `ps -o c,comm,command,cputime,gid,lwp,nice,pcpu,pid,pgid,pmem,ppid,psr,rgid,rss,ruid,start_time,state,stat,tty,uid,vsz`,
//! with `stat` split into [`DockerTopRow::state`] and
//! [`DockerTopRow::state_flags`].

use serde::Serialize;

use crate::config::ReaderConfig;
use crate::metrics::{DerivedMetrics, HumanState, StateFlag};
use crate::record::ProcessRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DockerTopRow {
    pub c: u64,
    pub comm: String,
    pub command: String,
    /// CPU time in seconds.
    pub cputime: f64,
    /// Effective gid.
    pub gid: u64,
    /// Thread id; equal to pid since only thread-group leaders are read.
    pub lwp: u64,
    pub nice: i64,
    pub pcpu: f64,
    pub pid: u64,
    pub pgid: i64,
    pub pmem: f64,
    pub ppid: i64,
    /// CPU the process last ran on.
    pub psr: u64,
    pub rgid: u64,
    /// Resident set in kB.
    pub rss: u64,
    pub ruid: u64,
    /// Unix seconds.
    pub start_time: f64,
    pub state: HumanState,
    pub state_flags: Vec<StateFlag>,
    pub tty: String,
    /// Effective uid.
    pub uid: u64,
    /// Virtual size in kB.
    pub vsz: u64,
}

impl DockerTopRow {
    pub fn from_record(
        record: &ProcessRecord,
        metrics: &DerivedMetrics,
        config: &ReaderConfig,
    ) -> Self {
        let stat = &record.stat;
        let status = &record.status;
        DockerTopRow {
            c: metrics.c,
            comm: stat.comm.clone(),
            command: format_command(record),
            cputime: cputime_secs(stat.utime, stat.stime, config.ticks_per_second),
            gid: status.gid.effective,
            lwp: stat.pid,
            nice: stat.nice,
            pcpu: metrics.pcpu,
            pid: stat.pid,
            pgid: stat.pgrp,
            pmem: metrics.pmem,
            ppid: stat.ppid,
            psr: stat.processor,
            rgid: status.gid.real,
            rss: status.vm_rss,
            ruid: status.uid.real,
            start_time: metrics.start_time,
            state: metrics.state,
            state_flags: metrics.state_flags.clone(),
            tty: metrics.tty.clone(),
            uid: status.uid.effective,
            vsz: status.vm_size,
        }
    }
}

/// Full command line, or `[comm]` for processes without one (kernel threads,
/// zombies).
pub fn format_command(record: &ProcessRecord) -> String {
    if record.cmdline.is_empty() {
        format!("[{}]", record.stat.comm)
    } else {
        record.cmdline.join(" ")
    }
}

fn cputime_secs(utime: u64, stime: u64, ticks_per_second: u64) -> f64 {
    if ticks_per_second == 0 {
        return 0.0;
    }
    utime.saturating_add(stime) as f64 / ticks_per_second as f64
}
