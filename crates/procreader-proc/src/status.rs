//! Parser for `/proc/[pid]/status`.
//!
//! Each line is `Key:<whitespace>Value`. Lines come and go between kernel
//! versions (`Ngid`, `VmPin`, `CapBnd`, `Seccomp`, ... are all later
//! additions), so parsing is driven by key rather than position: unknown keys
//! are skipped and known keys that never show up stay at their zero value.

use std::str::FromStr;

use procreader_core::{ProcReaderError, ProcReaderResult, RecordKind};
use serde::Serialize;

/// Real, effective, saved set and filesystem ids (`Uid:`/`Gid:` lines).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Ids {
    pub real: u64,
    pub effective: u64,
    pub saved: u64,
    pub fs: u64,
}

/// Queued signals for the real user id (`SigQ: current/max`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SigQueue {
    pub current: u64,
    pub max: u64,
}

/// Parsed `/proc/[pid]/status`. Memory counters are kB.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusFields {
    pub name: String,
    /// Long form, e.g. `S (sleeping)`.
    pub state: String,
    pub tgid: u64,
    pub ngid: u64,
    pub pid: u64,
    pub ppid: u64,
    pub tracer_pid: u64,
    pub uid: Ids,
    pub gid: Ids,
    pub fd_size: u64,
    pub groups: Vec<u64>,
    pub vm_peak: u64,
    pub vm_size: u64,
    pub vm_lck: u64,
    pub vm_pin: u64,
    pub vm_hwm: u64,
    pub vm_rss: u64,
    pub vm_data: u64,
    pub vm_stk: u64,
    pub vm_exe: u64,
    pub vm_lib: u64,
    pub vm_pte: u64,
    pub vm_swap: u64,
    pub threads: u64,
    pub sig_q: SigQueue,
    pub sig_pnd: String,
    pub shd_pnd: String,
    pub sig_blk: String,
    pub sig_ign: String,
    pub sig_cgt: String,
    pub cap_inh: String,
    pub cap_prm: String,
    pub cap_eff: String,
    pub cap_bnd: String,
    pub seccomp: u64,
    pub cpus_allowed: String,
    pub cpus_allowed_list: String,
    pub mems_allowed: String,
    pub mems_allowed_list: String,
    pub voluntary_ctxt_switches: u64,
    pub nonvoluntary_ctxt_switches: u64,
}

/// First whitespace-separated token as a number; `VmRSS:  3940 kB` -> 3940.
///
/// A value that doesn't parse is treated like a missing line.
fn leading_num<T: FromStr + Default>(value: &str) -> T {
    value
        .split_whitespace()
        .next()
        .and_then(|tok| tok.parse().ok())
        .unwrap_or_default()
}

fn parse_ids(value: &str) -> Ids {
    let mut it = value.split_whitespace().map(|tok| tok.parse().unwrap_or(0));
    Ids {
        real: it.next().unwrap_or(0),
        effective: it.next().unwrap_or(0),
        saved: it.next().unwrap_or(0),
        fs: it.next().unwrap_or(0),
    }
}

fn parse_sig_queue(value: &str) -> SigQueue {
    match value.trim().split_once('/') {
        Some((current, max)) => SigQueue {
            current: current.trim().parse().unwrap_or(0),
            max: max.trim().parse().unwrap_or(0),
        },
        None => SigQueue::default(),
    }
}

/// Parse `/proc/[pid]/status` content.
///
/// Fails only when the content is empty or carries none of the `Name`,
/// `State` and `Pid` keys, i.e. it is not a status file at all.
pub fn parse_status(content: &str) -> ProcReaderResult<StatusFields> {
    if content.trim().is_empty() {
        return Err(ProcReaderError::malformed(
            RecordKind::Status,
            "empty status record",
            content,
        ));
    }

    let mut status = StatusFields::default();
    let mut identified = false;

    for line in content.lines() {
        let Some((key, raw)) = line.split_once(':') else {
            continue;
        };
        let value = raw.trim();

        match key {
            "Name" => {
                // Only the separator tab; surrounding spaces belong to the name.
                status.name = raw.strip_prefix('\t').unwrap_or(raw).to_string();
                identified = true;
            }
            "State" => {
                status.state = value.to_string();
                identified = true;
            }
            "Pid" => {
                status.pid = leading_num(value);
                identified = true;
            }
            "Tgid" => status.tgid = leading_num(value),
            "Ngid" => status.ngid = leading_num(value),
            "PPid" => status.ppid = leading_num(value),
            "TracerPid" => status.tracer_pid = leading_num(value),
            "Uid" => status.uid = parse_ids(value),
            "Gid" => status.gid = parse_ids(value),
            "FDSize" => status.fd_size = leading_num(value),
            "Groups" => {
                status.groups = value
                    .split_whitespace()
                    .filter_map(|tok| tok.parse().ok())
                    .collect();
            }
            "VmPeak" => status.vm_peak = leading_num(value),
            "VmSize" => status.vm_size = leading_num(value),
            "VmLck" => status.vm_lck = leading_num(value),
            "VmPin" => status.vm_pin = leading_num(value),
            "VmHWM" => status.vm_hwm = leading_num(value),
            "VmRSS" => status.vm_rss = leading_num(value),
            "VmData" => status.vm_data = leading_num(value),
            "VmStk" => status.vm_stk = leading_num(value),
            "VmExe" => status.vm_exe = leading_num(value),
            "VmLib" => status.vm_lib = leading_num(value),
            "VmPTE" => status.vm_pte = leading_num(value),
            "VmSwap" => status.vm_swap = leading_num(value),
            "Threads" => status.threads = leading_num(value),
            "SigQ" => status.sig_q = parse_sig_queue(value),
            "SigPnd" => status.sig_pnd = value.to_string(),
            "ShdPnd" => status.shd_pnd = value.to_string(),
            "SigBlk" => status.sig_blk = value.to_string(),
            "SigIgn" => status.sig_ign = value.to_string(),
            "SigCgt" => status.sig_cgt = value.to_string(),
            "CapInh" => status.cap_inh = value.to_string(),
            "CapPrm" => status.cap_prm = value.to_string(),
            "CapEff" => status.cap_eff = value.to_string(),
            "CapBnd" => status.cap_bnd = value.to_string(),
            "Seccomp" => status.seccomp = leading_num(value),
            "Cpus_allowed" => status.cpus_allowed = value.to_string(),
            "Cpus_allowed_list" => status.cpus_allowed_list = value.to_string(),
            "Mems_allowed" => status.mems_allowed = value.to_string(),
            "Mems_allowed_list" => status.mems_allowed_list = value.to_string(),
            "voluntary_ctxt_switches" => status.voluntary_ctxt_switches = leading_num(value),
            "nonvoluntary_ctxt_switches" => {
                status.nonvoluntary_ctxt_switches = leading_num(value)
            }
            _ => {}
        }
    }

    if !identified {
        return Err(ProcReaderError::malformed(
            RecordKind::Status,
            "no Name, State or Pid line",
            content,
        ));
    }

    Ok(status)
}
