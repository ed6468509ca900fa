//! Parser for `/proc/[pid]/stat`.
//!
//! Format: `pid (comm) state ppid pgrp session tty_nr tpgid flags ...`
//!
//! `comm` is user controlled and may contain spaces, parentheses and even
//! newlines, so it is cut out first: everything between the first `(` and the
//! last `)`. The rest of the line is positional. Older kernels print fewer
//! trailing fields, so the decoder fills whatever is present and leaves the
//! remainder at zero.

use std::str::FromStr;

use procreader_core::{ProcReaderError, ProcReaderResult, RecordKind};
use serde::Serialize;

/// Positional fields (after `comm`) needed for a usable record: `state`
/// through `starttime`.
pub const MIN_STAT_FIELDS: usize = 20;

/// Positional fields (after `comm`) printed by current kernels.
pub const MAX_STAT_FIELDS: usize = 50;

/// Parsed `/proc/[pid]/stat`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatFields {
    pub pid: u64,
    pub comm: String,
    pub state: char,
    pub ppid: i64,
    pub pgrp: i64,
    pub session: i64,
    /// Packed controlling terminal device number, see [`crate::tty`].
    pub tty_nr: i64,
    /// Foreground process group of the controlling terminal, `-1` if none.
    pub tpgid: i64,
    pub flags: u64,
    pub min_flt: u64,
    pub cmin_flt: u64,
    pub maj_flt: u64,
    pub cmaj_flt: u64,
    /// Clock ticks.
    pub utime: u64,
    pub stime: u64,
    pub cutime: i64,
    pub cstime: i64,
    pub priority: i64,
    pub nice: i64,
    pub num_threads: i64,
    pub it_real_value: i64,
    /// Clock ticks since boot.
    pub start_time: u64,
    /// Bytes.
    pub vsize: u64,
    /// Pages.
    pub rss: i64,
    pub rsslim: u64,
    pub start_code: u64,
    pub end_code: u64,
    pub start_stack: u64,
    pub kstk_esp: u64,
    pub kstk_eip: u64,
    /// Signal bitmaps, decimal as printed by the kernel.
    pub signal: String,
    pub blocked: String,
    pub sig_ignore: String,
    pub sig_catch: String,
    pub wchan: u64,
    pub nswap: u64,
    pub cnswap: u64,
    pub exit_signal: i64,
    pub processor: u64,
    pub rt_priority: u64,
    pub policy: u64,
    pub delayacct_blkio_ticks: u64,
    pub guest_time: u64,
    pub cguest_time: i64,
    pub start_data: u64,
    pub end_data: u64,
    pub start_brk: u64,
    pub arg_start: u64,
    pub arg_end: u64,
    pub env_start: u64,
    pub env_end: u64,
    pub exit_code: i64,

    /// Number of positional fields the kernel actually printed.
    pub field_count: usize,
}

/// Positional tokens after `comm`.
struct Fields<'a> {
    tokens: Vec<&'a str>,
    content: &'a str,
}

impl<'a> Fields<'a> {
    fn malformed(&self, reason: impl Into<String>) -> ProcReaderError {
        ProcReaderError::malformed(RecordKind::Stat, reason, self.content)
    }

    /// Absent tokens decode to the zero value; present ones must parse.
    fn num<T: FromStr + Default>(&self, idx: usize, name: &str) -> ProcReaderResult<T> {
        match self.tokens.get(idx) {
            None => Ok(T::default()),
            Some(tok) => tok
                .parse()
                .map_err(|_| self.malformed(format!("invalid {name} '{tok}'"))),
        }
    }

    fn text(&self, idx: usize) -> String {
        self.tokens
            .get(idx)
            .map(|s| s.to_string())
            .unwrap_or_default()
    }
}

/// Parse `/proc/[pid]/stat` content.
pub fn parse_stat(content: &str) -> ProcReaderResult<StatFields> {
    let malformed = |reason: &str| ProcReaderError::malformed(RecordKind::Stat, reason, content);

    if content.trim().is_empty() {
        return Err(malformed("empty stat record"));
    }

    let open = content.find('(').ok_or_else(|| malformed("missing '('"))?;
    let close = content.rfind(')').ok_or_else(|| malformed("missing ')'"))?;
    if close < open {
        return Err(malformed("unpaired parentheses"));
    }

    let pid: u64 = content[..open]
        .trim()
        .parse()
        .map_err(|_| malformed("invalid pid"))?;
    let comm = content[open + 1..close].to_string();

    let f = Fields {
        tokens: content[close + 1..].split_whitespace().collect(),
        content,
    };
    if f.tokens.len() < MIN_STAT_FIELDS {
        return Err(f.malformed(format!(
            "expected at least {MIN_STAT_FIELDS} fields after comm, got {}",
            f.tokens.len()
        )));
    }

    let mut state_chars = f.tokens[0].chars();
    let state = match (state_chars.next(), state_chars.next()) {
        (Some(c), None) => c,
        _ => return Err(f.malformed(format!("invalid state '{}'", f.tokens[0]))),
    };

    Ok(StatFields {
        pid,
        comm,
        state,
        ppid: f.num(1, "ppid")?,
        pgrp: f.num(2, "pgrp")?,
        session: f.num(3, "session")?,
        tty_nr: f.num(4, "tty_nr")?,
        tpgid: f.num(5, "tpgid")?,
        flags: f.num(6, "flags")?,
        min_flt: f.num(7, "minflt")?,
        cmin_flt: f.num(8, "cminflt")?,
        maj_flt: f.num(9, "majflt")?,
        cmaj_flt: f.num(10, "cmajflt")?,
        utime: f.num(11, "utime")?,
        stime: f.num(12, "stime")?,
        cutime: f.num(13, "cutime")?,
        cstime: f.num(14, "cstime")?,
        priority: f.num(15, "priority")?,
        nice: f.num(16, "nice")?,
        num_threads: f.num(17, "num_threads")?,
        it_real_value: f.num(18, "itrealvalue")?,
        start_time: f.num(19, "starttime")?,
        vsize: f.num(20, "vsize")?,
        rss: f.num(21, "rss")?,
        rsslim: f.num(22, "rsslim")?,
        start_code: f.num(23, "startcode")?,
        end_code: f.num(24, "endcode")?,
        start_stack: f.num(25, "startstack")?,
        kstk_esp: f.num(26, "kstkesp")?,
        kstk_eip: f.num(27, "kstkeip")?,
        signal: f.text(28),
        blocked: f.text(29),
        sig_ignore: f.text(30),
        sig_catch: f.text(31),
        wchan: f.num(32, "wchan")?,
        nswap: f.num(33, "nswap")?,
        cnswap: f.num(34, "cnswap")?,
        exit_signal: f.num(35, "exit_signal")?,
        processor: f.num(36, "processor")?,
        rt_priority: f.num(37, "rt_priority")?,
        policy: f.num(38, "policy")?,
        delayacct_blkio_ticks: f.num(39, "delayacct_blkio_ticks")?,
        guest_time: f.num(40, "guest_time")?,
        cguest_time: f.num(41, "cguest_time")?,
        start_data: f.num(42, "start_data")?,
        end_data: f.num(43, "end_data")?,
        start_brk: f.num(44, "start_brk")?,
        arg_start: f.num(45, "arg_start")?,
        arg_end: f.num(46, "arg_end")?,
        env_start: f.num(47, "env_start")?,
        env_end: f.num(48, "env_end")?,
        exit_code: f.num(49, "exit_code")?,
        field_count: f.tokens.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASH: &str = "15220 (bash) S 15160 15220 15220 34817 29367 4219136 161706 6374605 11 796 28 33 25909 3879 20 0 1 0 131158 21934080 985 18446744073709551615 4194304 5173212 140736926389104 140736926387816 140716594644428 0 65536 3670020 1266777851 18446744071579277074 0 0 17 0 0 0 7 0 0 7273968 7310504 32763904 140736926396005 140736926396011 140736926396011 140736926396398 0\n";

    #[test]
    fn test_parse_full_line() {
        let stat = parse_stat(BASH).unwrap();
        assert_eq!(stat.pid, 15220);
        assert_eq!(stat.comm, "bash");
        assert_eq!(stat.state, 'S');
        assert_eq!(stat.ppid, 15160);
        assert_eq!(stat.pgrp, 15220);
        assert_eq!(stat.session, 15220);
        assert_eq!(stat.tty_nr, 34817);
        assert_eq!(stat.tpgid, 29367);
        assert_eq!(stat.utime, 28);
        assert_eq!(stat.stime, 33);
        assert_eq!(stat.start_time, 131158);
        assert_eq!(stat.rsslim, u64::MAX);
        assert_eq!(stat.blocked, "65536");
        assert_eq!(stat.wchan, 18446744071579277074);
        assert_eq!(stat.exit_signal, 17);
        assert_eq!(stat.delayacct_blkio_ticks, 7);
        assert_eq!(stat.env_end, 140736926396398);
        assert_eq!(stat.exit_code, 0);
        assert_eq!(stat.field_count, MAX_STAT_FIELDS);
    }

    #[test]
    fn test_comm_with_parens_and_spaces() {
        let line = "29821 (:-) 0 1 2 3 4 5) R 15220 29821 15220 34817 29852 4218880 823 0 1 0 3980 3 0 0 20 0 1 0 5829898 11390976 293";
        let stat = parse_stat(line).unwrap();
        assert_eq!(stat.comm, ":-) 0 1 2 3 4 5");
        assert_eq!(stat.state, 'R');
        assert_eq!(stat.ppid, 15220);
        assert_eq!(stat.utime, 3980);
        assert_eq!(stat.start_time, 5829898);
    }

    #[test]
    fn test_comm_that_looks_like_fields() {
        let line = "7 (a) S 1 2 3 (b)) Z 99 7 7 0 -1 0 0 0 0 0 5 6 0 0 20 0 1 0 1234";
        let stat = parse_stat(line).unwrap();
        assert_eq!(stat.comm, "a) S 1 2 3 (b)");
        assert_eq!(stat.state, 'Z');
        assert_eq!(stat.ppid, 99);
        assert_eq!(stat.start_time, 1234);
    }

    #[test]
    fn test_comm_with_newline() {
        let line = "8 (two\nlines) S 1 8 8 0 -1 0 0 0 0 0 1 2 0 0 20 0 1 0 55";
        let stat = parse_stat(line).unwrap();
        assert_eq!(stat.comm, "two\nlines");
        assert_eq!(stat.start_time, 55);
    }

    #[test]
    fn test_short_tail_defaults_to_zero() {
        let line = "29167 (sshd) S 1 29167 29167 0 -1 4202816 34440643 2073340695 0 512 495 2615 147515 115358 15 0 1 0 53885311 50077696 300 18446744073709551615 93824992231424 93824992662604 140734328009440 18446744073709551615 47340894086243 0 0 4096 81925 0 0 0 17 0 0 0 0\n";
        let stat = parse_stat(line).unwrap();
        assert_eq!(stat.field_count, 40);
        assert_eq!(stat.tpgid, -1);
        assert_eq!(stat.utime, 495);
        assert_eq!(stat.kstk_esp, u64::MAX);
        assert_eq!(stat.sig_catch, "81925");
        assert_eq!(stat.exit_signal, 17);
        assert_eq!(stat.guest_time, 0);
        assert_eq!(stat.start_data, 0);
        assert_eq!(stat.env_end, 0);
    }

    #[test]
    fn test_minimum_fields_only() {
        let line = "3 (min) R 1 3 3 0 -1 0 0 0 0 0 10 20 0 0 20 0 1 0 300";
        let stat = parse_stat(line).unwrap();
        assert_eq!(stat.field_count, MIN_STAT_FIELDS);
        assert_eq!(stat.start_time, 300);
        assert_eq!(stat.vsize, 0);
        assert_eq!(stat.signal, "");
    }

    #[test]
    fn test_too_few_fields() {
        let line = "3 (min) R 1 3 3 0 -1 0 0 0 0 0 10 20 0 0 20 0 1 0";
        let err = parse_stat(line).unwrap_err();
        assert_eq!(err.record_kind(), Some(RecordKind::Stat));
        assert!(err.to_string().contains("at least 20"), "{err}");
    }

    #[test]
    fn test_missing_parens() {
        assert!(parse_stat("1 bash S 0").is_err());
        assert!(parse_stat("1 (bash S 0").is_err());
        assert!(parse_stat("1 )bash( S 0").is_err());
    }

    #[test]
    fn test_invalid_pid() {
        let line = "x1 (a) S 1 3 3 0 -1 0 0 0 0 0 10 20 0 0 20 0 1 0 300";
        let err = parse_stat(line).unwrap_err();
        assert!(err.to_string().contains("invalid pid"));
    }

    #[test]
    fn test_invalid_numeric_field() {
        let line = "3 (a) S 1 3 3 0 -1 0 0 0 0 0 ten 20 0 0 20 0 1 0 300";
        let err = parse_stat(line).unwrap_err();
        assert!(err.to_string().contains("invalid utime 'ten'"), "{err}");
    }

    #[test]
    fn test_negative_in_unsigned_field_rejected() {
        let line = "3 (a) S 1 3 3 0 -1 0 0 0 0 0 10 20 0 0 20 0 1 0 -300";
        assert!(parse_stat(line).is_err());
    }

    #[test]
    fn test_empty() {
        let err = parse_stat("").unwrap_err();
        assert!(matches!(
            err,
            ProcReaderError::MalformedRecord {
                kind: RecordKind::Stat,
                ..
            }
        ));
    }
}
