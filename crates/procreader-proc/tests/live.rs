//! Reads against the running kernel's `/proc`.
#![cfg(target_os = "linux")]

use procreader_proc::{derive_metrics_from_source, page_size, read_process, ProcFs, ReaderConfig};

#[test]
fn test_read_self() {
    let pid = std::process::id() as u64;
    let config = ReaderConfig::default();
    let source = ProcFs::default();

    let record = read_process(pid, &source, &config).unwrap();
    assert_eq!(record.stat.pid, pid);
    assert_eq!(record.status.pid, pid);
    assert!(!record.stat.comm.is_empty());
    assert!(record.stat.field_count >= 20);
    assert!(record.statm.resident > 0);
    assert!(record.statm.resident_kb(page_size()) >= 4);
    assert!(!record.cmdline.is_empty());

    let metrics = derive_metrics_from_source(&record, &source, &config).unwrap();
    assert!((0.0..=99.9).contains(&metrics.pcpu));
    assert!((0.0..=99.9).contains(&metrics.pmem));
    assert!(metrics.c <= 99);
    assert!(metrics.elapsed_secs >= 0.0);
}

#[test]
fn test_init_process_visible() {
    let record = read_process(1, &ProcFs::default(), &ReaderConfig::default());
    // Hardened /proc (hidepid) may refuse; anything else must parse.
    if let Err(err) = &record {
        assert!(err.record_kind().is_none(), "{err}");
    }
}
