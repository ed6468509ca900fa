//! Parser for the NUL-separated `cmdline` and `environ` blobs.

/// Split a NUL-separated blob into strings.
///
/// The kernel terminates every entry with a NUL, so one trailing NUL is
/// dropped rather than producing an empty last element. Interior empty
/// entries (an empty argv element) are kept. Non-UTF-8 bytes are replaced
/// lossily, since argv and the environment are arbitrary bytes.
pub fn parse_nul_list(blob: &[u8]) -> Vec<String> {
    if blob.is_empty() {
        return Vec::new();
    }
    let body = blob.strip_suffix(b"\0").unwrap_or(blob);
    body.split(|&b| b == 0)
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}
