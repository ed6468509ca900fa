//! Schema ID constants for JSON output contracts.
//!
//! Every procreader JSON report carries a `schema_id` field naming the shape
//! of the document, so consumers can detect version changes without sniffing
//! field names.
//!
//! ## URI Structure
//!
//! ```text
//! https://procreader.dev/schemas/<topic>/<version>/<filename>
//! ```

/// Schema ID for the parsed process record report (v1.0.0).
///
/// This schema defines the structure of `procreader record` output.
pub const PROCESS_RECORD_V1: &str =
    "https://procreader.dev/schemas/process/v1.0.0/process-record.schema.json";

/// Schema ID for the docker-top compatible report (v1.0.0).
///
/// This schema defines the structure of `procreader top` output.
pub const DOCKER_TOP_V1: &str =
    "https://procreader.dev/schemas/process/v1.0.0/docker-top.schema.json";

/// Schema ID for reader configuration input (v1.0.0).
pub const READER_CONFIG_V1: &str =
    "https://procreader.dev/schemas/config/v1.0.0/reader-config.schema.json";

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [&str; 3] = [PROCESS_RECORD_V1, DOCKER_TOP_V1, READER_CONFIG_V1];

    #[test]
    fn test_schema_ids_are_https() {
        for id in ALL {
            assert!(id.starts_with("https://procreader.dev/schemas/"));
            assert!(id.ends_with(".schema.json"));
        }
    }

    #[test]
    fn test_schema_ids_are_versioned() {
        for id in ALL {
            assert!(id.contains("/v1.0.0/"), "unversioned schema id: {id}");
        }
    }
}
