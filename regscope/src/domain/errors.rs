//! Structured error types for regscope
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to decode one ring-buffer record
///
/// Every variant except [`DecodeError::UnsupportedEvent`] leaves the byte
/// cursor at an unknown position; the record must be dropped and the caller
/// decides whether the session can continue at the next record boundary.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Truncated header: {field} at offset {offset} needs {needed} bytes, {available} left")]
    TruncatedHeader { field: &'static str, offset: usize, needed: usize, available: usize },

    #[error("Truncated payload: {field} at offset {offset} needs {needed} bytes, {available} left")]
    TruncatedPayload { field: &'static str, offset: usize, needed: usize, available: usize },

    #[error("Stack capture declares {declared} bytes but only {available} are left")]
    StackSizeMismatch { declared: u64, available: usize },

    #[error("Framing error: SampleSize {sample_size} expects {expected} bytes, cursor at {consumed}")]
    FramingError { sample_size: u32, consumed: usize, expected: usize },

    #[error("Unsupported event id {event_id} ({} bytes left)", .raw.len())]
    UnsupportedEvent { event_id: u32, raw: Vec<u8> },
}

impl DecodeError {
    /// Returns true if the error desynchronized the cursor
    ///
    /// An unsupported event is reported but its framing is still intact.
    #[must_use]
    pub fn is_fatal_to_record(&self) -> bool {
        !matches!(self, DecodeError::UnsupportedEvent { .. })
    }
}

/// Failure to obtain a memory map snapshot
#[derive(Error, Debug)]
pub enum MapsError {
    #[error("Failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Signal {0} not supported")]
    UnknownSignal(String),

    #[error("Invalid archive spec {0:?}, expected PID=FILE")]
    InvalidArchiveSpec(String),
}

#[derive(Error, Debug)]
pub enum DumpError {
    #[error("Truncated dump: record at offset {offset} needs {needed} bytes, {available} left")]
    TruncatedDump { offset: usize, needed: usize, available: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::TruncatedHeader {
            field: "pid",
            offset: 24,
            needed: 4,
            available: 1,
        };
        assert_eq!(err.to_string(), "Truncated header: pid at offset 24 needs 4 bytes, 1 left");
    }

    #[test]
    fn test_unsupported_event_is_not_fatal_to_record() {
        let err = DecodeError::UnsupportedEvent { event_id: 1, raw: vec![0; 3] };
        assert!(!err.is_fatal_to_record());
        assert!(err.to_string().contains("3 bytes left"));

        let err = DecodeError::FramingError { sample_size: 60, consumed: 70, expected: 64 };
        assert!(err.is_fatal_to_record());
    }
}
