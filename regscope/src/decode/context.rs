//! Context header decoding and record framing
//!
//! The decoder reads the fixed header field by field in wire order, dispatches
//! on the event id, pulls the optional payload, and finally reconciles the
//! trailing pad against the declared `SampleSize` so the cursor ends exactly
//! on the record boundary.

use log::debug;
use regscope_common::{
    ContextHeader, HEADER_PADDING_LEN, PERF_RECORD_SAMPLE, SAMPLE_SIZE_TAG_LEN, SYSCALL_ENTER,
    SYSCALL_EXIT, TASK_COMM_LEN, UPROBE_ENTER,
};

use super::cursor::{ByteCursor, Section};
use super::event::{ContextEvent, Decoded, Record};
use super::payload::extract_payload;
use crate::config::DecodeConfig;
use crate::domain::{DecodeError, Pid};
use crate::registry::PidObserver;

/// Returns true for event ids whose header carries no further framing
#[must_use]
pub fn is_plain_event(event_id: u32) -> bool {
    matches!(event_id, SYSCALL_ENTER | SYSCALL_EXIT | UPROBE_ENTER)
}

/// Decodes context samples
///
/// Holds no mutable state: the same decoder can be shared by every reader
/// thread. Pid notifications go to the observer passed in at construction.
pub struct ContextDecoder<'a> {
    config: &'a DecodeConfig,
    observer: &'a dyn PidObserver,
}

impl<'a> ContextDecoder<'a> {
    #[must_use]
    pub fn new(config: &'a DecodeConfig, observer: &'a dyn PidObserver) -> Self {
        Self { config, observer }
    }

    #[must_use]
    pub fn config(&self) -> &'a DecodeConfig {
        self.config
    }

    /// Decode one record up to and including its trailing pad
    ///
    /// Records of another outer kind are returned untouched as
    /// [`Decoded::Foreign`]. The returned event has an empty backtrace;
    /// symbolization happens later in the pipeline.
    ///
    /// # Errors
    /// - [`DecodeError::TruncatedHeader`] / [`DecodeError::TruncatedPayload`] on short reads
    /// - [`DecodeError::StackSizeMismatch`] when the stack capture is cut short
    /// - [`DecodeError::UnsupportedEvent`] for event ids without a decoder
    /// - [`DecodeError::FramingError`] when the pad does not line up with `SampleSize`
    pub fn decode_record<'r>(&self, record: &Record<'r>) -> Result<Decoded<'r>, DecodeError> {
        if record.record_type != PERF_RECORD_SAMPLE {
            return Ok(Decoded::Foreign(*record));
        }

        let mut cursor = ByteCursor::new(record.raw_sample);
        let (sample_size, header) = self.decode_header(&mut cursor)?;

        if !is_plain_event(header.event_id) {
            return Err(DecodeError::UnsupportedEvent {
                event_id: header.event_id,
                raw: cursor.rest().to_vec(),
            });
        }

        let payload = extract_payload(&mut cursor, record.options)?;
        let pad = reconcile_padding(&mut cursor, sample_size)?;
        debug!(
            "decoded event_id={} pid={} payload={} pad={pad}",
            header.event_id,
            header.pid,
            payload.is_some()
        );

        Ok(Decoded::Context(ContextEvent {
            sample_size,
            header,
            payload,
            options: record.options,
            stackinfo: String::new(),
        }))
    }

    /// Read `SampleSize` and the fixed header in wire order
    ///
    /// Notifies the observer of the pid: as stopped right after the pid field
    /// when the session stops processes with `SIGSTOP`, and as seen once the
    /// whole header decoded.
    ///
    /// # Errors
    /// Returns [`DecodeError::TruncatedHeader`] naming the first field that
    /// ran past the end of the sample
    pub fn decode_header(
        &self,
        cursor: &mut ByteCursor<'_>,
    ) -> Result<(u32, ContextHeader), DecodeError> {
        cursor.set_section(Section::Header);
        let sample_size = cursor.read_u32("sample_size")?;
        let ts = cursor.read_u64("ts")?;
        let event_id = cursor.read_u32("event_id")?;
        let host_tid = cursor.read_u32("host_tid")?;
        let host_pid = cursor.read_u32("host_pid")?;
        let tid = cursor.read_u32("tid")?;
        let pid = cursor.read_u32("pid")?;
        if self.config.stops_on_signal() && pid != 0 {
            self.observer.pid_stopped(Pid(pid));
        }
        let uid = cursor.read_u32("uid")?;
        let comm = cursor.read_array::<TASK_COMM_LEN>("comm")?;
        let argnum = cursor.read_u32("argnum")?;
        let padding = cursor.read_array::<HEADER_PADDING_LEN>("padding")?;

        self.observer.pid_seen(Pid(pid));

        let header = ContextHeader {
            ts,
            event_id,
            host_tid,
            host_pid,
            tid,
            pid,
            uid,
            comm,
            argnum,
            _padding: padding,
        };
        Ok((sample_size, header))
    }
}

/// Consume the trailing pad so the cursor lands on `SampleSize + 4`
///
/// Returns the number of pad bytes consumed.
///
/// # Errors
/// Returns [`DecodeError::FramingError`] if the cursor is already past the
/// record end or fewer than `pad` bytes remain
pub fn reconcile_padding(
    cursor: &mut ByteCursor<'_>,
    sample_size: u32,
) -> Result<usize, DecodeError> {
    let consumed = cursor.position();
    let expected = sample_size as usize + SAMPLE_SIZE_TAG_LEN;
    let framing_error = DecodeError::FramingError { sample_size, consumed, expected };

    let pad = expected.checked_sub(consumed).ok_or(framing_error)?;
    if pad > 0 {
        cursor.read_bytes("padding", pad).map_err(|_| DecodeError::FramingError {
            sample_size,
            consumed,
            expected,
        })?;
    }
    Ok(pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtraOptions;
    use crate::registry::{NoopObserver, PidRegistry};
    use regscope_common::CONTEXT_HEADER_LEN;

    fn header_bytes(sample_size: u32, event_id: u32, pid: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&sample_size.to_le_bytes());
        out.extend_from_slice(&77u64.to_le_bytes());
        out.extend_from_slice(&event_id.to_le_bytes());
        for value in [101u32, 100, 2, pid, 10_123] {
            out.extend_from_slice(&value.to_le_bytes());
        }
        let mut comm = [0u8; TASK_COMM_LEN];
        comm[..4].copy_from_slice(b"test");
        out.extend_from_slice(&comm);
        out.extend_from_slice(&3u32.to_le_bytes());
        out.extend_from_slice(&[0u8; HEADER_PADDING_LEN]);
        out
    }

    fn sample(options: ExtraOptions, bytes: &[u8]) -> Record<'_> {
        Record { record_type: PERF_RECORD_SAMPLE, raw_sample: bytes, options }
    }

    #[test]
    fn test_decode_header_fields() {
        let config = DecodeConfig::default();
        let decoder = ContextDecoder::new(&config, &NoopObserver);
        let bytes = header_bytes(CONTEXT_HEADER_LEN as u32, SYSCALL_ENTER, 1234);
        let mut cursor = ByteCursor::new(&bytes);

        let (sample_size, header) = decoder.decode_header(&mut cursor).unwrap();
        assert_eq!(sample_size, 56);
        assert_eq!(header.ts, 77);
        assert_eq!(header.event_id, SYSCALL_ENTER);
        assert_eq!((header.host_tid, header.host_pid), (101, 100));
        assert_eq!((header.tid, header.pid, header.uid), (2, 1234, 10_123));
        assert_eq!(&header.comm[..4], b"test");
        assert_eq!(header.argnum, 3);
        assert_eq!(cursor.position(), SAMPLE_SIZE_TAG_LEN + CONTEXT_HEADER_LEN);
    }

    #[test]
    fn test_truncated_header_names_field() {
        let config = DecodeConfig::default();
        let decoder = ContextDecoder::new(&config, &NoopObserver);
        let bytes = header_bytes(56, SYSCALL_ENTER, 1);

        // Cut inside the comm field
        let mut cursor = ByteCursor::new(&bytes[..40]);
        let err = decoder.decode_header(&mut cursor).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TruncatedHeader { field: "comm", offset: 36, needed: 16, available: 4 }
        ));
    }

    #[test]
    fn test_stop_marking_follows_kill_signal() {
        let registry = PidRegistry::new();
        let mut config = DecodeConfig::default();
        let bytes = header_bytes(56, SYSCALL_EXIT, 55);

        ContextDecoder::new(&config, &registry).decode_header(&mut ByteCursor::new(&bytes)).unwrap();
        assert!(registry.is_seen(Pid(55)));
        assert!(!registry.is_stopped(Pid(55)));

        config.kill_signal = Some(libc::SIGSTOP);
        ContextDecoder::new(&config, &registry).decode_header(&mut ByteCursor::new(&bytes)).unwrap();
        assert!(registry.is_stopped(Pid(55)));

        let zero = header_bytes(56, SYSCALL_EXIT, 0);
        ContextDecoder::new(&config, &registry).decode_header(&mut ByteCursor::new(&zero)).unwrap();
        assert!(!registry.is_stopped(Pid(0)));
    }

    #[test]
    fn test_stop_marking_happens_even_if_rest_of_header_is_truncated() {
        let registry = PidRegistry::new();
        let config = DecodeConfig { kill_signal: Some(libc::SIGSTOP), ..Default::default() };
        let bytes = header_bytes(56, SYSCALL_EXIT, 9);

        let decoder = ContextDecoder::new(&config, &registry);
        assert!(decoder.decode_header(&mut ByteCursor::new(&bytes[..34])).is_err());
        assert!(registry.is_stopped(Pid(9)));
    }

    #[test]
    fn test_unsupported_event_carries_rest() {
        let config = DecodeConfig::default();
        let decoder = ContextDecoder::new(&config, &NoopObserver);
        let mut bytes = header_bytes(60, 999, 1);
        bytes.extend_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd]);

        let err = decoder.decode_record(&sample(ExtraOptions::default(), &bytes)).unwrap_err();
        match err {
            DecodeError::UnsupportedEvent { event_id, raw } => {
                assert_eq!(event_id, 999);
                assert_eq!(raw, vec![0xaa, 0xbb, 0xcc, 0xdd]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_foreign_record_is_forwarded() {
        let config = DecodeConfig::default();
        let decoder = ContextDecoder::new(&config, &NoopObserver);
        let record = Record { record_type: 1, raw_sample: &[1, 2, 3], options: ExtraOptions::default() };

        assert!(matches!(decoder.decode_record(&record), Ok(Decoded::Foreign(r)) if r.record_type == 1));
    }

    #[test]
    fn test_padding_is_consumed_exactly() {
        let mut bytes = header_bytes(64, UPROBE_ENTER, 1);
        bytes.extend_from_slice(&[0u8; 8]);
        let config = DecodeConfig::default();
        let decoder = ContextDecoder::new(&config, &NoopObserver);

        let mut cursor = ByteCursor::new(&bytes);
        let (sample_size, _) = decoder.decode_header(&mut cursor).unwrap();
        assert_eq!(reconcile_padding(&mut cursor, sample_size).unwrap(), 8);
        assert_eq!(cursor.position(), 68);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_short_padding_is_framing_error() {
        let mut bytes = header_bytes(64, UPROBE_ENTER, 1);
        bytes.extend_from_slice(&[0u8; 5]);
        let config = DecodeConfig::default();
        let decoder = ContextDecoder::new(&config, &NoopObserver);

        let err = decoder.decode_record(&sample(ExtraOptions::default(), &bytes)).unwrap_err();
        assert!(matches!(err, DecodeError::FramingError { sample_size: 64, consumed: 60, expected: 68 }));
    }

    #[test]
    fn test_over_read_is_framing_error() {
        // SampleSize smaller than the header itself
        let bytes = header_bytes(40, SYSCALL_ENTER, 1);
        let config = DecodeConfig::default();
        let decoder = ContextDecoder::new(&config, &NoopObserver);

        let err = decoder.decode_record(&sample(ExtraOptions::default(), &bytes)).unwrap_err();
        assert!(matches!(err, DecodeError::FramingError { sample_size: 40, consumed: 60, expected: 44 }));
    }
}
