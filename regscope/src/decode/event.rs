//! Raw records and decoded context events

use regscope_common::{ContextHeader, REG_COUNT};
use std::fmt;

use super::payload::Payload;
use crate::config::ExtraOptions;
use crate::domain::{Pid, Tid, Timestamp};

/// One record as delivered by the ring-buffer reader
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    /// Outer record kind (`PERF_RECORD_SAMPLE` for context samples)
    pub record_type: u32,
    /// Sample bytes starting at the `SampleSize` tag
    pub raw_sample: &'a [u8],
    /// Payload selection for the probe that produced this record
    pub options: ExtraOptions,
}

/// Result of decoding one record
#[derive(Debug)]
pub enum Decoded<'a> {
    Context(ContextEvent),
    /// Not a context sample, left for the generic handler
    Foreign(Record<'a>),
}

/// Receives records whose outer kind the context decoder does not own
pub trait ForeignRecordHandler {
    fn handle(&mut self, record: &Record<'_>);
}

/// A fully decoded context sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEvent {
    /// Declared size of the sample, excluding its own 4-byte tag
    pub sample_size: u32,
    pub header: ContextHeader,
    pub payload: Option<Payload>,
    /// Payload selection the record was decoded with
    pub options: ExtraOptions,
    /// Rendered backtrace, empty when none was produced
    pub stackinfo: String,
}

impl ContextEvent {
    #[must_use]
    pub fn event_id(&self) -> u32 {
        self.header.event_id
    }

    #[must_use]
    pub fn pid(&self) -> Pid {
        Pid(self.header.pid)
    }

    #[must_use]
    pub fn tid(&self) -> Tid {
        Tid(self.header.tid)
    }

    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        Timestamp(self.header.ts)
    }

    /// Process name without NUL padding or surrounding whitespace
    #[must_use]
    pub fn comm(&self) -> String {
        let end = self.header.comm.iter().rposition(|&b| b != 0).map_or(0, |pos| pos + 1);
        let start = self.header.comm[..end].iter().position(|&b| b != 0).unwrap_or(end);
        String::from_utf8_lossy(&self.header.comm[start..end]).trim().to_string()
    }

    /// Key grouping events of the same thread
    #[must_use]
    pub fn uuid(&self) -> String {
        format!("{}_{}", self.header.pid, self.header.tid)
    }

    /// Captured registers, if a payload was decoded
    #[must_use]
    pub fn registers(&self) -> Option<&[u64; REG_COUNT]> {
        self.payload.as_ref().map(Payload::regs)
    }
}

impl fmt::Display for ContextEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = &self.header;
        write!(f, "event_id:{} ts:{}", h.event_id, h.ts)?;
        write!(f, ", host_pid:{}, host_tid:{}", h.host_pid, h.host_tid)?;
        write!(f, ", Uid:{}, pid:{}, tid:{}", h.uid, h.pid, h.tid)?;
        write!(f, ", Comm:{}, argnum:{}", self.comm(), h.argnum)
    }
}
