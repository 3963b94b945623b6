//! # Event Processing
//!
//! Drives one raw record through the whole pipeline:
//!
//! ```text
//! Record ──▶ ContextDecoder ──▶ payload ──▶ pad ──▶ ContextEvent
//!                                                        │
//!                                  (unwind payload) ◀────┘
//!                                         │
//!                     MapsResolver::snapshot(pid) ──▶ StackUnwinder ──▶ stackinfo
//! ```
//!
//! ## Outcomes
//!
//! - **Decoded**: returned to the caller and, when a channel is attached,
//!   forwarded with a non-blocking send (dropped if the consumer lags)
//! - **Foreign**: handed to the caller's [`ForeignRecordHandler`]
//! - **Unsupported**: logged at warn level and returned as an error
//! - **Fatal**: logged at error level with a hex dump of the raw record and
//!   returned as an error

use crossbeam_channel::Sender;
use log::{debug, error, warn};
use regscope_common::REG_MASK_ALL;
use std::fmt;

use super::hexdump::hexdump;
use crate::config::DecodeConfig;
use crate::decode::{ContextDecoder, ContextEvent, Decoded, ForeignRecordHandler, Payload, Record};
use crate::domain::DecodeError;
use crate::registry::PidObserver;
use crate::symbolization::{MapsArchive, MapsResolver};
use crate::unwind::{StackUnwinder, UnwindOption};

/// Per-outcome record counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorStats {
    pub records: usize,
    pub decoded: usize,
    pub unsupported: usize,
    pub failed: usize,
    pub foreign: usize,
    /// Decoded events the channel consumer could not keep up with
    pub dropped: usize,
}

impl ProcessorStats {
    /// Add another worker's counters into this one
    pub fn merge(&mut self, other: &ProcessorStats) {
        self.records += other.records;
        self.decoded += other.decoded;
        self.unsupported += other.unsupported;
        self.failed += other.failed;
        self.foreign += other.foreign;
        self.dropped += other.dropped;
    }
}

impl fmt::Display for ProcessorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "records={} decoded={} unsupported={} failed={} foreign={} dropped={}",
            self.records, self.decoded, self.unsupported, self.failed, self.foreign, self.dropped
        )
    }
}

/// Encapsulates record processing logic and state
pub struct EventProcessor<'a> {
    pub stats: ProcessorStats,

    // Dependencies (readonly)
    decoder: ContextDecoder<'a>,
    resolver: MapsResolver<'a>,

    // Optional outputs
    event_tx: Option<Sender<ContextEvent>>,
}

impl<'a> EventProcessor<'a> {
    #[must_use]
    pub fn new(
        config: &'a DecodeConfig,
        observer: &'a dyn PidObserver,
        archive: &'a dyn MapsArchive,
        event_tx: Option<Sender<ContextEvent>>,
    ) -> Self {
        Self {
            stats: ProcessorStats::default(),
            decoder: ContextDecoder::new(config, observer),
            resolver: MapsResolver::from_config(config, archive),
            event_tx,
        }
    }

    #[must_use]
    pub fn config(&self) -> &'a DecodeConfig {
        self.decoder.config()
    }

    /// Resolver used for backtraces, shared with event rendering
    #[must_use]
    pub fn resolver(&self) -> &MapsResolver<'a> {
        &self.resolver
    }

    /// Process a single record
    ///
    /// Returns `Ok(None)` for a foreign record after handing it to `foreign`.
    ///
    /// # Errors
    /// Returns the [`DecodeError`] that aborted the record, after logging it
    pub fn process_record(
        &mut self,
        record: &Record<'_>,
        foreign: &mut dyn ForeignRecordHandler,
    ) -> Result<Option<ContextEvent>, DecodeError> {
        self.stats.records += 1;

        let mut event = match self.decoder.decode_record(record) {
            Ok(Decoded::Context(event)) => event,
            Ok(Decoded::Foreign(record)) => {
                self.stats.foreign += 1;
                foreign.handle(&record);
                return Ok(None);
            }
            Err(e) if e.is_fatal_to_record() => {
                self.stats.failed += 1;
                error!("{}", with_raw_dump(&e, record.raw_sample));
                return Err(e);
            }
            Err(e) => {
                self.stats.unsupported += 1;
                warn!("{}", with_raw_dump(&e, record.raw_sample));
                return Err(e);
            }
        };

        self.stats.decoded += 1;
        debug!("{} {} at {}", event.uuid(), event.event_id(), event.timestamp());
        event.stackinfo = self.backtrace(&event);

        if let Some(ref tx) = self.event_tx {
            // Non-blocking send (drop if the consumer is slow)
            if tx.try_send(event.clone()).is_err() {
                self.stats.dropped += 1;
            }
        }

        Ok(Some(event))
    }

    /// Rendered backtrace for an unwind payload, empty otherwise
    ///
    /// A process whose maps cannot be found from any source yields an empty
    /// backtrace rather than an error.
    fn backtrace(&self, event: &ContextEvent) -> String {
        let Some(Payload::Unwind(buf)) = &event.payload else {
            return String::new();
        };
        let Some((snapshot, origin)) = self.resolver.snapshot(event.pid()) else {
            debug!("{}: no maps, backtrace skipped", event.pid());
            return String::new();
        };

        let config = self.config();
        let option = UnwindOption { reg_mask: REG_MASK_ALL, show_pc: config.show_pc };
        let backtrace = StackUnwinder::new(&config.layout, &snapshot).unwind(buf, option);
        debug!("{}: {} frames using {origin} maps", event.pid(), backtrace.frames().len());
        backtrace.to_string()
    }
}

/// Error line followed by a hex dump of the whole raw record
fn with_raw_dump(e: &DecodeError, raw: &[u8]) -> String {
    format!("{e}, raw record:\n{}", hexdump(raw))
}

/// Foreign-record handler that only counts and logs what it receives
#[derive(Debug, Default)]
pub struct LoggingForeignHandler {
    pub seen: usize,
}

impl ForeignRecordHandler for LoggingForeignHandler {
    fn handle(&mut self, record: &Record<'_>) {
        self.seen += 1;
        debug!("foreign record type={} len={}", record.record_type, record.raw_sample.len());
    }
}
