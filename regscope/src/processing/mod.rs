//! Record processing pipeline
//!
//! - Event processing: decode, unwind, count, forward
//! - Event rendering: text summary and JSON line
//! - Dump file splitting
//! - Hex dumps for diagnostics

pub mod dump_reader;
pub mod event_display;
pub mod event_processor;
pub mod hexdump;

pub use dump_reader::split_samples;
pub use event_display::{describe, display_stopped, EventJson};
pub use event_processor::{EventProcessor, LoggingForeignHandler, ProcessorStats};
pub use hexdump::hexdump;
