//! # Ring-Buffer Record Decoding
//!
//! Turns one raw sample into a [`ContextEvent`]:
//!
//! ```text
//! raw sample ─▶ ContextDecoder ─▶ dispatch on event id ─▶ extract_payload ─▶ reconcile_padding
//!               (SampleSize +       (plain events only)     (RegsBuf or        (cursor ends at
//!                header fields)                              UnwindBuf)         SampleSize + 4)
//! ```
//!
//! Decoding is a pure function of the input bytes plus configuration; the only
//! side effects are the pid notifications sent to the [`PidObserver`](crate::registry::PidObserver).
//!
//! Every failure except an unsupported event id leaves the record unreadable.
//! Callers log the raw sample and move on to the next record boundary.

pub mod context;
pub mod cursor;
pub mod event;
pub mod payload;

pub use context::{is_plain_event, reconcile_padding, ContextDecoder};
pub use cursor::ByteCursor;
pub use event::{ContextEvent, Decoded, ForeignRecordHandler, Record};
pub use payload::{extract_payload, Payload, RegsBuf, UnwindBuf};
