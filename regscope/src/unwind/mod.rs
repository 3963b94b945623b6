//! # Stack Reconstruction
//!
//! Turns a captured register file plus a window of stack bytes into an
//! ordered backtrace, innermost frame first.
//!
//! ```text
//! UnwindBuf ──▶ RegisterLayout::candidate_slots ──▶ executable? ──▶ Frame
//!     │                                                              ▲
//!     └──▶ x29 ──▶ (prev_fp, saved_lr) records in captured stack ────┘
//! ```
//!
//! A value only becomes a frame when it lands in an executable segment of
//! the process's map snapshot, so scratch registers holding data pointers are
//! filtered out.

pub mod registers;
pub mod stack_unwinder;

pub use registers::RegisterLayout;
pub use stack_unwinder::{Backtrace, Frame, FrameSource, StackUnwinder, UnwindOption, MAX_FRAMES};
