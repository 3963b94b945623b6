//! # regscope - Context Sample Decoding and User-Space Backtraces
//!
//! regscope is the user-space half of a kernel tracing tool. Probes in the
//! kernel capture a fixed event header plus, on request, a register snapshot
//! or a register snapshot with a copy of the user stack. This crate turns
//! those raw ring-buffer records back into structured events and rebuilds
//! `module + offset` backtraces from the captured bytes.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Kernel probes (not part of this crate)          │
//! │  • syscall enter/exit, uprobes                                  │
//! │  • optional register snapshot / stack copy                      │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ raw records: SampleSize | header | payload | pad
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        regscope (This Crate)                    │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │   Decode     │──▶│  Processing  │──▶│   Display    │         │
//! │  │ header/payld │   │   pipeline   │   │  text / JSON │         │
//! │  └──────┬───────┘   └──────┬───────┘   └──────────────┘         │
//! │         │                  │                                    │
//! │         ▼                  ▼                                    │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │  Registry    │   │   Unwind     │──▶│ Symbolization│         │
//! │  │ seen/stopped │   │  registers + │   │ live maps or │         │
//! │  └──────────────┘   │  frame recs  │   │   archive    │         │
//! │                     └──────────────┘   └──────────────┘         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`decode`]: byte cursor, [`decode::ContextDecoder`], payload extraction,
//!   padding reconciliation against the declared `SampleSize`
//! - [`symbolization`]: `/proc/<pid>/maps` parsing, mapping archive and the
//!   ordered live → archive → parent archive fallback
//! - [`unwind`]: register layout table and [`unwind::StackUnwinder`]
//! - [`registry`]: thread-safe seen/stopped pid sets
//! - [`processing`]: per-record pipeline, event rendering, dump splitting,
//!   hex dumps
//! - [`config`]: decode settings and signal-name parsing
//! - [`cli`]: command-line argument parsing
//! - [`domain`]: newtypes and error enums
//!
//! ## Error Taxonomy
//!
//! - **Fatal to the record**: truncation, stack size mismatch, framing errors.
//!   The record is dropped and logged with a hex dump.
//! - **Reported**: unsupported event ids, returned with the remaining bytes.
//! - **Recoverable**: no maps for a process. Symbols become `UNKNOWN` and the
//!   backtrace is empty.
//! - **Best effort**: malformed maps lines are skipped.
//!
//! ## Typical Usage
//!
//! ```bash
//! # Summaries of every record in a dump
//! regscope decode samples.bin
//!
//! # Backtraces, program counter first, JSON lines
//! regscope decode samples.bin --unwind-stack --show-pc --json
//!
//! # Where does this address live?
//! regscope resolve --pid 1234 0x7f8a001234
//! ```

pub mod cli;
pub mod config;
pub mod decode;
pub mod domain;
pub mod processing;
pub mod registry;
pub mod symbolization;
pub mod unwind;
