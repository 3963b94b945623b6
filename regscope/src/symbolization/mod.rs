//! # Symbolization: Address → "module + offset"
//!
//! This module converts raw addresses captured in registers or on the stack
//! into labels of the form `libc.so + 0x4a3c8`. It deliberately stops at the
//! file offset: no ELF or DWARF lookups are done here.
//!
//! ## Map Sources
//!
//! A process's layout can come from two places:
//!
//! ```text
//! 1. Live:    /proc/<pid>/maps, read at decode time
//!             1000-2000 r-xp 00000000 fd:01 42   /system/lib64/libc.so
//!
//! 2. Archive: mapping records delivered earlier by the kernel, replayed in
//!             arrival order into the same segment list
//! ```
//!
//! The [`MapsResolver`] tries them in a fixed order:
//!
//! ```text
//! live read ──fails──▶ own archive ──empty──▶ parent's archive ──empty──▶ UNKNOWN
//! ```
//!
//! The parent step matters right after `fork()`: the child's first events
//! can arrive before any mapping record of its own.
//!
//! ## Address Translation
//!
//! ```text
//! segment: 7f1000000-7f1020000 r-xp 00010000 ... /system/lib64/libc.so
//! address: 0x7f1000500
//! label:   libc.so + 0x(0x10000 + 0x500) = "libc.so + 0x10500"
//! ```
//!
//! Anonymous segments and unmapped addresses resolve to `UNKNOWN`.
//!
//! ## Module Structure
//!
//! - **`memory_maps`**: maps text parsing, [`MapSnapshot`] lookups
//! - **`archive`**: [`MapsArchive`] trait, in-memory [`MmapArchive`], replay
//! - **`resolver`**: [`MapsResolver`] and its ordered [`MapsStrategy`] list
//!
//! ## References
//!
//! - [Linux `/proc/pid/maps` format](https://man7.org/linux/man-pages/man5/proc.5.html)

pub mod archive;
pub mod memory_maps;
pub mod resolver;

pub use archive::{replay, MapNotice, MapsArchive, MmapArchive};
pub use memory_maps::{read_live_maps, MapSegment, MapSnapshot, UNKNOWN_SYMBOL};
pub use resolver::{MapsOrigin, MapsResolver, MapsStrategy};
