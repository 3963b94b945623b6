//! # Shared Wire Layout (Kernel ↔ Userspace)
//!
//! Constants and structures shared between the kernel-side tracing program and
//! the userspace decoder. Everything the decoder needs to know about byte
//! widths lives here so the two sides cannot drift apart silently.
//!
//! ## Record Layout
//!
//! Every ring-buffer sample is little-endian and looks like:
//!
//! ```text
//! ┌────────────┬──────────────────────────┬──────────────────┬─────────────┐
//! │ SampleSize │ ContextHeader (56 bytes) │ optional payload │ trailing pad│
//! │  4 bytes   │                          │ RegsBuf/UnwindBuf│             │
//! └────────────┴──────────────────────────┴──────────────────┴─────────────┘
//!               ◀──────────────────── SampleSize bytes ────────────────────▶
//! ```
//!
//! ## Key Types
//!
//! - [`ContextHeader`] - fixed header emitted for every traced event
//! - Register slot constants (`REG_ARM64_*`) for the 33-slot register array

#![no_std]

// ============================================================================
// Record Kinds
// ============================================================================

/// Outer record kind carrying a raw sample (`PERF_RECORD_SAMPLE`)
///
/// Any other record kind (mmap, fork, lost, ...) is not a context sample and
/// is handed to a generic handler instead of the decoder.
pub const PERF_RECORD_SAMPLE: u32 = 9;

/// Width of the `SampleSize` tag that prefixes every raw sample
///
/// The tag is not counted in `SampleSize` itself, so a complete record spans
/// `SampleSize + SAMPLE_SIZE_TAG_LEN` bytes.
pub const SAMPLE_SIZE_TAG_LEN: usize = 4;

// ============================================================================
// Event Ids
// ============================================================================

/// `security_file_mprotect` hook (not decoded by the context path)
pub const SECURITY_FILE_MPROTECT: u32 = 456;

/// su file access probe (not decoded by the context path)
pub const SU_FILE_ACCESS: u32 = 457;

/// **Syscall entry**: raw syscall enter tracepoint
pub const SYSCALL_ENTER: u32 = 458;

/// **Syscall exit**: raw syscall exit tracepoint
pub const SYSCALL_EXIT: u32 = 459;

/// **Uprobe entry**: user-space probe hit
pub const UPROBE_ENTER: u32 = 460;

// ============================================================================
// Header Field Widths
// ============================================================================

/// Length of the process name field (`TASK_COMM_LEN` in the kernel)
pub const TASK_COMM_LEN: usize = 16;

/// Reserved bytes closing the header so the payload starts 8-byte aligned
pub const HEADER_PADDING_LEN: usize = 4;

/// Size of [`ContextHeader`] on the wire (everything after `SampleSize`)
pub const CONTEXT_HEADER_LEN: usize = 8 + 4 + 5 * 4 + TASK_COMM_LEN + 4 + HEADER_PADDING_LEN;

// ============================================================================
// Register Snapshot Layout
// ============================================================================

/// Number of register slots captured in every snapshot
pub const REG_COUNT: usize = 33;

/// Last general purpose register slot (`x29`, the frame pointer)
pub const REG_ARM64_X29: usize = 29;

/// Link register slot
pub const REG_ARM64_LR: usize = 30;

/// Stack pointer slot
pub const REG_ARM64_SP: usize = 31;

/// Program counter slot
pub const REG_ARM64_PC: usize = 32;

/// Mask selecting every register slot
pub const REG_MASK_ALL: u64 = (1 << REG_COUNT) - 1;

/// Wire size of a register snapshot: ABI tag followed by the register array
pub const REGS_BUF_LEN: usize = 8 + REG_COUNT * 8;

/// Wire size of an unwind buffer without its captured stack bytes
///
/// ABI tag, register array, `StackSize`, and the trailing `DynSize`.
pub const UNWIND_BUF_FIXED_LEN: usize = REGS_BUF_LEN + 8 + 8;

// ============================================================================
// Shared Data Structures
// ============================================================================

/// Fixed header written by the kernel program in front of every event
///
/// **Memory Layout**: `#[repr(C)]` matches the kernel-side struct field for
/// field, which is also the wire order. Userspace never transmutes raw bytes
/// into it; the decoder reads each field explicitly and fills this struct.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContextHeader {
    /// Timestamp in nanoseconds (`bpf_ktime_get_ns()`, monotonic since boot)
    pub ts: u64,

    /// Dispatch key, one of the event id constants above
    pub event_id: u32,

    /// Thread id as seen from the host pid namespace
    pub host_tid: u32,

    /// Process id as seen from the host pid namespace
    pub host_pid: u32,

    /// Thread id relative to the task's own pid namespace
    pub tid: u32,

    /// Process id relative to the task's own pid namespace
    pub pid: u32,

    /// Numeric user id
    pub uid: u32,

    /// Process name, NUL padded
    pub comm: [u8; TASK_COMM_LEN],

    /// Number of syscall/probe arguments that follow in the full event
    pub argnum: u32,

    /// Reserved
    #[allow(clippy::pub_underscore_fields)]
    pub _padding: [u8; HEADER_PADDING_LEN],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_len_matches_repr_c() {
        assert_eq!(CONTEXT_HEADER_LEN, 56);
        assert_eq!(core::mem::size_of::<ContextHeader>(), CONTEXT_HEADER_LEN);
    }

    #[test]
    fn test_register_slots() {
        assert_eq!(REG_ARM64_PC, REG_COUNT - 1);
        assert_eq!(REG_MASK_ALL.count_ones() as usize, REG_COUNT);
        assert_eq!(REGS_BUF_LEN, 272);
        assert_eq!(UNWIND_BUF_FIXED_LEN, 288);
    }
}
