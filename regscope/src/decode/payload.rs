//! Register and stack-capture payloads
//!
//! The payload extractor reads whatever follows the context header, in
//! exactly one of two modes selected per record by [`ExtraOptions`]:
//!
//! - **registers only**: a [`RegsBuf`] (ABI tag + 33 registers)
//! - **full unwind**: an [`UnwindBuf`] (registers + raw stack capture)
//!
//! A short read in either mode is fatal to the record.

use regscope_common::{REG_ARM64_SP, REG_COUNT};

use super::cursor::{ByteCursor, Section};
use crate::config::ExtraOptions;
use crate::domain::DecodeError;

/// Register snapshot without stack bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegsBuf {
    pub abi: u64,
    pub regs: [u64; REG_COUNT],
}

impl RegsBuf {
    /// Decode `Abi(8) + Regs[33]×8`
    ///
    /// # Errors
    /// Returns [`DecodeError::TruncatedPayload`] on a short read
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self, DecodeError> {
        cursor.set_section(Section::Payload);
        let abi = cursor.read_u64("abi")?;
        let regs = cursor.read_u64_array::<REG_COUNT>("regs")?;
        Ok(Self { abi, regs })
    }
}

/// Register snapshot plus the raw bytes captured from the top of the stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnwindBuf {
    pub abi: u64,
    pub regs: [u64; REG_COUNT],
    /// Declared capture length; always equal to `data.len()`
    pub stack_size: u64,
    /// Bytes copied from `[sp, sp + stack_size)`
    pub data: Vec<u8>,
    /// Consumed, not interpreted
    pub dyn_size: u64,
}

impl UnwindBuf {
    /// Decode `Abi(8) + Regs[33]×8 + StackSize(8) + Data[StackSize] + DynSize(8)`
    ///
    /// # Errors
    /// - [`DecodeError::StackSizeMismatch`] if fewer than `StackSize` bytes remain
    /// - [`DecodeError::TruncatedPayload`] on any other short read
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self, DecodeError> {
        cursor.set_section(Section::Payload);
        let abi = cursor.read_u64("abi")?;
        let regs = cursor.read_u64_array::<REG_COUNT>("regs")?;
        let stack_size = cursor.read_u64("stack_size")?;

        let available = cursor.remaining();
        let len = usize::try_from(stack_size)
            .ok()
            .filter(|&len| len <= available)
            .ok_or(DecodeError::StackSizeMismatch { declared: stack_size, available })?;
        let data = cursor.read_bytes("stack_data", len)?.to_vec();

        let dyn_size = cursor.read_u64("dyn_size")?;
        Ok(Self { abi, regs, stack_size, data, dyn_size })
    }

    /// Stack pointer at capture time, i.e. the address of `data[0]`
    #[must_use]
    pub fn sp(&self) -> u64 {
        self.regs[REG_ARM64_SP]
    }

    /// Read the u64 stored at stack address `addr`, if it was captured
    #[must_use]
    pub fn read_stack_u64(&self, addr: u64) -> Option<u64> {
        let offset = usize::try_from(addr.checked_sub(self.sp())?).ok()?;
        let end = offset.checked_add(8)?;
        let bytes = self.data.get(offset..end)?;
        let mut word = [0u8; 8];
        word.copy_from_slice(bytes);
        Some(u64::from_le_bytes(word))
    }
}

/// Decoded payload of a context record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Registers(RegsBuf),
    Unwind(UnwindBuf),
}

impl Payload {
    /// Register array regardless of mode
    #[must_use]
    pub fn regs(&self) -> &[u64; REG_COUNT] {
        match self {
            Payload::Registers(buf) => &buf.regs,
            Payload::Unwind(buf) => &buf.regs,
        }
    }

    #[must_use]
    pub fn abi(&self) -> u64 {
        match self {
            Payload::Registers(buf) => buf.abi,
            Payload::Unwind(buf) => buf.abi,
        }
    }
}

/// Decode the payload selected by `options`
///
/// Returns `None` without touching the cursor when neither mode is requested.
///
/// # Errors
/// Propagates the fatal-to-record errors of [`RegsBuf::decode`] and
/// [`UnwindBuf::decode`]
pub fn extract_payload(
    cursor: &mut ByteCursor<'_>,
    options: ExtraOptions,
) -> Result<Option<Payload>, DecodeError> {
    if options.unwind_stack {
        UnwindBuf::decode(cursor).map(|buf| Some(Payload::Unwind(buf)))
    } else if options.show_regs {
        RegsBuf::decode(cursor).map(|buf| Some(Payload::Registers(buf)))
    } else {
        Ok(None)
    }
}
