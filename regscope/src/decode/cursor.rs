//! Bounds-checked little-endian reader over one raw sample

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::domain::DecodeError;

/// Part of the record being read, selects the truncation error variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Header,
    Payload,
}

/// Cursor that reports which field ran past the end of the record
///
/// Every read checks the remaining length first, so a failed read never
/// moves the position.
pub struct ByteCursor<'a> {
    inner: Cursor<&'a [u8]>,
    section: Section,
}

impl<'a> ByteCursor<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { inner: Cursor::new(buf), section: Section::Header }
    }

    pub fn set_section(&mut self, section: Section) {
        self.section = section;
    }

    /// Bytes consumed so far
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn position(&self) -> usize {
        // Never exceeds the slice length
        self.inner.position() as usize
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.inner.get_ref().len().saturating_sub(self.position())
    }

    /// Unread bytes, without consuming them
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        let buf: &'a [u8] = *self.inner.get_ref();
        &buf[self.position().min(buf.len())..]
    }

    fn truncated(&self, field: &'static str, needed: usize) -> DecodeError {
        let offset = self.position();
        let available = self.remaining();
        match self.section {
            Section::Header => DecodeError::TruncatedHeader { field, offset, needed, available },
            Section::Payload => DecodeError::TruncatedPayload { field, offset, needed, available },
        }
    }

    fn ensure(&self, field: &'static str, needed: usize) -> Result<(), DecodeError> {
        if self.remaining() < needed {
            return Err(self.truncated(field, needed));
        }
        Ok(())
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        self.ensure(field, 4)?;
        self.inner.read_u32::<LittleEndian>().map_err(|_| self.truncated(field, 4))
    }

    pub fn read_u64(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        self.ensure(field, 8)?;
        self.inner.read_u64::<LittleEndian>().map_err(|_| self.truncated(field, 8))
    }

    /// Read `N` little-endian u64 words
    pub fn read_u64_array<const N: usize>(
        &mut self,
        field: &'static str,
    ) -> Result<[u64; N], DecodeError> {
        self.ensure(field, N * 8)?;
        let mut words = [0u64; N];
        self.inner.read_u64_into::<LittleEndian>(&mut words).map_err(|_| self.truncated(field, N * 8))?;
        Ok(words)
    }

    /// Read a fixed-width byte array
    pub fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let bytes = self.read_bytes(field, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Borrow the next `len` bytes and step over them
    pub fn read_bytes(&mut self, field: &'static str, len: usize) -> Result<&'a [u8], DecodeError> {
        self.ensure(field, len)?;
        let start = self.position();
        let buf: &'a [u8] = *self.inner.get_ref();
        let bytes = &buf[start..start + len];
        self.inner.set_position((start + len) as u64);
        Ok(bytes)
    }
}
