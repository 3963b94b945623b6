//! Splitting a dump file into raw samples
//!
//! A dump is the ring-buffer output written back to back:
//!
//! ```text
//! ┌────────────┬──────────────────────┬────────────┬─────────
//! │ SampleSize │ SampleSize bytes     │ SampleSize │ ...
//! │ (u32 LE)   │                      │ (u32 LE)   │
//! └────────────┴──────────────────────┴────────────┴─────────
//! ```
//!
//! Each returned slice starts at its size tag, which is what the decoder
//! expects as `raw_sample`.

use byteorder::{ByteOrder, LittleEndian};
use regscope_common::SAMPLE_SIZE_TAG_LEN;

use crate::domain::DumpError;

/// Split concatenated samples into per-record slices
///
/// # Errors
/// Returns [`DumpError::TruncatedDump`] if the last record (or its size tag)
/// runs past the end of `bytes`
pub fn split_samples(bytes: &[u8]) -> Result<Vec<&[u8]>, DumpError> {
    let mut samples = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let available = bytes.len() - offset;
        if available < SAMPLE_SIZE_TAG_LEN {
            return Err(DumpError::TruncatedDump { offset, needed: SAMPLE_SIZE_TAG_LEN, available });
        }

        let sample_size = LittleEndian::read_u32(&bytes[offset..offset + SAMPLE_SIZE_TAG_LEN]) as usize;
        let needed = SAMPLE_SIZE_TAG_LEN + sample_size;
        if available < needed {
            return Err(DumpError::TruncatedDump { offset, needed, available });
        }

        samples.push(&bytes[offset..offset + needed]);
        offset += needed;
    }

    Ok(samples)
}
