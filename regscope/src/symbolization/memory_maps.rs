//! Memory map snapshot parsing
//!
//! This module parses the `/proc/<pid>/maps` text format into an ordered list
//! of segments and turns addresses into `"<module> + 0x<offset>"` labels.
//! Parsing is best-effort: lines that don't have the expected shape are
//! skipped so the rest of the snapshot stays usable.

use log::debug;
use std::fs;
use std::path::Path;

use crate::domain::{MapsError, Pid};

/// Label returned when an address is not backed by a named mapping
pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";

/// One mapped region of a process address space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSegment {
    pub start: u64,
    /// Exclusive
    pub end: u64,
    pub perms: String,
    /// Offset of `start` within the backing file
    pub offset: u64,
    pub device: String,
    pub inode: u64,
    /// Backing path, empty for anonymous regions
    pub path: String,
}

impl MapSegment {
    /// Check if an address falls within this segment
    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }

    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.perms.as_bytes().get(2) == Some(&b'x')
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.path.is_empty()
    }

    /// Last path component of the backing file
    #[must_use]
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Parse one maps line: `start-end perms offset dev inode [path]`
    ///
    /// Returns `None` for anything that doesn't have that shape.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        let (range, rest) = next_field(line)?;
        let (perms, rest) = next_field(rest)?;
        let (offset, rest) = next_field(rest)?;
        let (device, rest) = next_field(rest)?;
        let (inode, rest) = next_field(rest)?;

        let (start, end) = range.split_once('-')?;
        let start = u64::from_str_radix(start, 16).ok()?;
        let end = u64::from_str_radix(end, 16).ok()?;
        if start >= end || !is_valid_perms(perms) || !is_valid_device(device) {
            return None;
        }

        Some(Self {
            start,
            end,
            perms: perms.to_string(),
            offset: u64::from_str_radix(offset, 16).ok()?,
            device: device.to_string(),
            inode: inode.parse().ok()?,
            path: rest.trim().to_string(),
        })
    }
}

fn next_field(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }
    Some(text.split_once(char::is_whitespace).unwrap_or((text, "")))
}

fn is_valid_perms(perms: &str) -> bool {
    let bytes = perms.as_bytes();
    bytes.len() == 4
        && matches!(bytes[0], b'r' | b'-')
        && matches!(bytes[1], b'w' | b'-')
        && matches!(bytes[2], b'x' | b'-')
        && matches!(bytes[3], b'p' | b's')
}

fn is_valid_device(device: &str) -> bool {
    device.split_once(':').is_some_and(|(major, minor)| {
        u32::from_str_radix(major, 16).is_ok() && u32::from_str_radix(minor, 16).is_ok()
    })
}

/// Ordered, non-overlapping list of segments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapSnapshot {
    segments: Vec<MapSegment>,
}

impl MapSnapshot {
    /// Parse a maps text snapshot, skipping malformed lines
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut segments = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match MapSegment::parse_line(line) {
                Some(segment) => segments.push(segment),
                None => debug!("skipping malformed maps line {}: {line:?}", lineno + 1),
            }
        }
        Self::from_segments(segments)
    }

    /// Build a snapshot, ordering by start and dropping segments that overlap
    /// an earlier one
    #[must_use]
    pub fn from_segments(mut segments: Vec<MapSegment>) -> Self {
        segments.sort_by_key(|segment| segment.start);
        let mut kept: Vec<MapSegment> = Vec::with_capacity(segments.len());
        for segment in segments {
            if kept.last().is_some_and(|prev| segment.start < prev.end) {
                debug!("dropping overlapping segment 0x{:x}-0x{:x}", segment.start, segment.end);
                continue;
            }
            kept.push(segment);
        }
        Self { segments: kept }
    }

    #[must_use]
    pub fn segments(&self) -> &[MapSegment] {
        &self.segments
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment containing `addr`
    #[must_use]
    pub fn find(&self, addr: u64) -> Option<&MapSegment> {
        let idx = self.segments.partition_point(|segment| segment.end <= addr);
        self.segments.get(idx).filter(|segment| segment.contains(addr))
    }

    /// Returns true if `addr` lands in an executable segment
    #[must_use]
    pub fn is_executable(&self, addr: u64) -> bool {
        self.find(addr).is_some_and(MapSegment::is_executable)
    }

    /// `"<basename> + 0x<file offset>"`, or `UNKNOWN`
    #[must_use]
    pub fn resolve(&self, addr: u64) -> String {
        match self.find(addr) {
            Some(segment) if !segment.is_anonymous() => {
                // pgoff comes straight from the maps text and may sit near u64::MAX
                let offset = segment.offset.wrapping_add(addr - segment.start);
                format!("{} + 0x{offset:x}", segment.basename())
            }
            _ => UNKNOWN_SYMBOL.to_string(),
        }
    }
}

/// Read and parse `<proc_root>/<pid>/maps`
///
/// # Errors
/// Returns [`MapsError::Read`] if the file cannot be read (process exited,
/// permission denied)
pub fn read_live_maps(proc_root: &Path, pid: Pid) -> Result<MapSnapshot, MapsError> {
    let path = proc_root.join(pid.0.to_string()).join("maps");
    let content = fs::read_to_string(&path).map_err(|source| MapsError::Read { path, source })?;
    Ok(MapSnapshot::parse(&content))
}
