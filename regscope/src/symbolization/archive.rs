//! Archived mapping-change notices
//!
//! When a live maps read is impossible (the process already exited, or the
//! session forces manual mode) the resolver rebuilds a snapshot from the
//! mapping records the kernel delivered earlier. The archive keeps those
//! notices per pid, plus the fork relationships needed to fall back to a
//! parent's layout for a child that has not mapped anything yet.

use parking_lot::RwLock;
use std::collections::HashMap;

use super::memory_maps::{MapSegment, MapSnapshot};
use crate::domain::Pid;

/// One mapping record as delivered by the kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapNotice {
    pub pid: Pid,
    pub start: u64,
    pub len: u64,
    /// File offset of `start`
    pub pgoff: u64,
    pub perms: String,
    pub device: String,
    pub inode: u64,
    pub path: String,
}

impl MapNotice {
    #[must_use]
    pub fn to_segment(&self) -> MapSegment {
        MapSegment {
            start: self.start,
            end: self.start.saturating_add(self.len),
            perms: self.perms.clone(),
            offset: self.pgoff,
            device: self.device.clone(),
            inode: self.inode,
            path: self.path.clone(),
        }
    }
}

/// Source of archived mapping notices, shared by concurrent decoders
pub trait MapsArchive: Send + Sync {
    /// Notices recorded for `pid`, oldest first
    fn notices(&self, pid: Pid) -> Vec<MapSegment>;

    /// Parent recorded by a fork notice
    fn parent_of(&self, pid: Pid) -> Option<Pid>;

    /// Replay the notices of `pid`; `None` when nothing was archived
    fn snapshot(&self, pid: Pid) -> Option<MapSnapshot> {
        let notices = self.notices(pid);
        if notices.is_empty() {
            None
        } else {
            Some(replay(&notices))
        }
    }
}

/// Rebuild a snapshot from notices in arrival order
///
/// A later notice replaces whatever it overlaps; segments it only partly
/// covers are split and keep their uncovered parts.
#[must_use]
pub fn replay(notices: &[MapSegment]) -> MapSnapshot {
    let mut segments: Vec<MapSegment> = Vec::new();

    for notice in notices {
        if notice.start >= notice.end {
            continue;
        }
        let mut next = Vec::with_capacity(segments.len() + 2);
        for segment in segments.drain(..) {
            if segment.end <= notice.start || segment.start >= notice.end {
                next.push(segment);
                continue;
            }
            if segment.start < notice.start {
                next.push(MapSegment { end: notice.start, ..segment.clone() });
            }
            if segment.end > notice.end {
                let skipped = notice.end - segment.start;
                next.push(MapSegment {
                    start: notice.end,
                    offset: segment.offset.wrapping_add(skipped),
                    ..segment
                });
            }
        }
        next.push(notice.clone());
        segments = next;
    }

    MapSnapshot::from_segments(segments)
}

/// In-memory archive fed by the mapping-record handler
#[derive(Debug, Default)]
pub struct MmapArchive {
    notices: RwLock<HashMap<u32, Vec<MapSegment>>>,
    parents: RwLock<HashMap<u32, u32>>,
}

impl MmapArchive {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, notice: &MapNotice) {
        self.notices.write().entry(notice.pid.0).or_default().push(notice.to_segment());
    }

    pub fn record_fork(&self, parent: Pid, child: Pid) {
        self.parents.write().insert(child.0, parent.0);
    }

    /// Seed the archive of `pid` from a saved maps snapshot
    pub fn seed_from_snapshot(&self, pid: Pid, snapshot: &MapSnapshot) {
        self.notices.write().entry(pid.0).or_default().extend(snapshot.segments().iter().cloned());
    }

    pub fn forget(&self, pid: Pid) {
        self.notices.write().remove(&pid.0);
        self.parents.write().remove(&pid.0);
    }
}

impl MapsArchive for MmapArchive {
    fn notices(&self, pid: Pid) -> Vec<MapSegment> {
        self.notices.read().get(&pid.0).cloned().unwrap_or_default()
    }

    fn parent_of(&self, pid: Pid) -> Option<Pid> {
        self.parents.read().get(&pid.0).copied().map(Pid)
    }
}
