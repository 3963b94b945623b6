//! Address to "module + offset" resolution with ordered map sources

use log::debug;
use std::fmt;
use std::path::PathBuf;

use super::archive::MapsArchive;
use super::memory_maps::{read_live_maps, MapSnapshot, UNKNOWN_SYMBOL};
use crate::config::DecodeConfig;
use crate::domain::Pid;

/// Where a snapshot may come from, tried in list order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapsStrategy {
    /// Read `<proc_root>/<pid>/maps` now
    Live,
    /// Replay the pid's own archived notices
    Archive,
    /// Replay the parent's notices when the pid has none of its own
    ///
    /// Needed for a freshly forked child that has not produced any mapping
    /// record yet when the traced event fires.
    ParentArchive,
}

/// Source that produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapsOrigin {
    Live,
    Archive,
    ParentArchive { parent: Pid },
}

impl fmt::Display for MapsOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapsOrigin::Live => write!(f, "live"),
            MapsOrigin::Archive => write!(f, "archive"),
            MapsOrigin::ParentArchive { parent } => write!(f, "archive of parent {parent}"),
        }
    }
}

/// Resolves addresses against a freshly built map snapshot per request
///
/// Nothing is cached: mappings may change between two events of the same
/// process. Live reads happen without holding any archive lock.
pub struct MapsResolver<'a> {
    proc_root: PathBuf,
    archive: &'a dyn MapsArchive,
    strategies: Vec<MapsStrategy>,
}

impl<'a> MapsResolver<'a> {
    /// Resolver using live → archive → parent archive
    pub fn new(proc_root: impl Into<PathBuf>, archive: &'a dyn MapsArchive) -> Self {
        Self {
            proc_root: proc_root.into(),
            archive,
            strategies: vec![MapsStrategy::Live, MapsStrategy::Archive, MapsStrategy::ParentArchive],
        }
    }

    /// Resolver honoring the session's proc root and manual mode
    #[must_use]
    pub fn from_config(config: &DecodeConfig, archive: &'a dyn MapsArchive) -> Self {
        Self::new(config.proc_root.clone(), archive).manual(config.manual_stack)
    }

    /// Skip the live read when `manual` is set
    #[must_use]
    pub fn manual(mut self, manual: bool) -> Self {
        if manual {
            self.strategies.retain(|strategy| *strategy != MapsStrategy::Live);
        }
        self
    }

    #[must_use]
    pub fn strategies(&self) -> &[MapsStrategy] {
        &self.strategies
    }

    /// Build a snapshot for `pid` from the first strategy that yields one
    #[must_use]
    pub fn snapshot(&self, pid: Pid) -> Option<(MapSnapshot, MapsOrigin)> {
        for strategy in &self.strategies {
            let found = match strategy {
                MapsStrategy::Live => match read_live_maps(&self.proc_root, pid) {
                    Ok(snapshot) => Some((snapshot, MapsOrigin::Live)),
                    Err(e) => {
                        debug!("{pid}: {e}, falling back");
                        None
                    }
                },
                MapsStrategy::Archive => {
                    self.archive.snapshot(pid).map(|snapshot| (snapshot, MapsOrigin::Archive))
                }
                MapsStrategy::ParentArchive => self.parent_snapshot(pid),
            };
            if let Some((snapshot, origin)) = found {
                debug!("{pid}: {} segments from {origin}", snapshot.segments().len());
                return Some((snapshot, origin));
            }
        }
        debug!("{pid}: no map snapshot available");
        None
    }

    fn parent_snapshot(&self, pid: Pid) -> Option<(MapSnapshot, MapsOrigin)> {
        if !self.archive.notices(pid).is_empty() {
            return None;
        }
        let parent = self.archive.parent_of(pid)?;
        self.archive
            .snapshot(parent)
            .map(|snapshot| (snapshot, MapsOrigin::ParentArchive { parent }))
    }

    /// `"<module> + 0x<offset>"` for `addr` in `pid`, or `UNKNOWN`
    #[must_use]
    pub fn resolve(&self, pid: Pid, addr: u64) -> String {
        self.snapshot(pid)
            .map_or_else(|| UNKNOWN_SYMBOL.to_string(), |(snapshot, _)| snapshot.resolve(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolization::{MapNotice, MmapArchive};
    use std::fs;

    fn write_maps(root: &std::path::Path, pid: u32, content: &str) {
        let dir = root.join(pid.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("maps"), content).unwrap();
    }

    fn notice(pid: u32, start: u64, path: &str) -> MapNotice {
        MapNotice {
            pid: Pid(pid),
            start,
            len: 0x1000,
            pgoff: 0,
            perms: "r-xp".to_string(),
            device: "00:00".to_string(),
            inode: 0,
            path: path.to_string(),
        }
    }

    #[test]
    fn test_live_read_wins() {
        let root = tempfile::tempdir().unwrap();
        write_maps(root.path(), 10, "1000-2000 r-xp 0 00:00 0 /lib/libc.so\n");
        let archive = MmapArchive::new();
        archive.record(&notice(10, 0x1000, "/archived.so"));

        let resolver = MapsResolver::new(root.path(), &archive);
        let (_, origin) = resolver.snapshot(Pid(10)).unwrap();
        assert_eq!(origin, MapsOrigin::Live);
        assert_eq!(resolver.resolve(Pid(10), 0x1500), "libc.so + 0x500");
    }

    #[test]
    fn test_falls_back_to_archive() {
        let root = tempfile::tempdir().unwrap();
        let archive = MmapArchive::new();
        archive.record(&notice(10, 0x1000, "/archived.so"));

        let resolver = MapsResolver::new(root.path(), &archive);
        assert_eq!(resolver.snapshot(Pid(10)).unwrap().1, MapsOrigin::Archive);
        assert_eq!(resolver.resolve(Pid(10), 0x1004), "archived.so + 0x4");
    }

    #[test]
    fn test_manual_mode_skips_live() {
        let root = tempfile::tempdir().unwrap();
        write_maps(root.path(), 10, "1000-2000 r-xp 0 00:00 0 /lib/libc.so\n");
        let archive = MmapArchive::new();
        archive.record(&notice(10, 0x1000, "/archived.so"));

        let resolver = MapsResolver::new(root.path(), &archive).manual(true);
        assert_eq!(resolver.strategies(), &[MapsStrategy::Archive, MapsStrategy::ParentArchive]);
        assert_eq!(resolver.resolve(Pid(10), 0x1500), "archived.so + 0x500");
    }

    #[test]
    fn test_forked_child_uses_parent_archive() {
        let root = tempfile::tempdir().unwrap();
        let archive = MmapArchive::new();
        archive.record(&notice(100, 0x1000, "/parent.so"));
        archive.record_fork(Pid(100), Pid(101));

        let resolver = MapsResolver::new(root.path(), &archive);
        let (_, origin) = resolver.snapshot(Pid(101)).unwrap();
        assert_eq!(origin, MapsOrigin::ParentArchive { parent: Pid(100) });
        assert_eq!(resolver.resolve(Pid(101), 0x1010), "parent.so + 0x10");
    }

    #[test]
    fn test_child_with_own_notices_ignores_parent() {
        let root = tempfile::tempdir().unwrap();
        let archive = MmapArchive::new();
        archive.record(&notice(100, 0x1000, "/parent.so"));
        archive.record(&notice(101, 0x5000, "/child.so"));
        archive.record_fork(Pid(100), Pid(101));

        let resolver = MapsResolver::new(root.path(), &archive);
        assert_eq!(resolver.resolve(Pid(101), 0x1010), UNKNOWN_SYMBOL);
        assert_eq!(resolver.resolve(Pid(101), 0x5010), "child.so + 0x10");
    }

    #[test]
    fn test_nothing_available_is_unknown() {
        let root = tempfile::tempdir().unwrap();
        let archive = MmapArchive::new();
        let resolver = MapsResolver::new(root.path(), &archive);

        assert!(resolver.snapshot(Pid(5)).is_none());
        assert_eq!(resolver.resolve(Pid(5), 0x1234), UNKNOWN_SYMBOL);
    }
}
