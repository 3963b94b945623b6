//! Traced process bookkeeping
//!
//! Tracks which pids have shown up in decoded headers and which of them are
//! held by a stop-class signal. Nothing here delivers signals; the code that
//! resumes processes consults [`PidRegistry::stopped_pids`] and clears entries
//! with [`PidRegistry::resume`] once every consumer has seen the stop.

use parking_lot::Mutex;
use std::collections::HashSet;

use crate::domain::Pid;

/// Receives pid notifications from the context decoder
///
/// Both calls are fire-and-forget and must not block on I/O.
pub trait PidObserver: Send + Sync {
    /// A header carrying `pid` was decoded
    fn pid_seen(&self, pid: Pid);

    /// A header carrying `pid` was decoded while the session stops traced
    /// processes with `SIGSTOP`
    fn pid_stopped(&self, pid: Pid);
}

/// Observer that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PidObserver for NoopObserver {
    fn pid_seen(&self, _pid: Pid) {}
    fn pid_stopped(&self, _pid: Pid) {}
}

/// Concurrent set of known pids plus the subset currently stopped
#[derive(Debug, Default)]
pub struct PidRegistry {
    seen: Mutex<HashSet<u32>>,
    stopped: Mutex<HashSet<u32>>,
}

impl PidRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `pid` was observed
    pub fn mark_seen(&self, pid: Pid) {
        self.seen.lock().insert(pid.0);
    }

    /// Record that `pid` is stopped. Idempotent.
    pub fn mark_stopped(&self, pid: Pid) {
        self.seen.lock().insert(pid.0);
        self.stopped.lock().insert(pid.0);
    }

    #[must_use]
    pub fn is_seen(&self, pid: Pid) -> bool {
        self.seen.lock().contains(&pid.0)
    }

    #[must_use]
    pub fn is_stopped(&self, pid: Pid) -> bool {
        self.stopped.lock().contains(&pid.0)
    }

    /// Stopped pids in ascending order
    #[must_use]
    pub fn stopped_pids(&self) -> Vec<Pid> {
        let mut pids: Vec<Pid> = self.stopped.lock().iter().copied().map(Pid).collect();
        pids.sort_unstable();
        pids
    }

    /// Clear the stopped flag after the process was resumed
    ///
    /// Returns false if `pid` was not stopped.
    pub fn resume(&self, pid: Pid) -> bool {
        self.stopped.lock().remove(&pid.0)
    }

    /// Drop every record of `pid`
    pub fn forget(&self, pid: Pid) {
        self.stopped.lock().remove(&pid.0);
        self.seen.lock().remove(&pid.0);
    }
}

impl PidObserver for PidRegistry {
    fn pid_seen(&self, pid: Pid) {
        self.mark_seen(pid);
    }

    fn pid_stopped(&self, pid: Pid) {
        self.mark_stopped(pid);
    }
}
