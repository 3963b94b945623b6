//! Decode configuration
//!
//! Everything the decoder used to read from process-wide settings is carried
//! here and passed into each decode call.

use std::path::PathBuf;

use crate::domain::ConfigError;
use crate::unwind::RegisterLayout;

/// Session-wide decode settings
#[derive(Debug, Clone)]
pub struct DecodeConfig {
    /// Signal the kernel program sends to traced processes, if any
    ///
    /// When this is `SIGSTOP`, every decoded pid is recorded as stopped.
    pub kill_signal: Option<i32>,
    /// Always emit the program counter as the first backtrace frame
    pub show_pc: bool,
    /// Skip the live `/proc/<pid>/maps` read and go straight to the archive
    pub manual_stack: bool,
    /// Single register of interest, e.g. `x0` or `lr`
    pub reg_name: Option<String>,
    /// Slot to register-name table for the captured snapshots
    pub layout: RegisterLayout,
    /// Root of the proc filesystem used for live map reads
    pub proc_root: PathBuf,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            kill_signal: None,
            show_pc: false,
            manual_stack: false,
            reg_name: None,
            layout: RegisterLayout::aarch64(),
            proc_root: PathBuf::from("/proc"),
        }
    }
}

impl DecodeConfig {
    /// Returns true if decoded pids must be recorded as stopped
    #[must_use]
    pub fn stops_on_signal(&self) -> bool {
        self.kill_signal == Some(libc::SIGSTOP)
    }
}

/// Per-record payload selection
///
/// Resolved by the caller from the probe that produced the record.
/// `unwind_stack` wins over `show_regs` when both are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtraOptions {
    pub unwind_stack: bool,
    pub show_regs: bool,
}

const SIGNALS: &[(&str, i32)] = &[
    ("SIGABRT", libc::SIGABRT),
    ("SIGALRM", libc::SIGALRM),
    ("SIGBUS", libc::SIGBUS),
    ("SIGCHLD", libc::SIGCHLD),
    ("SIGCLD", libc::SIGCHLD),
    ("SIGCONT", libc::SIGCONT),
    ("SIGFPE", libc::SIGFPE),
    ("SIGHUP", libc::SIGHUP),
    ("SIGILL", libc::SIGILL),
    ("SIGINT", libc::SIGINT),
    ("SIGIO", libc::SIGIO),
    ("SIGIOT", libc::SIGIOT),
    ("SIGKILL", libc::SIGKILL),
    ("SIGPIPE", libc::SIGPIPE),
    ("SIGPOLL", libc::SIGPOLL),
    ("SIGPROF", libc::SIGPROF),
    ("SIGPWR", libc::SIGPWR),
    ("SIGQUIT", libc::SIGQUIT),
    ("SIGSEGV", libc::SIGSEGV),
    ("SIGSTKFLT", libc::SIGSTKFLT),
    ("SIGSTOP", libc::SIGSTOP),
    ("SIGSYS", libc::SIGSYS),
    ("SIGTERM", libc::SIGTERM),
    ("SIGTRAP", libc::SIGTRAP),
    ("SIGTSTP", libc::SIGTSTP),
    ("SIGTTIN", libc::SIGTTIN),
    ("SIGTTOU", libc::SIGTTOU),
    ("SIGUNUSED", libc::SIGSYS),
    ("SIGURG", libc::SIGURG),
    ("SIGUSR1", libc::SIGUSR1),
    ("SIGUSR2", libc::SIGUSR2),
    ("SIGVTALRM", libc::SIGVTALRM),
    ("SIGWINCH", libc::SIGWINCH),
    ("SIGXCPU", libc::SIGXCPU),
    ("SIGXFSZ", libc::SIGXFSZ),
];

/// Parse a signal name such as `SIGSTOP` into its number
///
/// An empty name means "no signal".
///
/// # Errors
/// Returns [`ConfigError::UnknownSignal`] for names outside the Linux table
pub fn parse_signal(name: &str) -> Result<Option<i32>, ConfigError> {
    if name.is_empty() {
        return Ok(None);
    }
    SIGNALS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|&(_, num)| Some(num))
        .ok_or_else(|| ConfigError::UnknownSignal(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signal() {
        assert_eq!(parse_signal("SIGSTOP").unwrap(), Some(libc::SIGSTOP));
        assert_eq!(parse_signal("SIGKILL").unwrap(), Some(libc::SIGKILL));
        assert_eq!(parse_signal("").unwrap(), None);
        assert!(matches!(parse_signal("SIGNOPE"), Err(ConfigError::UnknownSignal(_))));
    }

    #[test]
    fn test_stops_on_signal() {
        let mut config = DecodeConfig::default();
        assert!(!config.stops_on_signal());
        config.kill_signal = Some(libc::SIGKILL);
        assert!(!config.stops_on_signal());
        config.kill_signal = Some(libc::SIGSTOP);
        assert!(config.stops_on_signal());
    }
}
