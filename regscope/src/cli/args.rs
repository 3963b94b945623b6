//! CLI argument definitions

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{parse_signal, DecodeConfig, ExtraOptions};
use crate::domain::{ConfigError, Pid};
use crate::unwind::RegisterLayout;

#[derive(Parser, Debug)]
#[command(
    name = "regscope",
    version,
    about = "Decode context samples and rebuild user-space backtraces",
    after_help = "\
EXAMPLES:
    regscope decode samples.bin                           Header summaries
    regscope decode samples.bin --unwind-stack --show-pc  Backtraces from live maps
    regscope decode samples.bin --unwind-stack --manual-stack --archive-maps 1234=maps.txt
    regscope resolve --pid 1234 0x7f12345678              Address to module + offset"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a file of raw ring-buffer samples
    Decode(DecodeArgs),
    /// Resolve addresses of a running process to "module + offset"
    Resolve(ResolveArgs),
}

#[derive(ClapArgs, Debug)]
pub struct DecodeArgs {
    /// Concatenated raw samples, each starting with its SampleSize tag
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Records carry a full unwind buffer (registers + stack copy)
    #[arg(long)]
    pub unwind_stack: bool,

    /// Records carry a register snapshot; print the register map
    #[arg(long)]
    pub show_regs: bool,

    /// Always put the program counter first in backtraces
    #[arg(long)]
    pub show_pc: bool,

    /// Register to resolve and print per event (x0..x29, lr, sp, pc)
    #[arg(long = "reg", value_name = "NAME")]
    pub reg_name: Option<String>,

    /// Signal the probes send to traced processes (e.g. SIGSTOP)
    #[arg(long, value_name = "SIG")]
    pub kill_signal: Option<String>,

    /// Never read live maps; use archived mappings only
    #[arg(long)]
    pub manual_stack: bool,

    /// Root of the proc filesystem used for live maps reads
    #[arg(long, value_name = "DIR", default_value = "/proc")]
    pub proc_root: PathBuf,

    /// Seed the mapping archive for PID from a saved maps file
    #[arg(long = "archive-maps", value_name = "PID=FILE", value_parser = parse_archive_spec)]
    pub archive_maps: Vec<ArchiveSpec>,

    /// Worker threads (0 = one per CPU)
    #[arg(long, default_value = "0")]
    pub threads: usize,

    /// Print one JSON object per event instead of the text summary
    #[arg(long)]
    pub json: bool,

    /// Abort on the first record that fails to decode
    #[arg(long)]
    pub strict: bool,
}

impl DecodeArgs {
    /// Session configuration derived from the flags
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownSignal`] for an unrecognised `--kill-signal`
    pub fn decode_config(&self) -> Result<DecodeConfig, ConfigError> {
        let kill_signal = match &self.kill_signal {
            Some(name) => parse_signal(name)?,
            None => None,
        };
        Ok(DecodeConfig {
            kill_signal,
            show_pc: self.show_pc,
            manual_stack: self.manual_stack,
            reg_name: self.reg_name.clone(),
            layout: RegisterLayout::aarch64(),
            proc_root: self.proc_root.clone(),
        })
    }

    /// Payload selection applied to every record in the file
    #[must_use]
    pub fn extra_options(&self) -> ExtraOptions {
        ExtraOptions { unwind_stack: self.unwind_stack, show_regs: self.show_regs }
    }
}

#[derive(ClapArgs, Debug)]
pub struct ResolveArgs {
    /// Process whose mappings are used
    #[arg(short, long)]
    pub pid: u32,

    /// Addresses, hex with or without 0x prefix
    #[arg(value_name = "ADDR", required = true, value_parser = parse_address)]
    pub addrs: Vec<u64>,

    /// Skip the live maps read (only archived mappings, if seeded)
    #[arg(long)]
    pub manual: bool,

    #[arg(long, value_name = "DIR", default_value = "/proc")]
    pub proc_root: PathBuf,

    /// Seed the mapping archive for PID from a saved maps file
    #[arg(long = "archive-maps", value_name = "PID=FILE", value_parser = parse_archive_spec)]
    pub archive_maps: Vec<ArchiveSpec>,
}

/// `--archive-maps` value: a saved maps file standing in for a pid's archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSpec {
    pub pid: Pid,
    pub path: PathBuf,
}

/// Parse `PID=FILE`
///
/// # Errors
/// Returns [`ConfigError::InvalidArchiveSpec`] when the `=` is missing, the
/// pid is not a number or the path is empty
pub fn parse_archive_spec(value: &str) -> Result<ArchiveSpec, ConfigError> {
    let invalid = || ConfigError::InvalidArchiveSpec(value.to_string());
    let (pid, path) = value.split_once('=').ok_or_else(invalid)?;
    let pid = pid.trim().parse::<u32>().map_err(|_| invalid())?;
    if path.is_empty() {
        return Err(invalid());
    }
    Ok(ArchiveSpec { pid: Pid(pid), path: PathBuf::from(path) })
}

fn parse_address(value: &str) -> Result<u64, String> {
    let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")).unwrap_or(value);
    u64::from_str_radix(digits, 16).map_err(|e| format!("invalid address {value:?}: {e}"))
}
