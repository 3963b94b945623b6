//! Backtrace reconstruction from captured registers and stack bytes
//!
//! Works purely on what the kernel copied out: no remote memory reads. Frames
//! come from three places, innermost first:
//!
//! 1. the program counter, when `show_pc` is set
//! 2. selected registers whose value points into executable code
//! 3. arm64 frame records `(prev_fp, saved_lr)` found by following the frame
//!    pointer through the captured stack window

use log::debug;
use std::fmt;

use super::registers::RegisterLayout;
use crate::decode::UnwindBuf;
use crate::symbolization::MapSnapshot;

/// Maximum number of frames in one backtrace
pub const MAX_FRAMES: usize = 64;

/// Which registers may hold return addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnwindOption {
    /// Bit `n` selects register slot `n`
    pub reg_mask: u64,
    /// Emit the program counter as the top frame regardless of the mask
    pub show_pc: bool,
}

/// Where a frame's address was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSource {
    Register(String),
    /// Saved return address at `sp + offset`
    Stack { offset: u64 },
}

impl fmt::Display for FrameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameSource::Register(name) => write!(f, "{name}"),
            FrameSource::Stack { offset } => write!(f, "sp+0x{offset:x}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub source: FrameSource,
    pub addr: u64,
    /// `"<module> + 0x<offset>"` or `UNKNOWN`
    pub symbol: String,
}

/// Ordered frames, innermost first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Backtrace {
    frames: Vec<Frame>,
}

impl Backtrace {
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn push(&mut self, source: FrameSource, addr: u64, snapshot: &MapSnapshot) -> bool {
        if self.frames.len() >= MAX_FRAMES {
            return false;
        }
        if self.frames.last().is_some_and(|last| last.addr == addr) {
            return true;
        }
        self.frames.push(Frame { source, addr, symbol: snapshot.resolve(addr) });
        true
    }
}

impl fmt::Display for Backtrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, frame) in self.frames.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "  #{idx:02} {:<8} 0x{:016x}  {}", frame.source, frame.addr, frame.symbol)?;
        }
        Ok(())
    }
}

/// Walks one captured unwind buffer against one map snapshot
pub struct StackUnwinder<'a> {
    layout: &'a RegisterLayout,
    snapshot: &'a MapSnapshot,
}

impl<'a> StackUnwinder<'a> {
    #[must_use]
    pub fn new(layout: &'a RegisterLayout, snapshot: &'a MapSnapshot) -> Self {
        Self { layout, snapshot }
    }

    /// Returns true if `addr` looks like a return address
    fn is_code(&self, addr: u64) -> bool {
        addr != 0 && self.snapshot.is_executable(addr)
    }

    fn register_source(&self, slot: usize) -> FrameSource {
        let name = self.layout.name_of(slot).map_or_else(|| format!("r{slot}"), str::to_string);
        FrameSource::Register(name)
    }

    #[must_use]
    pub fn unwind(&self, buf: &UnwindBuf, option: UnwindOption) -> Backtrace {
        let mut backtrace = Backtrace::default();
        let regs = &buf.regs;

        if option.show_pc {
            let pc = self.layout.pc();
            backtrace.push(self.register_source(pc), regs[pc], self.snapshot);
        }

        for slot in self.layout.candidate_slots(option.reg_mask, option.show_pc) {
            let value = regs[slot];
            if self.is_code(value) && !backtrace.push(self.register_source(slot), value, self.snapshot) {
                return backtrace;
            }
        }

        let fp_slot = self.layout.fp();
        if option.reg_mask & (1u64 << fp_slot) != 0 {
            self.walk_frame_records(buf, regs[fp_slot], &mut backtrace);
        }

        backtrace
    }

    /// Follow the frame-pointer chain while it stays inside the capture
    fn walk_frame_records(&self, buf: &UnwindBuf, mut fp: u64, backtrace: &mut Backtrace) {
        let sp = buf.sp();
        for _ in 0..MAX_FRAMES {
            let (Some(prev_fp), Some(saved_lr)) =
                (buf.read_stack_u64(fp), fp.checked_add(8).and_then(|slot| buf.read_stack_u64(slot)))
            else {
                debug!("frame record at 0x{fp:x} outside captured stack");
                return;
            };

            if self.is_code(saved_lr) {
                let offset = fp + 8 - sp;
                if !backtrace.push(FrameSource::Stack { offset }, saved_lr, self.snapshot) {
                    return;
                }
            }

            // The chain must move towards older frames
            if prev_fp <= fp {
                return;
            }
            fp = prev_fp;
        }
    }
}
