//! Shared helpers for building raw ring-buffer samples
#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};
use regscope_common::{CONTEXT_HEADER_LEN, REG_ARM64_LR, REG_ARM64_PC, REG_ARM64_SP, REG_COUNT};

/// Builds one sample: size tag, header, optional payload, trailing pad
pub struct SampleBuilder {
    pub ts: u64,
    pub event_id: u32,
    pub host_tid: u32,
    pub host_pid: u32,
    pub tid: u32,
    pub pid: u32,
    pub uid: u32,
    pub comm: [u8; 16],
    pub argnum: u32,
    payload: Vec<u8>,
    pad: usize,
    /// Overrides the computed SampleSize
    sample_size: Option<u32>,
}

impl SampleBuilder {
    pub fn new(event_id: u32, pid: u32, tid: u32) -> Self {
        let mut comm = [0u8; 16];
        comm[..4].copy_from_slice(b"test");
        Self {
            ts: 1_000_000,
            event_id,
            host_tid: tid + 1000,
            host_pid: pid + 1000,
            tid,
            pid,
            uid: 10_001,
            comm,
            argnum: 2,
            payload: Vec::new(),
            pad: 0,
            sample_size: None,
        }
    }

    pub fn comm(mut self, comm: &[u8]) -> Self {
        self.comm = [0u8; 16];
        self.comm[..comm.len()].copy_from_slice(comm);
        self
    }

    /// Append a register snapshot payload
    pub fn regs(mut self, abi: u64, regs: &[u64; REG_COUNT]) -> Self {
        self.payload.write_u64::<LittleEndian>(abi).unwrap();
        for reg in regs {
            self.payload.write_u64::<LittleEndian>(*reg).unwrap();
        }
        self
    }

    /// Append an unwind payload declaring `declared` stack bytes
    pub fn unwind(mut self, regs: &[u64; REG_COUNT], stack: &[u8], declared: u64, dyn_size: u64) -> Self {
        self = self.regs(2, regs);
        self.payload.write_u64::<LittleEndian>(declared).unwrap();
        self.payload.extend_from_slice(stack);
        self.payload.write_u64::<LittleEndian>(dyn_size).unwrap();
        self
    }

    pub fn pad(mut self, pad: usize) -> Self {
        self.pad = pad;
        self
    }

    pub fn sample_size(mut self, sample_size: u32) -> Self {
        self.sample_size = Some(sample_size);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let computed = CONTEXT_HEADER_LEN + self.payload.len() + self.pad;
        let sample_size = self.sample_size.unwrap_or_else(|| u32::try_from(computed).unwrap());

        let mut out = Vec::with_capacity(4 + computed);
        out.write_u32::<LittleEndian>(sample_size).unwrap();
        out.write_u64::<LittleEndian>(self.ts).unwrap();
        out.write_u32::<LittleEndian>(self.event_id).unwrap();
        for field in [self.host_tid, self.host_pid, self.tid, self.pid, self.uid] {
            out.write_u32::<LittleEndian>(field).unwrap();
        }
        out.extend_from_slice(&self.comm);
        out.write_u32::<LittleEndian>(self.argnum).unwrap();
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&self.payload);
        out.extend(std::iter::repeat(0xaa).take(self.pad));
        out
    }
}

/// Registers with pc, lr and sp set, everything else zero
pub fn regs_with(pc: u64, lr: u64, sp: u64) -> [u64; REG_COUNT] {
    let mut regs = [0u64; REG_COUNT];
    regs[REG_ARM64_PC] = pc;
    regs[REG_ARM64_LR] = lr;
    regs[REG_ARM64_SP] = sp;
    regs
}

/// Little-endian bytes of consecutive stack words
pub fn stack_words(words: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 8);
    for word in words {
        out.write_u64::<LittleEndian>(*word).unwrap();
    }
    out
}

/// Write `<root>/<pid>/maps`
pub fn write_maps(root: &std::path::Path, pid: u32, content: &str) {
    let dir = root.join(pid.to_string());
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("maps"), content).unwrap();
}
