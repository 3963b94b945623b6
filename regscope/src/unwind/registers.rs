//! Register slot naming
//!
//! Captured snapshots are a flat array of 33 words. The layout table gives
//! each slot its symbolic name and says which slots play the link register,
//! stack pointer, program counter and frame pointer roles.

use regscope_common::{REG_ARM64_LR, REG_ARM64_PC, REG_ARM64_SP, REG_ARM64_X29, REG_COUNT};
use std::collections::BTreeMap;

/// Slot → name table for one register-snapshot layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterLayout {
    names: Vec<String>,
    lr: usize,
    sp: usize,
    pc: usize,
    fp: usize,
}

impl RegisterLayout {
    /// arm64: `x0..x29`, then `lr`, `sp`, `pc`
    #[must_use]
    pub fn aarch64() -> Self {
        let mut names: Vec<String> = (0..=REG_ARM64_X29).map(|n| format!("x{n}")).collect();
        names.extend(["lr", "sp", "pc"].map(String::from));
        debug_assert_eq!(names.len(), REG_COUNT);
        Self { names, lr: REG_ARM64_LR, sp: REG_ARM64_SP, pc: REG_ARM64_PC, fp: REG_ARM64_X29 }
    }

    #[must_use]
    pub fn lr(&self) -> usize {
        self.lr
    }

    #[must_use]
    pub fn sp(&self) -> usize {
        self.sp
    }

    #[must_use]
    pub fn pc(&self) -> usize {
        self.pc
    }

    #[must_use]
    pub fn fp(&self) -> usize {
        self.fp
    }

    /// Slot for a register name; `None` for names not in the table
    #[must_use]
    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|known| known == name)
    }

    #[must_use]
    pub fn name_of(&self, slot: usize) -> Option<&str> {
        self.names.get(slot).map(String::as_str)
    }

    /// Value of a named register in `regs`
    #[must_use]
    pub fn value_of(&self, name: &str, regs: &[u64; REG_COUNT]) -> Option<u64> {
        self.slot_of(name).and_then(|slot| regs.get(slot).copied())
    }

    /// Registers to scan for return addresses, in backtrace order
    ///
    /// The link register comes first, then the remaining selected slots in
    /// ascending order. The program counter is left out when it is already
    /// emitted as the top frame.
    #[must_use]
    pub fn candidate_slots(&self, reg_mask: u64, skip_pc: bool) -> Vec<usize> {
        let selected = |slot: usize| slot < 64 && reg_mask & (1u64 << slot) != 0;
        let mut slots = Vec::new();
        if selected(self.lr) {
            slots.push(self.lr);
        }
        for slot in 0..self.names.len() {
            if slot == self.lr || (skip_pc && slot == self.pc) {
                continue;
            }
            if selected(slot) {
                slots.push(slot);
            }
        }
        slots
    }

    /// Name → `0x<hex>` for every slot
    #[must_use]
    pub fn register_map(&self, regs: &[u64; REG_COUNT]) -> BTreeMap<String, String> {
        self.names
            .iter()
            .zip(regs.iter())
            .map(|(name, value)| (name.clone(), format!("0x{value:x}")))
            .collect()
    }
}

impl Default for RegisterLayout {
    fn default() -> Self {
        Self::aarch64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regscope_common::REG_MASK_ALL;

    #[test]
    fn test_named_register_lookup() {
        let layout = RegisterLayout::aarch64();

        assert_eq!(layout.slot_of("x0"), Some(0));
        assert_eq!(layout.slot_of("x29"), Some(29));
        assert_eq!(layout.slot_of("lr"), Some(30));
        assert_eq!(layout.slot_of("sp"), Some(31));
        assert_eq!(layout.slot_of("pc"), Some(32));
        assert_eq!(layout.slot_of("x30"), None);
        assert_eq!(layout.slot_of("x"), None);
        assert_eq!(layout.slot_of("rip"), None);
        assert_eq!(layout.slot_of(""), None);
    }

    #[test]
    fn test_value_of() {
        let layout = RegisterLayout::aarch64();
        let mut regs = [0u64; REG_COUNT];
        regs[5] = 0x55;
        regs[REG_ARM64_LR] = 0x1234;

        assert_eq!(layout.value_of("x5", &regs), Some(0x55));
        assert_eq!(layout.value_of("lr", &regs), Some(0x1234));
        assert_eq!(layout.value_of("x31", &regs), None);
    }

    #[test]
    fn test_candidate_slots_order() {
        let layout = RegisterLayout::aarch64();

        assert_eq!(layout.candidate_slots(1 << 30, false), vec![30]);
        assert_eq!(layout.candidate_slots((1 << 3) | (1 << 30) | (1 << 1), false), vec![30, 1, 3]);

        let all = layout.candidate_slots(REG_MASK_ALL, true);
        assert_eq!(all.len(), REG_COUNT - 1);
        assert_eq!(all[0], 30);
        assert!(!all.contains(&32));
        assert_eq!(layout.candidate_slots(0, false), Vec::<usize>::new());
    }

    #[test]
    fn test_register_map() {
        let layout = RegisterLayout::aarch64();
        let mut regs = [0u64; REG_COUNT];
        regs[0] = 0xff;
        regs[REG_ARM64_PC] = 0x7f00_1000;

        let map = layout.register_map(&regs);
        assert_eq!(map.len(), REG_COUNT);
        assert_eq!(map["x0"], "0xff");
        assert_eq!(map["pc"], "0x7f001000");
        assert_eq!(map["sp"], "0x0");
    }
}
