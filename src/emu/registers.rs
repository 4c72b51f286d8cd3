use std::ops::{Index, IndexMut};

use crate::plat::Register;

bitflags::bitflags! {
    /// The CPU status flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u8 {
        /// Set if the last arithmetic operation overflowed or borrowed.
        const CARRY = 1 << 0;
        /// Set if the result of the last ALU operation was zero.
        const ZERO = 1 << 1;
        /// Set while pending interrupt lines may preempt execution.
        const INTERRUPT = 1 << 2;
    }
}

/// The register file: sixteen independent 8-bit cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers([u8; 16]);

impl Registers {
    pub fn clear(&mut self) {
        self.0 = [0; 16];
    }

    pub fn as_array(&self) -> &[u8; 16] {
        &self.0
    }

    /// Big-endian address formed from the values of two registers.
    pub fn address(&self, high: Register, low: Register) -> u16 {
        crate::util::word(self[high], self[low])
    }
}

impl Index<Register> for Registers {
    type Output = u8;

    fn index(&self, reg: Register) -> &u8 {
        &self.0[reg.index()]
    }
}

impl IndexMut<Register> for Registers {
    fn index_mut(&mut self, reg: Register) -> &mut u8 {
        &mut self.0[reg.index()]
    }
}
