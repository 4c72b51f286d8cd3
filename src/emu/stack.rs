//! The hardware stack, living at the top of data memory.
//!
//! A push stores at `sp` and then decrements it; a pop increments `sp` and
//! then loads. Both wrap modulo 65536 and nothing stops the stack from
//! running into ordinary data.

use crate::util::{high_byte, low_byte, word};

use super::emulator::Mcu;

impl Mcu {
    pub(super) fn push_u8(&mut self, value: u8) {
        self.data.write(self.sp, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    pub(super) fn pop_u8(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.data.read(self.sp)
    }

    /// High byte first, so the low byte ends up on top.
    pub(super) fn push_u16(&mut self, value: u16) {
        self.push_u8(high_byte(value));
        self.push_u8(low_byte(value));
    }

    pub(super) fn pop_u16(&mut self) -> u16 {
        let low = self.pop_u8();
        let high = self.pop_u8();
        word(high, low)
    }
}
