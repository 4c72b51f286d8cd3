//! MCU8: an emulator and disassembler for a small 8-bit microcontroller
//! with separate 64 KiB program and data memories.

pub mod asm;
pub mod emu;
pub mod plat;
pub mod util;

pub use emu::{emulator::Mcu, EResult, EmuError};
pub use plat::{Instruction, Opcode, Register};
