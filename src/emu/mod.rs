//! The emulator/debugger module for the MCU8.

use thiserror::Error;

use crate::plat::PlatformError;

pub mod alu;
pub mod debugger;
pub mod disasm;
pub mod emulator;
pub mod interrupts;
pub mod memory;
pub mod ports;
pub mod registers;
mod stack;

/// An error raised while loading or running a program.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EmuError {
    #[error("illegal opcode {0:#04x}")]
    IllegalOpcode(u8),
    #[error("program of {len} bytes does not fit in {} bytes of program memory", memory::MEMORY_SIZE)]
    ProgramTooLarge { len: usize },
}

impl From<PlatformError> for EmuError {
    fn from(e: PlatformError) -> Self {
        match e {
            PlatformError::IllegalOpcode(op) => Self::IllegalOpcode(op),
        }
    }
}

/// Type alias for Result<T, [EmuError]>.
pub type EResult<T> = Result<T, EmuError>;
