//! Program-memory disassembly. Uses the same decoder as execution but walks a
//! private cursor, so no processor state is touched.

use std::fmt;

use crate::plat::Instruction;

use super::{emulator::Mcu, memory::MEMORY_SIZE, EResult};

/// One decoded instruction in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisassembledInstruction {
    pub address: u16,
    pub bytes: Vec<u8>,
    pub text: String,
}

impl fmt::Display for DisassembledInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}:", self.address)?;
        for b in &self.bytes {
            write!(f, " {b:02X}")?;
        }
        // pad raw bytes out to the longest (4-byte) encoding
        for _ in self.bytes.len()..4 {
            f.write_str("   ")?;
        }
        write!(f, "  {}", self.text)
    }
}

impl Mcu {
    /// Disassembles the whole program address space, from 0x0000 until the
    /// cursor wraps back around. Unused (zeroed) memory lists as `nop`.
    ///
    /// # Errors
    ///
    /// This function will return an error on the first byte that is not an assigned opcode.
    pub fn disassemble(&self) -> EResult<Vec<DisassembledInstruction>> {
        self.disassemble_range(0x0000, MEMORY_SIZE)
    }

    /// Disassembles only the extent of the last loaded binary.
    ///
    /// # Errors
    ///
    /// This function will return an error on the first byte that is not an assigned opcode.
    pub fn disassemble_program(&self) -> EResult<Vec<DisassembledInstruction>> {
        self.disassemble_range(0x0000, self.program_len())
    }

    /// Decodes from `start` until at least `len` bytes have been consumed.
    /// The last instruction may run past `len`; the cursor wraps at 0xFFFF.
    ///
    /// # Errors
    ///
    /// This function will return an error on the first byte that is not an assigned opcode.
    pub fn disassemble_range(
        &self,
        start: u16,
        len: usize,
    ) -> EResult<Vec<DisassembledInstruction>> {
        let mut out = vec![];
        let mut cursor = start;
        let mut consumed = 0usize;
        while consumed < len {
            let (instr, bytes) = self.decode_at(cursor)?;
            out.push(DisassembledInstruction {
                address: cursor,
                text: instr.to_string(),
                bytes,
            });
            let size = instr.len();
            cursor = cursor.wrapping_add(size);
            consumed += size as usize;
        }
        Ok(out)
    }

    /// Decodes `count` instructions starting at `start`.
    ///
    /// # Errors
    ///
    /// This function will return an error on the first byte that is not an assigned opcode.
    pub fn disassemble_count(
        &self,
        start: u16,
        count: usize,
    ) -> EResult<Vec<DisassembledInstruction>> {
        let mut out = Vec::with_capacity(count);
        let mut cursor = start;
        for _ in 0..count {
            let (instr, bytes) = self.decode_at(cursor)?;
            out.push(DisassembledInstruction {
                address: cursor,
                text: instr.to_string(),
                bytes,
            });
            cursor = cursor.wrapping_add(instr.len());
        }
        Ok(out)
    }

    fn decode_at(&self, addr: u16) -> EResult<(Instruction, Vec<u8>)> {
        let mut bytes = Vec::with_capacity(4);
        let mut cursor = addr;
        let instr = Instruction::decode(|| {
            let byte = self.program.read(cursor);
            bytes.push(byte);
            cursor = cursor.wrapping_add(1);
            byte
        })?;
        Ok((instr, bytes))
    }
}
