//! The instruction set of the MCU8: registers, opcodes, operand formats and the
//! byte-level encoding shared by the executor and the disassembler.

use std::fmt;

use thiserror::Error;

use crate::util::{high_byte, high_nibble, low_byte, low_nibble, word};

/// An error for the core platform of the MCU8.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformError {
    #[error("illegal opcode {0:#04x}")]
    IllegalOpcode(u8),
}

/// Type alias for Result<T, [PlatformError]>.
pub type PResult<T> = Result<T, PlatformError>;

/// The sixteen general purpose 8-bit registers.
///
/// None of them are special: the stack pointer, program counter and flags live
/// outside the register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Register {
    R0 = 0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

impl Register {
    /// Every register, in index order.
    pub const ALL: [Register; 16] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
        Self::R8,
        Self::R9,
        Self::R10,
        Self::R11,
        Self::R12,
        Self::R13,
        Self::R14,
        Self::R15,
    ];

    /// Selects a register by the low nibble of `n`. The high nibble is ignored.
    pub const fn from_nibble(n: u8) -> Self {
        Self::ALL[low_nibble(n) as usize]
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", *self as u8)
    }
}

/// Two registers whose *values* form a big-endian 16-bit address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PtrPair {
    pub high: Register,
    pub low: Register,
}

impl PtrPair {
    pub const fn new(high: Register, low: Register) -> Self {
        Self { high, low }
    }
}

impl fmt::Display for PtrPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.high, self.low)
    }
}

/// The opcode byte of every instruction.
///
/// Values are grouped by high nibble: `0x0_` control, `0x1_` arithmetic,
/// `0x2_` flow, `0x3_` data movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /* Control */
    /// Does nothing
    Nop = 0x00,
    /// Halts until reset
    Stop = 0x01,
    /// Waits for an enabled interrupt
    Sleep = 0x02,
    /// Debugger breakpoint, otherwise a `nop`
    Break = 0x03,
    /// `I <- 1`
    Ei = 0x04,
    /// `C <- 1`
    Sec = 0x05,
    /// `Z <- 1`
    Sez = 0x06,
    /// `I <- 0`
    Di = 0x07,
    /// `C <- 0`
    Clc = 0x08,
    /// `Z <- 0`
    Clz = 0x09,

    /* ALU */
    /// `regA <- regA + regB`
    Add = 0x10,
    /// `regA <- regA + regB + C`
    Addc = 0x11,
    /// `regA <- regA - regB`
    Sub = 0x12,
    /// `regA <- regA - regB - C`
    Subc = 0x13,
    /// `regA <- regA + 1`
    Inc = 0x14,
    /// `regA <- regA - 1`
    Dec = 0x15,
    /// `regA <- regA & regB`
    And = 0x16,
    /// `regA <- regA | regB`
    Or = 0x17,
    /// `regA <- regA ^ regB`
    Xor = 0x18,
    /// Flags of `regA - regB`
    Cmp = 0x19,
    /// Flags of `regA - imm`
    Cmpi = 0x1A,

    /* Branching */
    /// `pc <- addr`
    Jmp = 0x20,
    /// `push pc; pc <- addr`
    Call = 0x21,
    /// `pop pc`
    Ret = 0x22,
    /// `pop pc; I <- 1`
    Reti = 0x23,
    /// `if C: pc <- addr`
    Brc = 0x24,
    /// `if !C: pc <- addr`
    Brnc = 0x25,
    /// `if Z: pc <- addr`
    Brz = 0x26,
    /// `if !Z: pc <- addr`
    Brnz = 0x27,

    /* Memory */
    /// `regA <- regB`
    Mov = 0x30,
    /// `regA <- imm`
    Ldi = 0x31,
    /// `regA <- data[addr]`
    Ld = 0x32,
    /// `data[addr] <- regA`
    St = 0x33,
    /// `data[sp--] <- regA`
    Push = 0x34,
    /// `regA <- data[++sp]`
    Pop = 0x35,
    /// `regA <- prog[addr]`
    Lpm = 0x36,
    /// `regA <- data[regH:regL]`
    Ldd = 0x37,
    /// `data[regH:regL] <- regA`
    Std = 0x38,
    /// `regA <- prog[regH:regL]`
    Lpmd = 0x39,
    /// `regA <- port[imm]`
    In = 0x3A,
    /// `port[imm] <- regA`
    Out = 0x3B,
}

impl Opcode {
    /// Every assigned opcode, in byte order.
    pub const ALL: [Opcode; 41] = [
        Self::Nop,
        Self::Stop,
        Self::Sleep,
        Self::Break,
        Self::Ei,
        Self::Sec,
        Self::Sez,
        Self::Di,
        Self::Clc,
        Self::Clz,
        Self::Add,
        Self::Addc,
        Self::Sub,
        Self::Subc,
        Self::Inc,
        Self::Dec,
        Self::And,
        Self::Or,
        Self::Xor,
        Self::Cmp,
        Self::Cmpi,
        Self::Jmp,
        Self::Call,
        Self::Ret,
        Self::Reti,
        Self::Brc,
        Self::Brnc,
        Self::Brz,
        Self::Brnz,
        Self::Mov,
        Self::Ldi,
        Self::Ld,
        Self::St,
        Self::Push,
        Self::Pop,
        Self::Lpm,
        Self::Ldd,
        Self::Std,
        Self::Lpmd,
        Self::In,
        Self::Out,
    ];

    /// The operand encoding that follows this opcode.
    pub const fn format(self) -> InstrFormat {
        match self {
            Self::Nop
            | Self::Stop
            | Self::Sleep
            | Self::Break
            | Self::Ei
            | Self::Sec
            | Self::Sez
            | Self::Di
            | Self::Clc
            | Self::Clz
            | Self::Ret
            | Self::Reti => InstrFormat::OpOnly,
            Self::Add
            | Self::Addc
            | Self::Sub
            | Self::Subc
            | Self::And
            | Self::Or
            | Self::Xor
            | Self::Cmp
            | Self::Mov => InstrFormat::RR,
            Self::Inc | Self::Dec | Self::Push | Self::Pop => InstrFormat::R,
            Self::Cmpi | Self::Ldi => InstrFormat::RI,
            Self::Jmp | Self::Call | Self::Brc | Self::Brnc | Self::Brz | Self::Brnz => {
                InstrFormat::A
            }
            Self::Ld | Self::St | Self::Lpm => InstrFormat::RA,
            Self::Ldd | Self::Std | Self::Lpmd => InstrFormat::RP,
            Self::In | Self::Out => InstrFormat::RPort,
        }
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::Stop => "stop",
            Self::Sleep => "sleep",
            Self::Break => "break",
            Self::Ei => "ei",
            Self::Sec => "sec",
            Self::Sez => "sez",
            Self::Di => "di",
            Self::Clc => "clc",
            Self::Clz => "clz",
            Self::Add => "add",
            Self::Addc => "addc",
            Self::Sub => "sub",
            Self::Subc => "subc",
            Self::Inc => "inc",
            Self::Dec => "dec",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Cmp => "cmp",
            Self::Cmpi => "cmpi",
            Self::Jmp => "jmp",
            Self::Call => "call",
            Self::Ret => "ret",
            Self::Reti => "reti",
            Self::Brc => "brc",
            Self::Brnc => "brnc",
            Self::Brz => "brz",
            Self::Brnz => "brnz",
            Self::Mov => "mov",
            Self::Ldi => "ldi",
            Self::Ld => "ld",
            Self::St => "st",
            Self::Push => "push",
            Self::Pop => "pop",
            Self::Lpm => "lpm",
            Self::Ldd => "ldd",
            Self::Std => "std",
            Self::Lpmd => "lpmd",
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = PlatformError;

    fn try_from(value: u8) -> Result<Self, PlatformError> {
        match value {
            0x00 => Ok(Self::Nop),
            0x01 => Ok(Self::Stop),
            0x02 => Ok(Self::Sleep),
            0x03 => Ok(Self::Break),
            0x04 => Ok(Self::Ei),
            0x05 => Ok(Self::Sec),
            0x06 => Ok(Self::Sez),
            0x07 => Ok(Self::Di),
            0x08 => Ok(Self::Clc),
            0x09 => Ok(Self::Clz),
            0x10 => Ok(Self::Add),
            0x11 => Ok(Self::Addc),
            0x12 => Ok(Self::Sub),
            0x13 => Ok(Self::Subc),
            0x14 => Ok(Self::Inc),
            0x15 => Ok(Self::Dec),
            0x16 => Ok(Self::And),
            0x17 => Ok(Self::Or),
            0x18 => Ok(Self::Xor),
            0x19 => Ok(Self::Cmp),
            0x1A => Ok(Self::Cmpi),
            0x20 => Ok(Self::Jmp),
            0x21 => Ok(Self::Call),
            0x22 => Ok(Self::Ret),
            0x23 => Ok(Self::Reti),
            0x24 => Ok(Self::Brc),
            0x25 => Ok(Self::Brnc),
            0x26 => Ok(Self::Brz),
            0x27 => Ok(Self::Brnz),
            0x30 => Ok(Self::Mov),
            0x31 => Ok(Self::Ldi),
            0x32 => Ok(Self::Ld),
            0x33 => Ok(Self::St),
            0x34 => Ok(Self::Push),
            0x35 => Ok(Self::Pop),
            0x36 => Ok(Self::Lpm),
            0x37 => Ok(Self::Ldd),
            0x38 => Ok(Self::Std),
            0x39 => Ok(Self::Lpmd),
            0x3A => Ok(Self::In),
            0x3B => Ok(Self::Out),
            _ => Err(PlatformError::IllegalOpcode(value)),
        }
    }
}

/// Operand formats, i.e. how the bytes following an opcode are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrFormat {
    /// `<Opcode>`
    OpOnly,
    /// `<Opcode, Dst:Src>`, one register per nibble.
    RR,
    /// `<Opcode, ignored:Reg>`
    R,
    /// `<Opcode, Reg, Immediate>`
    RI,
    /// `<Opcode, AddrHi, AddrLo>`
    A,
    /// `<Opcode, Reg, AddrHi, AddrLo>`
    RA,
    /// `<Opcode, Reg, PtrHi:PtrLo>`, the address comes from two registers' values.
    RP,
    /// `<Opcode, Reg, Port>`
    RPort,
}

impl InstrFormat {
    /// Number of bytes following the opcode.
    pub const fn operand_len(self) -> u16 {
        match self {
            Self::OpOnly => 0,
            Self::RR | Self::R => 1,
            Self::RI | Self::A | Self::RP | Self::RPort => 2,
            Self::RA => 3,
        }
    }
}

/// A fully decoded instruction. Operands are carried per mnemonic, so every
/// consumer (executor, disassembler, encoder) must handle every instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    Nop,
    Stop,
    Sleep,
    Break,
    Ei,
    Sec,
    Sez,
    Di,
    Clc,
    Clz,

    Add(Register, Register),
    Addc(Register, Register),
    Sub(Register, Register),
    Subc(Register, Register),
    Inc(Register),
    Dec(Register),
    And(Register, Register),
    Or(Register, Register),
    Xor(Register, Register),
    Cmp(Register, Register),
    Cmpi(Register, u8),

    Jmp(u16),
    Call(u16),
    Ret,
    Reti,
    Brc(u16),
    Brnc(u16),
    Brz(u16),
    Brnz(u16),

    Mov(Register, Register),
    Ldi(Register, u8),
    Ld(Register, u16),
    St(Register, u16),
    Push(Register),
    Pop(Register),
    Lpm(Register, u16),
    Ldd(Register, PtrPair),
    Std(Register, PtrPair),
    Lpmd(Register, PtrPair),
    In(Register, u8),
    Out(Register, u8),
}

/// Pulls operand bytes out of an instruction stream.
struct Operands<F> {
    next: F,
}

impl<F: FnMut() -> u8> Operands<F> {
    fn byte(&mut self) -> u8 {
        (self.next)()
    }

    fn word(&mut self) -> u16 {
        let high = self.byte();
        let low = self.byte();
        word(high, low)
    }

    fn pair(&mut self) -> (Register, Register) {
        let byte = self.byte();
        (
            Register::from_nibble(high_nibble(byte)),
            Register::from_nibble(low_nibble(byte)),
        )
    }

    fn reg(&mut self) -> Register {
        self.pair().1
    }

    fn ptr(&mut self) -> PtrPair {
        let (high, low) = self.pair();
        PtrPair { high, low }
    }
}

impl Instruction {
    /// Decodes one instruction, pulling bytes from `next` as it goes.
    ///
    /// Only the opcode byte is consumed when it turns out to be illegal.
    ///
    /// # Errors
    ///
    /// This function will return an error if the first byte is not an assigned opcode.
    pub fn decode(next: impl FnMut() -> u8) -> PResult<Self> {
        let mut o = Operands { next };
        let op = Opcode::try_from(o.byte())?;
        let instr = match op {
            Opcode::Nop => Self::Nop,
            Opcode::Stop => Self::Stop,
            Opcode::Sleep => Self::Sleep,
            Opcode::Break => Self::Break,
            Opcode::Ei => Self::Ei,
            Opcode::Sec => Self::Sec,
            Opcode::Sez => Self::Sez,
            Opcode::Di => Self::Di,
            Opcode::Clc => Self::Clc,
            Opcode::Clz => Self::Clz,
            Opcode::Add => {
                let (dst, src) = o.pair();
                Self::Add(dst, src)
            }
            Opcode::Addc => {
                let (dst, src) = o.pair();
                Self::Addc(dst, src)
            }
            Opcode::Sub => {
                let (dst, src) = o.pair();
                Self::Sub(dst, src)
            }
            Opcode::Subc => {
                let (dst, src) = o.pair();
                Self::Subc(dst, src)
            }
            Opcode::Inc => Self::Inc(o.reg()),
            Opcode::Dec => Self::Dec(o.reg()),
            Opcode::And => {
                let (dst, src) = o.pair();
                Self::And(dst, src)
            }
            Opcode::Or => {
                let (dst, src) = o.pair();
                Self::Or(dst, src)
            }
            Opcode::Xor => {
                let (dst, src) = o.pair();
                Self::Xor(dst, src)
            }
            Opcode::Cmp => {
                let (r0, r1) = o.pair();
                Self::Cmp(r0, r1)
            }
            Opcode::Cmpi => Self::Cmpi(o.reg(), o.byte()),
            Opcode::Jmp => Self::Jmp(o.word()),
            Opcode::Call => Self::Call(o.word()),
            Opcode::Ret => Self::Ret,
            Opcode::Reti => Self::Reti,
            Opcode::Brc => Self::Brc(o.word()),
            Opcode::Brnc => Self::Brnc(o.word()),
            Opcode::Brz => Self::Brz(o.word()),
            Opcode::Brnz => Self::Brnz(o.word()),
            Opcode::Mov => {
                let (dst, src) = o.pair();
                Self::Mov(dst, src)
            }
            Opcode::Ldi => Self::Ldi(o.reg(), o.byte()),
            Opcode::Ld => Self::Ld(o.reg(), o.word()),
            Opcode::St => Self::St(o.reg(), o.word()),
            Opcode::Push => Self::Push(o.reg()),
            Opcode::Pop => Self::Pop(o.reg()),
            Opcode::Lpm => Self::Lpm(o.reg(), o.word()),
            Opcode::Ldd => Self::Ldd(o.reg(), o.ptr()),
            Opcode::Std => Self::Std(o.reg(), o.ptr()),
            Opcode::Lpmd => Self::Lpmd(o.reg(), o.ptr()),
            Opcode::In => Self::In(o.reg(), o.byte()),
            Opcode::Out => Self::Out(o.reg(), o.byte()),
        };
        Ok(instr)
    }

    /// Decodes one instruction from the start of `bytes`. Missing trailing
    /// bytes read as zero.
    ///
    /// # Errors
    ///
    /// This function will return an error if the first byte is not an assigned opcode.
    pub fn from_bytes(bytes: &[u8]) -> PResult<Self> {
        let mut it = bytes.iter().copied();
        Self::decode(|| it.next().unwrap_or(0))
    }

    pub const fn opcode(self) -> Opcode {
        match self {
            Self::Nop => Opcode::Nop,
            Self::Stop => Opcode::Stop,
            Self::Sleep => Opcode::Sleep,
            Self::Break => Opcode::Break,
            Self::Ei => Opcode::Ei,
            Self::Sec => Opcode::Sec,
            Self::Sez => Opcode::Sez,
            Self::Di => Opcode::Di,
            Self::Clc => Opcode::Clc,
            Self::Clz => Opcode::Clz,
            Self::Add(..) => Opcode::Add,
            Self::Addc(..) => Opcode::Addc,
            Self::Sub(..) => Opcode::Sub,
            Self::Subc(..) => Opcode::Subc,
            Self::Inc(_) => Opcode::Inc,
            Self::Dec(_) => Opcode::Dec,
            Self::And(..) => Opcode::And,
            Self::Or(..) => Opcode::Or,
            Self::Xor(..) => Opcode::Xor,
            Self::Cmp(..) => Opcode::Cmp,
            Self::Cmpi(..) => Opcode::Cmpi,
            Self::Jmp(_) => Opcode::Jmp,
            Self::Call(_) => Opcode::Call,
            Self::Ret => Opcode::Ret,
            Self::Reti => Opcode::Reti,
            Self::Brc(_) => Opcode::Brc,
            Self::Brnc(_) => Opcode::Brnc,
            Self::Brz(_) => Opcode::Brz,
            Self::Brnz(_) => Opcode::Brnz,
            Self::Mov(..) => Opcode::Mov,
            Self::Ldi(..) => Opcode::Ldi,
            Self::Ld(..) => Opcode::Ld,
            Self::St(..) => Opcode::St,
            Self::Push(_) => Opcode::Push,
            Self::Pop(_) => Opcode::Pop,
            Self::Lpm(..) => Opcode::Lpm,
            Self::Ldd(..) => Opcode::Ldd,
            Self::Std(..) => Opcode::Std,
            Self::Lpmd(..) => Opcode::Lpmd,
            Self::In(..) => Opcode::In,
            Self::Out(..) => Opcode::Out,
        }
    }

    /// Encoded size in bytes, opcode included.
    pub const fn len(self) -> u16 {
        1 + self.opcode().format().operand_len()
    }

    /// Generates the machine code for this instruction. The ignored high
    /// nibble of single-register operands is written as zero.
    pub fn to_bytes(self) -> Vec<u8> {
        let op = self.opcode() as u8;
        let pair = |a: Register, b: Register| (a as u8) << 4 | b as u8;
        match self {
            Self::Nop
            | Self::Stop
            | Self::Sleep
            | Self::Break
            | Self::Ei
            | Self::Sec
            | Self::Sez
            | Self::Di
            | Self::Clc
            | Self::Clz
            | Self::Ret
            | Self::Reti => vec![op],
            Self::Add(a, b)
            | Self::Addc(a, b)
            | Self::Sub(a, b)
            | Self::Subc(a, b)
            | Self::And(a, b)
            | Self::Or(a, b)
            | Self::Xor(a, b)
            | Self::Cmp(a, b)
            | Self::Mov(a, b) => vec![op, pair(a, b)],
            Self::Inc(r) | Self::Dec(r) | Self::Push(r) | Self::Pop(r) => vec![op, r as u8],
            Self::Cmpi(r, imm) | Self::Ldi(r, imm) | Self::In(r, imm) | Self::Out(r, imm) => {
                vec![op, r as u8, imm]
            }
            Self::Jmp(addr)
            | Self::Call(addr)
            | Self::Brc(addr)
            | Self::Brnc(addr)
            | Self::Brz(addr)
            | Self::Brnz(addr) => vec![op, high_byte(addr), low_byte(addr)],
            Self::Ld(r, addr) | Self::St(r, addr) | Self::Lpm(r, addr) => {
                vec![op, r as u8, high_byte(addr), low_byte(addr)]
            }
            Self::Ldd(r, p) | Self::Std(r, p) | Self::Lpmd(r, p) => {
                vec![op, r as u8, pair(p.high, p.low)]
            }
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.opcode().mnemonic();
        match *self {
            Self::Nop
            | Self::Stop
            | Self::Sleep
            | Self::Break
            | Self::Ei
            | Self::Sec
            | Self::Sez
            | Self::Di
            | Self::Clc
            | Self::Clz
            | Self::Ret
            | Self::Reti => write!(f, "{m}"),
            Self::Add(a, b)
            | Self::Addc(a, b)
            | Self::Sub(a, b)
            | Self::Subc(a, b)
            | Self::And(a, b)
            | Self::Or(a, b)
            | Self::Xor(a, b)
            | Self::Cmp(a, b)
            | Self::Mov(a, b) => write!(f, "{m} {a}, {b}"),
            Self::Inc(r) | Self::Dec(r) | Self::Push(r) | Self::Pop(r) => write!(f, "{m} {r}"),
            Self::Cmpi(r, imm) | Self::Ldi(r, imm) | Self::In(r, imm) | Self::Out(r, imm) => {
                write!(f, "{m} {r}, ${imm:02X}")
            }
            Self::Jmp(addr)
            | Self::Call(addr)
            | Self::Brc(addr)
            | Self::Brnc(addr)
            | Self::Brz(addr)
            | Self::Brnz(addr) => write!(f, "{m} ${addr:04X}"),
            Self::Ld(r, addr) | Self::St(r, addr) | Self::Lpm(r, addr) => {
                write!(f, "{m} {r}, ${addr:04X}")
            }
            Self::Ldd(r, p) | Self::Std(r, p) | Self::Lpmd(r, p) => write!(f, "{m} {r}, {p}"),
        }
    }
}

/// Concatenates the machine code of a sequence of instructions.
pub fn encode_all(instrs: &[Instruction]) -> Vec<u8> {
    instrs.iter().flat_map(|i| i.to_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use Register::*;

    #[test]
    fn test_instruction_encode() {
        assert_eq!(Instruction::Inc(R0).to_bytes(), [0x14, 0x00]);
        assert_eq!(Instruction::Add(R1, R2).to_bytes(), [0x10, 0x12]);
        assert_eq!(Instruction::Ldi(R3, 0xFF).to_bytes(), [0x31, 0x03, 0xFF]);
        assert_eq!(Instruction::Jmp(0x0100).to_bytes(), [0x20, 0x01, 0x00]);
        assert_eq!(
            Instruction::St(R4, 0x1234).to_bytes(),
            [0x33, 0x04, 0x12, 0x34]
        );
        assert_eq!(
            Instruction::Ldd(R5, PtrPair::new(R0, R1)).to_bytes(),
            [0x37, 0x05, 0x01]
        );
        assert_eq!(Instruction::Out(R0, 0x02).to_bytes(), [0x3B, 0x00, 0x02]);
    }

    #[test]
    fn test_instruction_decode() {
        assert_eq!(
            Instruction::from_bytes(&[0x1A, 0x07, 0x42]).unwrap(),
            Instruction::Cmpi(R7, 0x42)
        );
        assert_eq!(
            Instruction::from_bytes(&[0x36, 0x0F, 0xAB, 0xCD]).unwrap(),
            Instruction::Lpm(R15, 0xABCD)
        );
        assert_eq!(
            Instruction::from_bytes(&[0x39, 0x02, 0xEF]).unwrap(),
            Instruction::Lpmd(R2, PtrPair::new(R14, R15))
        );
    }

    #[test]
    fn test_single_register_ignores_high_nibble() {
        assert_eq!(
            Instruction::from_bytes(&[0x34, 0xF3]).unwrap(),
            Instruction::Push(R3)
        );
        assert_eq!(
            Instruction::from_bytes(&[0x31, 0xA1, 0x10]).unwrap(),
            Instruction::Ldi(R1, 0x10)
        );
    }

    #[test]
    fn test_illegal_opcode() {
        let mut consumed = 0;
        let err = Instruction::decode(|| {
            consumed += 1;
            0xFF
        })
        .unwrap_err();
        assert_eq!(err, PlatformError::IllegalOpcode(0xFF));
        assert_eq!(consumed, 1);
        assert_eq!(
            Instruction::from_bytes(&[0x0A]),
            Err(PlatformError::IllegalOpcode(0x0A))
        );
    }

    #[test]
    fn test_opcode_table_is_consistent() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::try_from(op as u8), Ok(op));
            let mut consumed = 0u16;
            let mut bytes = std::iter::once(op as u8).chain(std::iter::repeat(0));
            let instr = Instruction::decode(|| {
                consumed += 1;
                bytes.next().unwrap_or(0)
            })
            .unwrap();
            assert_eq!(instr.opcode(), op);
            assert_eq!(consumed, instr.len(), "{}", op.mnemonic());
            assert_eq!(instr.to_bytes().len(), instr.len() as usize);
        }
        let assigned = (0..=u8::MAX)
            .filter(|b| Opcode::try_from(*b).is_ok())
            .count();
        assert_eq!(assigned, Opcode::ALL.len());
    }

    #[test]
    fn test_display() {
        let cases = [
            (Instruction::Nop, "nop"),
            (Instruction::Inc(R0), "inc R0"),
            (Instruction::Add(R1, R2), "add R1, R2"),
            (Instruction::Ldi(R3, 0xFF), "ldi R3, $FF"),
            (Instruction::Jmp(0x0100), "jmp $0100"),
            (Instruction::Ld(R4, 0x1234), "ld R4, $1234"),
            (Instruction::Ldd(R5, PtrPair::new(R0, R1)), "ldd R5, [R0:R1]"),
            (Instruction::Out(R0, 0x02), "out R0, $02"),
            (Instruction::Cmpi(R10, 0x0A), "cmpi R10, $0A"),
        ];
        for (instr, text) in cases {
            assert_eq!(instr.to_string(), text);
        }
    }

    #[test]
    fn test_encoded_instruction_disassembles_to_itself() {
        let program = [
            Instruction::Ldi(R0, 0x10),
            Instruction::Call(0x0040),
            Instruction::Std(R3, PtrPair::new(R1, R0)),
            Instruction::In(R9, 0x80),
            Instruction::Reti,
        ];
        let bytes = encode_all(&program);
        let mut rest = &bytes[..];
        for instr in program {
            let decoded = Instruction::from_bytes(rest).unwrap();
            assert_eq!(decoded, instr);
            assert_eq!(decoded.to_string(), instr.to_string());
            rest = &rest[decoded.len() as usize..];
        }
        assert!(rest.is_empty());
    }
}
