//! 8-bit arithmetic and logic with carry/zero derivation.

// The ALU's current mode of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluMode {
    Add,
    /// Add, then add one more if the incoming carry is set.
    AddCarry,
    Sub,
    /// Subtract, then subtract one more if the incoming carry is set.
    SubCarry,
    And,
    Or,
    Xor,
}

bitflags::bitflags! {
    /// The ALU status flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AluStatus: u8 {
        /// Set if the result of the last ALU operation was zero.
        const ZERO = 1 << 0;
        /// Set if the last ALU operation overflowed (add) or borrowed (sub).
        const CARRY = 1 << 1;
    }
}

/// Performs `left <mode> right`, returning the wrapped 8-bit result and the
/// status it produces. `carry_in` only matters for the carry-chained modes.
pub fn compute(mode: AluMode, left: u8, right: u8, carry_in: bool) -> (u8, AluStatus) {
    let (result, carry) = match mode {
        AluMode::Add => left.overflowing_add(right),
        AluMode::Sub => left.overflowing_sub(right),
        AluMode::AddCarry => {
            let (result, c1) = left.overflowing_add(right);
            if carry_in {
                let (result, c2) = result.overflowing_add(1);
                (result, c1 || c2)
            } else {
                (result, c1)
            }
        }
        AluMode::SubCarry => {
            let (result, c1) = left.overflowing_sub(right);
            if carry_in {
                let (result, c2) = result.overflowing_sub(1);
                (result, c1 || c2)
            } else {
                (result, c1)
            }
        }
        AluMode::And => (left & right, false),
        AluMode::Or => (left | right, false),
        AluMode::Xor => (left ^ right, false),
    };
    let mut status = AluStatus::empty();
    status.set(AluStatus::CARRY, carry);
    status.set(AluStatus::ZERO, result == 0);
    (result, status)
}
