//! Bit-slicing helpers shared by the decoder, the stack and the disassembler.

/// Upper 8 bits of a 16-bit value.
#[inline]
pub const fn high_byte(x: u16) -> u8 {
    (x >> 8) as u8
}

/// Lower 8 bits of a 16-bit value.
#[inline]
pub const fn low_byte(x: u16) -> u8 {
    (x & 0x00FF) as u8
}

/// Upper 4 bits of a byte, shifted down.
#[inline]
pub const fn high_nibble(x: u8) -> u8 {
    x >> 4
}

/// Lower 4 bits of a byte.
#[inline]
pub const fn low_nibble(x: u8) -> u8 {
    x & 0x0F
}

/// Joins two bytes big-endian.
#[inline]
pub const fn word(high: u8, low: u8) -> u16 {
    (high as u16) << 8 | low as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_word() {
        assert_eq!(high_byte(0xBEEF), 0xBE);
        assert_eq!(low_byte(0xBEEF), 0xEF);
        assert_eq!(word(0xBE, 0xEF), 0xBEEF);
    }

    #[test]
    fn test_split_byte() {
        assert_eq!(high_nibble(0xA5), 0x0A);
        assert_eq!(low_nibble(0xA5), 0x05);
    }
}
