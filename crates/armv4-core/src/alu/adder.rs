/// Result of one pass through the adder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdderOutput {
    /// 32-bit sum.
    pub result: u32,
    /// Carry out of bit 31.
    pub carry: bool,
    /// Signed overflow.
    pub overflow: bool,
}

/// Adds `a + b + carry_in`.
///
/// The sum is split at bit 31: the low 31 bits are added first, then the two
/// sign bits together with the carry out of the low half. Carry is bit 1 of
/// that top sum. Overflow is the carry into bit 31 XOR the carry out of it.
#[must_use]
pub const fn add_with_carry(a: u32, b: u32, carry_in: bool) -> AdderOutput {
    let low = (a & 0x7FFF_FFFF) + (b & 0x7FFF_FFFF) + carry_in as u32;
    let carry_into_sign = low >> 31;
    let high = (a >> 31) + (b >> 31) + carry_into_sign;
    let carry_out = high >> 1;
    AdderOutput {
        result: (high << 31) | (low & 0x7FFF_FFFF),
        carry: carry_out != 0,
        overflow: (carry_into_sign ^ carry_out) != 0,
    }
}

/// Computes `a - b - !carry_in` on the same adder by inverting `b`.
///
/// The carry output is NOT(borrow): set when no borrow occurred.
#[must_use]
pub const fn sub_with_carry(a: u32, b: u32, carry_in: bool) -> AdderOutput {
    add_with_carry(a, !b, carry_in)
}
