/// Shift operation selected by instruction bits 6:5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ShiftType {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl ShiftType {
    /// Decodes the 2-bit shift field.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0x3 {
            0 => Self::Lsl,
            1 => Self::Lsr,
            2 => Self::Asr,
            _ => Self::Ror,
        }
    }
}

/// Where the shift amount came from, which decides the boundary rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftMode {
    /// 5-bit immediate amount; 0 encodes LSR/ASR #32 and RRX.
    Immediate5,
    /// Bottom byte of a register; 0 leaves operand and carry untouched.
    Register8,
    /// Rotated 8-bit immediate of data-processing; rotate only.
    Immediate32,
}

const fn bit(value: u32, n: u32) -> bool {
    (value >> n) & 1 != 0
}

const fn sign_fill(operand: u32) -> u32 {
    if bit(operand, 31) {
        u32::MAX
    } else {
        0
    }
}

/// Runs the barrel shifter, returning the shifted value and shifter carry-out.
#[must_use]
pub const fn shift(
    operand: u32,
    amount: u32,
    kind: ShiftType,
    mode: ShiftMode,
    carry_in: bool,
) -> (u32, bool) {
    match mode {
        ShiftMode::Immediate5 => shift_immediate(operand, amount & 0x1F, kind, carry_in),
        ShiftMode::Register8 => shift_register(operand, amount & 0xFF, kind, carry_in),
        ShiftMode::Immediate32 => rotate_immediate(operand, amount & 0x1F, carry_in),
    }
}

#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
const fn shift_immediate(operand: u32, amount: u32, kind: ShiftType, carry_in: bool) -> (u32, bool) {
    match kind {
        ShiftType::Lsl => {
            if amount == 0 {
                (operand, carry_in)
            } else {
                (operand << amount, bit(operand, 32 - amount))
            }
        }
        ShiftType::Lsr => {
            // LSR #0 encodes LSR #32.
            if amount == 0 {
                (0, bit(operand, 31))
            } else {
                (operand >> amount, bit(operand, amount - 1))
            }
        }
        ShiftType::Asr => {
            // ASR #0 encodes ASR #32.
            if amount == 0 {
                (sign_fill(operand), bit(operand, 31))
            } else {
                (
                    ((operand as i32) >> amount) as u32,
                    bit(operand, amount - 1),
                )
            }
        }
        ShiftType::Ror => {
            // ROR #0 encodes RRX.
            if amount == 0 {
                (((carry_in as u32) << 31) | (operand >> 1), bit(operand, 0))
            } else {
                (operand.rotate_right(amount), bit(operand, amount - 1))
            }
        }
    }
}

#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
const fn shift_register(operand: u32, amount: u32, kind: ShiftType, carry_in: bool) -> (u32, bool) {
    if amount == 0 {
        return (operand, carry_in);
    }
    match kind {
        ShiftType::Lsl => {
            if amount < 32 {
                (operand << amount, bit(operand, 32 - amount))
            } else if amount == 32 {
                (0, bit(operand, 0))
            } else {
                (0, false)
            }
        }
        ShiftType::Lsr => {
            if amount < 32 {
                (operand >> amount, bit(operand, amount - 1))
            } else if amount == 32 {
                (0, bit(operand, 31))
            } else {
                (0, false)
            }
        }
        ShiftType::Asr => {
            if amount < 32 {
                (
                    ((operand as i32) >> amount) as u32,
                    bit(operand, amount - 1),
                )
            } else {
                (sign_fill(operand), bit(operand, 31))
            }
        }
        ShiftType::Ror => {
            let rotate = amount & 0x1F;
            if rotate == 0 {
                (operand, bit(operand, 31))
            } else {
                (operand.rotate_right(rotate), bit(operand, rotate - 1))
            }
        }
    }
}

const fn rotate_immediate(operand: u32, amount: u32, carry_in: bool) -> (u32, bool) {
    if amount == 0 {
        (operand, carry_in)
    } else {
        let result = operand.rotate_right(amount);
        (result, bit(result, 31))
    }
}
