use crate::encoding::InstructionShape;

/// Approximate cost of each instruction shape. Values are for relative
/// profiling only; the core is not cycle accurate.
pub const CYCLE_COST_TABLE: &[(InstructionShape, u8)] = &[
    (InstructionShape::DataProcImm, 1),
    (InstructionShape::DataProcRegShiftImm, 1),
    (InstructionShape::DataProcRegShiftReg, 2),
    (InstructionShape::LoadStoreImm, 3),
    (InstructionShape::LoadStoreReg, 3),
    (InstructionShape::HalfwordReg, 3),
    (InstructionShape::HalfwordImm, 3),
    (InstructionShape::SignedByteReg, 3),
    (InstructionShape::SignedByteImm, 3),
    (InstructionShape::SignedHalfReg, 3),
    (InstructionShape::SignedHalfImm, 3),
    (InstructionShape::BlockTransfer, 4),
    (InstructionShape::Branch, 3),
    (InstructionShape::BranchExchange, 3),
    (InstructionShape::Multiply, 3),
    (InstructionShape::MultiplyLong, 4),
    (InstructionShape::Swap, 4),
    (InstructionShape::Mrs, 1),
    (InstructionShape::Msr, 1),
    (InstructionShape::CoprocessorTransfer, 2),
    (InstructionShape::Clz, 1),
    (InstructionShape::SoftwareInterrupt, 3),
    (InstructionShape::Undefined, 3),
];

/// Looks up the cost of a shape. Shapes missing from the table cost one.
#[must_use]
pub fn cycle_cost(shape: InstructionShape) -> u8 {
    CYCLE_COST_TABLE
        .iter()
        .find_map(|(entry, cycles)| (*entry == shape).then_some(*cycles))
        .unwrap_or(1)
}
