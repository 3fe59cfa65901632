//! Forward iteration over a bytecode array with typed operand access.

use super::array::{BytecodeArray, Constant, Instruction, JumpTableEntry, Operand};
use super::opcode::Opcode;
use super::register::{FeedbackSlot, Register};

/// A cursor over a [`BytecodeArray`] in ascending offset order.
///
/// Typed operand accessors decode the current instruction's operands by
/// position. Requesting an operand of the wrong kind is a programmer
/// error and panics, like out-of-range slice indexing.
#[derive(Debug)]
pub struct BytecodeIterator<'a> {
    array: &'a BytecodeArray,
    offset: usize,
}

impl<'a> BytecodeIterator<'a> {
    /// Create an iterator positioned at offset 0.
    #[must_use]
    pub fn new(array: &'a BytecodeArray) -> Self {
        Self { array, offset: 0 }
    }

    /// The underlying array.
    #[inline]
    #[must_use]
    pub fn array(&self) -> &'a BytecodeArray {
        self.array
    }

    /// Whether the cursor has moved past the last instruction.
    #[inline]
    #[must_use]
    pub fn done(&self) -> bool {
        self.offset >= self.array.len()
    }

    /// Advance to the next offset.
    #[inline]
    pub fn advance(&mut self) {
        self.offset += 1;
    }

    /// The current offset.
    #[inline]
    #[must_use]
    pub fn current_offset(&self) -> u32 {
        self.offset as u32
    }

    /// The opcode at the current offset.
    ///
    /// # Panics
    /// Panics if the iterator is done.
    #[inline]
    #[must_use]
    pub fn current_opcode(&self) -> Opcode {
        self.current().opcode
    }

    #[inline]
    fn current(&self) -> &'a Instruction {
        &self.array.instructions[self.offset]
    }

    #[inline]
    fn operand(&self, index: usize) -> Operand {
        self.current().operands[index]
    }

    /// The register operand at position `index`.
    #[must_use]
    pub fn register_operand(&self, index: usize) -> Register {
        match self.operand(index) {
            Operand::Reg(r) => r,
            other => panic!("operand {index} is not a register: {other:?}"),
        }
    }

    /// The immediate operand at position `index`.
    #[must_use]
    pub fn immediate_operand(&self, index: usize) -> i32 {
        match self.operand(index) {
            Operand::Imm(v) => v,
            other => panic!("operand {index} is not an immediate: {other:?}"),
        }
    }

    /// The unsigned index operand at position `index`.
    #[must_use]
    pub fn index_operand(&self, index: usize) -> u32 {
        match self.operand(index) {
            Operand::Idx(v) => v,
            other => panic!("operand {index} is not an index: {other:?}"),
        }
    }

    /// The feedback-slot operand at position `index`.
    #[must_use]
    pub fn slot_operand(&self, index: usize) -> FeedbackSlot {
        match self.operand(index) {
            Operand::Slot(s) => s,
            other => panic!("operand {index} is not a feedback slot: {other:?}"),
        }
    }

    /// The register-range length operand at position `index`.
    #[must_use]
    pub fn register_count_operand(&self, index: usize) -> u32 {
        match self.operand(index) {
            Operand::Count(c) => c,
            other => panic!("operand {index} is not a register count: {other:?}"),
        }
    }

    /// The constant pool entry referenced by the index operand at `index`.
    #[must_use]
    pub fn constant_operand(&self, index: usize) -> Constant {
        self.array.constant(self.index_operand(index))
    }

    /// The target offset of the current (conditional or unconditional) jump.
    ///
    /// # Panics
    /// Panics if the current instruction carries no jump operand.
    #[must_use]
    pub fn jump_target_offset(&self) -> u32 {
        for operand in &self.current().operands {
            if let Operand::Jump(target) = operand {
                return *target;
            }
        }
        panic!(
            "bytecode {} at offset {} has no jump operand",
            self.current_opcode(),
            self.current_offset()
        );
    }

    /// The jump table of the current switch instruction.
    ///
    /// # Panics
    /// Panics if the current instruction carries no table operand.
    #[must_use]
    pub fn jump_table_targets(&self) -> &'a [JumpTableEntry] {
        for operand in &self.current().operands {
            if let Operand::Table(index) = operand {
                return self.array.jump_table(*index);
            }
        }
        panic!(
            "bytecode {} at offset {} has no jump table",
            self.current_opcode(),
            self.current_offset()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::BytecodeArrayBuilder;
    use vesper_core::Value;

    #[test]
    fn test_iteration_order() {
        let mut b = BytecodeArrayBuilder::new(1, 0);
        b.lda_smi(1);
        b.lda_smi(2);
        b.ret();
        let array = b.finish();

        let mut it = BytecodeIterator::new(&array);
        let mut offsets = Vec::new();
        while !it.done() {
            offsets.push(it.current_offset());
            it.advance();
        }
        assert_eq!(offsets, vec![0, 1, 2]);
    }

    #[test]
    fn test_typed_accessors() {
        let mut b = BytecodeArrayBuilder::new(1, 2);
        let idx = b.constant(Constant::Value(Value::smi(9)));
        b.lda_constant(idx);
        b.star(Register::local(1));
        let array = b.finish();

        let mut it = BytecodeIterator::new(&array);
        assert_eq!(it.current_opcode(), Opcode::LdaConstant);
        assert_eq!(it.constant_operand(0), Constant::Value(Value::smi(9)));
        it.advance();
        assert_eq!(it.register_operand(0), Register::local(1));
    }

    #[test]
    #[should_panic(expected = "not a register")]
    fn test_wrong_operand_kind_panics() {
        let mut b = BytecodeArrayBuilder::new(1, 0);
        b.lda_smi(5);
        let array = b.finish();
        let it = BytecodeIterator::new(&array);
        let _ = it.register_operand(0);
    }

    #[test]
    fn test_jump_target() {
        let mut b = BytecodeArrayBuilder::new(1, 0);
        let label = b.new_label();
        b.jump_if_true(label);
        b.lda_null();
        b.bind(label);
        b.ret();
        let array = b.finish();

        let it = BytecodeIterator::new(&array);
        assert_eq!(it.jump_target_offset(), 2);
    }
}
