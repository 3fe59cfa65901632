//! Per-function bytecode container.

use super::opcode::Opcode;
use super::register::{FeedbackSlot, Register};
use smallvec::SmallVec;
use vesper_core::{NameId, SharedId, Value};

// =============================================================================
// Operands
// =============================================================================

/// One decoded instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// A register reference.
    Reg(Register),
    /// A signed immediate.
    Imm(i32),
    /// An unsigned index (constant pool, feedback cell, context slot).
    Idx(u32),
    /// A feedback-slot index.
    Slot(FeedbackSlot),
    /// A register-range length.
    Count(u32),
    /// A jump target offset.
    Jump(u32),
    /// An index into the array's jump tables.
    Table(u32),
}

/// A decoded instruction: opcode plus operand list.
///
/// One instruction occupies one offset; offsets are indices into the
/// instruction vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// The operation.
    pub opcode: Opcode,
    /// Operands, in signature order.
    pub operands: SmallVec<[Operand; 4]>,
}

impl Instruction {
    /// Create an instruction.
    pub fn new(opcode: Opcode, operands: impl IntoIterator<Item = Operand>) -> Self {
        Self {
            opcode,
            operands: operands.into_iter().collect(),
        }
    }
}

// =============================================================================
// Constant Pool
// =============================================================================

/// An entry in a function's constant pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    /// A plain value (smi, singleton, or heap object).
    Value(Value),
    /// A shared function info, referenced by closure-creating bytecodes.
    FunctionInfo(SharedId),
    /// An interned property name, referenced by named accesses.
    Name(NameId),
}

impl Constant {
    /// The payload as a value, if this entry is one.
    #[inline]
    #[must_use]
    pub const fn as_value(self) -> Option<Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The payload as a name, if this entry is one.
    #[inline]
    #[must_use]
    pub const fn as_name(self) -> Option<NameId> {
        match self {
            Self::Name(n) => Some(n),
            _ => None,
        }
    }

    /// The payload as a function info, if this entry is one.
    #[inline]
    #[must_use]
    pub const fn as_function_info(self) -> Option<SharedId> {
        match self {
            Self::FunctionInfo(s) => Some(s),
            _ => None,
        }
    }
}

// =============================================================================
// Jump Tables and Handler Table
// =============================================================================

/// One case of a switch jump table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpTableEntry {
    /// The small-integer case value.
    pub case_value: i32,
    /// The target offset.
    pub target_offset: u32,
}

/// One exception-handler range: bytecodes in `[start, end)` are covered by
/// the handler beginning at `handler`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerRange {
    /// First covered offset.
    pub start: u32,
    /// One past the last covered offset.
    pub end: u32,
    /// Offset of the handler entry.
    pub handler: u32,
}

// =============================================================================
// Bytecode Array
// =============================================================================

/// The compiled bytecode of one function.
#[derive(Debug, Clone, Default)]
pub struct BytecodeArray {
    pub(super) instructions: Vec<Instruction>,
    pub(super) constant_pool: Vec<Constant>,
    pub(super) jump_tables: Vec<Vec<JumpTableEntry>>,
    pub(super) handler_table: Vec<HandlerRange>,
    pub(super) parameter_count: u16,
    pub(super) register_count: u16,
    pub(super) new_target_register: Option<Register>,
}

impl BytecodeArray {
    /// Number of instructions (one per offset).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the array is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instruction at an offset.
    ///
    /// # Panics
    /// Panics if the offset is out of range.
    #[inline]
    #[must_use]
    pub fn instruction(&self, offset: u32) -> &Instruction {
        &self.instructions[offset as usize]
    }

    /// Incoming parameter count, receiver included.
    #[inline]
    #[must_use]
    pub fn parameter_count(&self) -> u16 {
        self.parameter_count
    }

    /// Local register count.
    #[inline]
    #[must_use]
    pub fn register_count(&self) -> u16 {
        self.register_count
    }

    /// The register receiving the incoming new target (or the resumed
    /// generator object), if the function declares one.
    #[inline]
    #[must_use]
    pub fn new_target_register(&self) -> Option<Register> {
        self.new_target_register
    }

    /// The constant pool entry at an index.
    ///
    /// # Panics
    /// Panics if the index is out of range.
    #[inline]
    #[must_use]
    pub fn constant(&self, index: u32) -> Constant {
        self.constant_pool[index as usize]
    }

    /// The jump table at an index.
    ///
    /// # Panics
    /// Panics if the index is out of range.
    #[inline]
    #[must_use]
    pub fn jump_table(&self, index: u32) -> &[JumpTableEntry] {
        &self.jump_tables[index as usize]
    }

    /// The exception-handler ranges, in emission order.
    #[inline]
    #[must_use]
    pub fn handler_table(&self) -> &[HandlerRange] {
        &self.handler_table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_accessors() {
        let c = Constant::Value(Value::smi(3));
        assert_eq!(c.as_value(), Some(Value::smi(3)));
        assert_eq!(c.as_name(), None);

        let n = Constant::Name(NameId::new(1));
        assert_eq!(n.as_name(), Some(NameId::new(1)));
        assert_eq!(n.as_function_info(), None);

        let f = Constant::FunctionInfo(SharedId::new(2));
        assert_eq!(f.as_function_info(), Some(SharedId::new(2)));
        assert_eq!(f.as_value(), None);
    }

    #[test]
    fn test_instruction_new() {
        let instr = Instruction::new(
            Opcode::Mov,
            [
                Operand::Reg(Register::local(0)),
                Operand::Reg(Register::local(1)),
            ],
        );
        assert_eq!(instr.opcode, Opcode::Mov);
        assert_eq!(instr.operands.len(), 2);
    }
}
