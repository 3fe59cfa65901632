//! Builder for bytecode arrays with label resolution.
//!
//! Used by the compiler back end and by tests that need hand-written
//! bytecode. Forward jumps take a [`Label`] that is patched when bound.

use super::array::{BytecodeArray, Constant, HandlerRange, Instruction, JumpTableEntry, Operand};
use super::opcode::Opcode;
use super::register::{FeedbackSlot, Register};

/// A jump target to be resolved by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// A forward reference awaiting label resolution.
#[derive(Debug)]
enum PendingRef {
    /// Jump operand `operand_index` of instruction `instruction_index`.
    Jump {
        instruction_index: usize,
        operand_index: usize,
        label: Label,
    },
    /// Entry `entry_index` of jump table `table_index`.
    TableEntry {
        table_index: usize,
        entry_index: usize,
        label: Label,
    },
}

/// Builder for [`BytecodeArray`] values.
#[derive(Debug, Default)]
pub struct BytecodeArrayBuilder {
    instructions: Vec<Instruction>,
    constant_pool: Vec<Constant>,
    jump_tables: Vec<Vec<JumpTableEntry>>,
    handler_table: Vec<HandlerRange>,
    parameter_count: u16,
    register_count: u16,
    new_target_register: Option<Register>,
    labels: Vec<Option<u32>>,
    pending: Vec<PendingRef>,
}

impl BytecodeArrayBuilder {
    /// Create a builder for a function with the given parameter count
    /// (receiver included) and local register count.
    #[must_use]
    pub fn new(parameter_count: u16, register_count: u16) -> Self {
        Self {
            parameter_count,
            register_count,
            ..Self::default()
        }
    }

    /// Declare the register receiving the incoming new target.
    pub fn with_new_target_register(mut self, register: Register) -> Self {
        self.new_target_register = Some(register);
        self
    }

    /// Intern a constant pool entry, returning its index.
    pub fn constant(&mut self, constant: Constant) -> u32 {
        if let Some(existing) = self.constant_pool.iter().position(|c| *c == constant) {
            return existing as u32;
        }
        self.constant_pool.push(constant);
        (self.constant_pool.len() - 1) as u32
    }

    /// The offset the next emitted instruction will occupy.
    #[must_use]
    pub fn current_offset(&self) -> u32 {
        self.instructions.len() as u32
    }

    /// Allocate an unbound label.
    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Bind a label to the current offset.
    pub fn bind(&mut self, label: Label) {
        assert!(self.labels[label.0].is_none(), "label bound twice");
        self.labels[label.0] = Some(self.current_offset());
    }

    /// Record an exception-handler range over bound labels.
    pub fn exception_handler(&mut self, start: Label, end: Label, handler: Label) {
        let resolve = |l: Label, labels: &[Option<u32>]| {
            labels[l.0].expect("handler range labels must be bound")
        };
        let range = HandlerRange {
            start: resolve(start, &self.labels),
            end: resolve(end, &self.labels),
            handler: resolve(handler, &self.labels),
        };
        self.handler_table.push(range);
    }

    /// Emit a raw instruction.
    pub fn emit(&mut self, opcode: Opcode, operands: impl IntoIterator<Item = Operand>) {
        self.instructions.push(Instruction::new(opcode, operands));
    }

    fn emit_jump(&mut self, opcode: Opcode, label: Label, extra: impl IntoIterator<Item = Operand>) {
        let mut operands: Vec<Operand> = extra.into_iter().collect();
        let operand_index = operands.len();
        // Bound labels (back edges) resolve immediately.
        operands.push(Operand::Jump(self.labels[label.0].unwrap_or(u32::MAX)));
        self.instructions.push(Instruction::new(opcode, operands));
        if self.labels[label.0].is_none() {
            self.pending.push(PendingRef::Jump {
                instruction_index: self.instructions.len() - 1,
                operand_index,
                label,
            });
        }
    }

    /// Finish the array, patching all forward references.
    ///
    /// # Panics
    /// Panics if any referenced label was never bound.
    #[must_use]
    pub fn finish(mut self) -> BytecodeArray {
        for pending in self.pending.drain(..) {
            match pending {
                PendingRef::Jump {
                    instruction_index,
                    operand_index,
                    label,
                } => {
                    let target = self.labels[label.0].expect("jump label never bound");
                    self.instructions[instruction_index].operands[operand_index] =
                        Operand::Jump(target);
                }
                PendingRef::TableEntry {
                    table_index,
                    entry_index,
                    label,
                } => {
                    let target = self.labels[label.0].expect("switch label never bound");
                    self.jump_tables[table_index][entry_index].target_offset = target;
                }
            }
        }
        BytecodeArray {
            instructions: self.instructions,
            constant_pool: self.constant_pool,
            jump_tables: self.jump_tables,
            handler_table: self.handler_table,
            parameter_count: self.parameter_count,
            register_count: self.register_count,
            new_target_register: self.new_target_register,
        }
    }

    // =========================================================================
    // Accumulator loads
    // =========================================================================

    /// Emit `LdaUndefined`.
    pub fn lda_undefined(&mut self) {
        self.emit(Opcode::LdaUndefined, []);
    }

    /// Emit `LdaNull`.
    pub fn lda_null(&mut self) {
        self.emit(Opcode::LdaNull, []);
    }

    /// Emit `LdaTheHole`.
    pub fn lda_the_hole(&mut self) {
        self.emit(Opcode::LdaTheHole, []);
    }

    /// Emit `LdaTrue`.
    pub fn lda_true(&mut self) {
        self.emit(Opcode::LdaTrue, []);
    }

    /// Emit `LdaFalse`.
    pub fn lda_false(&mut self) {
        self.emit(Opcode::LdaFalse, []);
    }

    /// Emit `LdaZero`.
    pub fn lda_zero(&mut self) {
        self.emit(Opcode::LdaZero, []);
    }

    /// Emit `LdaSmi`.
    pub fn lda_smi(&mut self, value: i32) {
        self.emit(Opcode::LdaSmi, [Operand::Imm(value)]);
    }

    /// Emit `LdaConstant`.
    pub fn lda_constant(&mut self, pool_index: u32) {
        self.emit(Opcode::LdaConstant, [Operand::Idx(pool_index)]);
    }

    // =========================================================================
    // Moves
    // =========================================================================

    /// Emit `Ldar`.
    pub fn ldar(&mut self, source: Register) {
        self.emit(Opcode::Ldar, [Operand::Reg(source)]);
    }

    /// Emit `Star`.
    pub fn star(&mut self, destination: Register) {
        self.emit(Opcode::Star, [Operand::Reg(destination)]);
    }

    /// Emit `Mov`.
    pub fn mov(&mut self, source: Register, destination: Register) {
        self.emit(Opcode::Mov, [Operand::Reg(source), Operand::Reg(destination)]);
    }

    // =========================================================================
    // Globals and properties
    // =========================================================================

    /// Emit `LdaGlobal`.
    pub fn lda_global(&mut self, name_index: u32, slot: FeedbackSlot) {
        self.emit(
            Opcode::LdaGlobal,
            [Operand::Idx(name_index), Operand::Slot(slot)],
        );
    }

    /// Emit `StaGlobal`.
    pub fn sta_global(&mut self, name_index: u32, slot: FeedbackSlot) {
        self.emit(
            Opcode::StaGlobal,
            [Operand::Idx(name_index), Operand::Slot(slot)],
        );
    }

    /// Emit `LdaNamedProperty`.
    pub fn lda_named_property(&mut self, object: Register, name_index: u32, slot: FeedbackSlot) {
        self.emit(
            Opcode::LdaNamedProperty,
            [
                Operand::Reg(object),
                Operand::Idx(name_index),
                Operand::Slot(slot),
            ],
        );
    }

    /// Emit `StaNamedProperty`.
    pub fn sta_named_property(&mut self, object: Register, name_index: u32, slot: FeedbackSlot) {
        self.emit(
            Opcode::StaNamedProperty,
            [
                Operand::Reg(object),
                Operand::Idx(name_index),
                Operand::Slot(slot),
            ],
        );
    }

    /// Emit `StaNamedOwnProperty`.
    pub fn sta_named_own_property(
        &mut self,
        object: Register,
        name_index: u32,
        slot: FeedbackSlot,
    ) {
        self.emit(
            Opcode::StaNamedOwnProperty,
            [
                Operand::Reg(object),
                Operand::Idx(name_index),
                Operand::Slot(slot),
            ],
        );
    }

    /// Emit `LdaKeyedProperty`; the key is in the accumulator.
    pub fn lda_keyed_property(&mut self, object: Register, slot: FeedbackSlot) {
        self.emit(
            Opcode::LdaKeyedProperty,
            [Operand::Reg(object), Operand::Slot(slot)],
        );
    }

    /// Emit `StaKeyedProperty`; the stored value is in the accumulator.
    pub fn sta_keyed_property(&mut self, object: Register, key: Register, slot: FeedbackSlot) {
        self.emit(
            Opcode::StaKeyedProperty,
            [Operand::Reg(object), Operand::Reg(key), Operand::Slot(slot)],
        );
    }

    /// Emit `StaInArrayLiteral`.
    pub fn sta_in_array_literal(&mut self, array: Register, index: Register, slot: FeedbackSlot) {
        self.emit(
            Opcode::StaInArrayLiteral,
            [
                Operand::Reg(array),
                Operand::Reg(index),
                Operand::Slot(slot),
            ],
        );
    }

    /// Emit `TestIn`; the object is in the accumulator.
    pub fn test_in(&mut self, key: Register, slot: FeedbackSlot) {
        self.emit(Opcode::TestIn, [Operand::Reg(key), Operand::Slot(slot)]);
    }

    // =========================================================================
    // Closures, calls, construction
    // =========================================================================

    /// Emit `CreateClosure`.
    pub fn create_closure(&mut self, function_info_index: u32, cell_index: u32) {
        self.emit(
            Opcode::CreateClosure,
            [Operand::Idx(function_info_index), Operand::Idx(cell_index)],
        );
    }

    /// Emit `GetSuperConstructor`.
    pub fn get_super_constructor(&mut self, destination: Register) {
        self.emit(Opcode::GetSuperConstructor, [Operand::Reg(destination)]);
    }

    /// Emit `CallProperty0`.
    pub fn call_property0(&mut self, callee: Register, receiver: Register, slot: FeedbackSlot) {
        self.emit(
            Opcode::CallProperty0,
            [
                Operand::Reg(callee),
                Operand::Reg(receiver),
                Operand::Slot(slot),
            ],
        );
    }

    /// Emit `CallProperty1`.
    pub fn call_property1(
        &mut self,
        callee: Register,
        receiver: Register,
        arg0: Register,
        slot: FeedbackSlot,
    ) {
        self.emit(
            Opcode::CallProperty1,
            [
                Operand::Reg(callee),
                Operand::Reg(receiver),
                Operand::Reg(arg0),
                Operand::Slot(slot),
            ],
        );
    }

    /// Emit `CallProperty2`.
    pub fn call_property2(
        &mut self,
        callee: Register,
        receiver: Register,
        arg0: Register,
        arg1: Register,
        slot: FeedbackSlot,
    ) {
        self.emit(
            Opcode::CallProperty2,
            [
                Operand::Reg(callee),
                Operand::Reg(receiver),
                Operand::Reg(arg0),
                Operand::Reg(arg1),
                Operand::Slot(slot),
            ],
        );
    }

    /// Emit `CallUndefinedReceiver0`.
    pub fn call_undefined_receiver0(&mut self, callee: Register, slot: FeedbackSlot) {
        self.emit(
            Opcode::CallUndefinedReceiver0,
            [Operand::Reg(callee), Operand::Slot(slot)],
        );
    }

    /// Emit `CallUndefinedReceiver1`.
    pub fn call_undefined_receiver1(
        &mut self,
        callee: Register,
        arg0: Register,
        slot: FeedbackSlot,
    ) {
        self.emit(
            Opcode::CallUndefinedReceiver1,
            [
                Operand::Reg(callee),
                Operand::Reg(arg0),
                Operand::Slot(slot),
            ],
        );
    }

    /// Emit `CallUndefinedReceiver2`.
    pub fn call_undefined_receiver2(
        &mut self,
        callee: Register,
        arg0: Register,
        arg1: Register,
        slot: FeedbackSlot,
    ) {
        self.emit(
            Opcode::CallUndefinedReceiver2,
            [
                Operand::Reg(callee),
                Operand::Reg(arg0),
                Operand::Reg(arg1),
                Operand::Slot(slot),
            ],
        );
    }

    /// Emit a variable-arity call (`CallAnyReceiver`, `CallProperty`,
    /// `CallUndefinedReceiver`, or `CallWithSpread`).
    pub fn call_var_args(
        &mut self,
        opcode: Opcode,
        callee: Register,
        first_arg: Register,
        arg_count: u32,
        slot: FeedbackSlot,
    ) {
        self.emit(
            opcode,
            [
                Operand::Reg(callee),
                Operand::Reg(first_arg),
                Operand::Count(arg_count),
                Operand::Slot(slot),
            ],
        );
    }

    /// Emit `Construct`; the new target is in the accumulator.
    pub fn construct(
        &mut self,
        callee: Register,
        first_arg: Register,
        arg_count: u32,
        slot: FeedbackSlot,
    ) {
        self.emit(
            Opcode::Construct,
            [
                Operand::Reg(callee),
                Operand::Reg(first_arg),
                Operand::Count(arg_count),
                Operand::Slot(slot),
            ],
        );
    }

    /// Emit `ConstructWithSpread`.
    pub fn construct_with_spread(
        &mut self,
        callee: Register,
        first_arg: Register,
        arg_count: u32,
        slot: FeedbackSlot,
    ) {
        self.emit(
            Opcode::ConstructWithSpread,
            [
                Operand::Reg(callee),
                Operand::Reg(first_arg),
                Operand::Count(arg_count),
                Operand::Slot(slot),
            ],
        );
    }

    // =========================================================================
    // Control flow
    // =========================================================================

    /// Emit an unconditional `Jump`.
    pub fn jump(&mut self, label: Label) {
        self.emit_jump(Opcode::Jump, label, []);
    }

    /// Emit a `JumpLoop` back edge to an already-bound label.
    pub fn jump_loop(&mut self, label: Label) {
        assert!(self.labels[label.0].is_some(), "loop header must be bound");
        self.emit_jump(Opcode::JumpLoop, label, []);
    }

    /// Emit `JumpIfTrue`.
    pub fn jump_if_true(&mut self, label: Label) {
        self.emit_jump(Opcode::JumpIfTrue, label, []);
    }

    /// Emit `JumpIfFalse`.
    pub fn jump_if_false(&mut self, label: Label) {
        self.emit_jump(Opcode::JumpIfFalse, label, []);
    }

    /// Emit `JumpIfToBooleanTrue`.
    pub fn jump_if_to_boolean_true(&mut self, label: Label) {
        self.emit_jump(Opcode::JumpIfToBooleanTrue, label, []);
    }

    /// Emit `JumpIfNull`.
    pub fn jump_if_null(&mut self, label: Label) {
        self.emit_jump(Opcode::JumpIfNull, label, []);
    }

    /// Emit `JumpIfUndefined`.
    pub fn jump_if_undefined(&mut self, label: Label) {
        self.emit_jump(Opcode::JumpIfUndefined, label, []);
    }

    /// Emit `SwitchOnSmiNoFeedback` over `(case value, target)` pairs.
    pub fn switch_on_smi(&mut self, cases: impl IntoIterator<Item = (i32, Label)>) {
        let table_index = self.jump_tables.len();
        let mut table = Vec::new();
        for (entry_index, (case_value, label)) in cases.into_iter().enumerate() {
            let target_offset = self.labels[label.0].unwrap_or(u32::MAX);
            table.push(JumpTableEntry {
                case_value,
                target_offset,
            });
            if self.labels[label.0].is_none() {
                self.pending.push(PendingRef::TableEntry {
                    table_index,
                    entry_index,
                    label,
                });
            }
        }
        self.jump_tables.push(table);
        self.emit(
            Opcode::SwitchOnSmiNoFeedback,
            [Operand::Table(table_index as u32)],
        );
    }

    /// Emit `Return`.
    pub fn ret(&mut self) {
        self.emit(Opcode::Return, []);
    }

    /// Emit `Throw`.
    pub fn throw(&mut self) {
        self.emit(Opcode::Throw, []);
    }
}
