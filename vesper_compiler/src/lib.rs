//! Bytecode layer of the Vesper compiler.
//!
//! Vesper functions compile to a register-plus-accumulator bytecode that is
//! both executed by the interpreter and consumed abstractly by the optimizing
//! tiers. This crate defines the instruction set, the per-function
//! [`BytecodeArray`](bytecode::BytecodeArray) container, the offset-ordered
//! iterator used by every consumer, and a builder for emitting arrays.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod bytecode;

pub use bytecode::{
    BytecodeArray, BytecodeArrayBuilder, BytecodeIterator, Constant, FeedbackSlot, HandlerRange,
    Instruction, JumpTableEntry, Label, Opcode, Operand, Register,
};
