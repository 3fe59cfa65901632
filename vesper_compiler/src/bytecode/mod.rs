//! Bytecode instruction set and containers.

mod array;
mod builder;
mod iterator;
mod opcode;
mod register;

pub use array::{BytecodeArray, Constant, HandlerRange, Instruction, JumpTableEntry, Operand};
pub use builder::{BytecodeArrayBuilder, Label};
pub use iterator::BytecodeIterator;
pub use opcode::Opcode;
pub use register::{FeedbackSlot, Register};
