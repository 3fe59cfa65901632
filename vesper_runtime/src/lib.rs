//! Heap object model for the Vesper runtime.
//!
//! This crate defines the runtime structures that the optimizing compiler
//! observes: shapes (hidden classes), heap objects, shared function infos,
//! and per-closure feedback vectors, all held in a [`heap::Heap`] arena
//! addressed by the typed handles from `vesper_core`. During background
//! compilation the heap is shared immutably; only the interpreter tier
//! mutates it.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod feedback;
pub mod function;
pub mod heap;
pub mod object;
pub mod shape;

pub use feedback::{
    FeedbackCell, FeedbackCellValue, FeedbackNexus, FeedbackSlotData, FeedbackVector, IcState,
    KeyKind,
};
pub use function::{BuiltinId, FunctionTemplate, SharedFunctionInfo};
pub use heap::{Heap, NativeContext};
pub use object::{HeapObject, ObjectKind};
pub use shape::{PropertyFlags, Shape, ShapeFlags, SlotInfo};
