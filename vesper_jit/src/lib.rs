//! Optimizing JIT tier for Vesper.
//!
//! This crate hosts the pieces of the optimizing compiler that run off the
//! main thread, ahead of graph construction:
//!
//! - The **heap broker**: immutable snapshots of heap state, the processed
//!   feedback cache, and the serialized-artifact ledger shared by all
//!   concurrent compilations.
//! - The **background serialization pre-pass**: an abstract walk over a
//!   function's bytecode that propagates hints (constants, shapes, function
//!   blueprints) and pre-materializes every heap fact the main-thread
//!   reducers will later need, so they never touch the live heap.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod broker;
pub mod flags;
pub mod prepass;

pub use broker::{
    AccessMode, Artifact, FeedbackSource, HeapBroker, ProcessedFeedback, PropertyAccessInfo,
};
pub use flags::SerializerFlags;
pub use prepass::{BackgroundSerializer, CompilationSubject, FunctionBlueprint, Hints};
