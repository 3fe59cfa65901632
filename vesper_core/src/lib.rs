//! # Vesper Core
//!
//! Core types shared across all Vesper components:
//!
//! - **Value System**: compact tagged representation of Vesper values
//! - **Heap Handles**: typed identity handles for heap-resident objects
//! - **Error Handling**: result types and error definitions

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod value;

pub use error::{VesperError, VesperResult};
pub use value::{NameId, ObjectId, ShapeId, SharedId, Value, VectorId};

/// Vesper runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
