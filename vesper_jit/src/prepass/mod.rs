//! The background serialization pre-pass.
//!
//! One [`BackgroundSerializer`] per top-level function compile walks the
//! function's bytecode abstractly, propagating [`Hints`] through an
//! [`Environment`] and recursing into feasible callees, while asking the
//! broker to pre-materialize every heap fact the main-thread reducers
//! will need.

mod disposition;
mod environment;
mod hints;
mod serializer;

pub use disposition::{Disposition, disposition};
pub use environment::Environment;
pub use hints::{CompilationSubject, FunctionBlueprint, Hints, HintsVector};
pub use serializer::BackgroundSerializer;
