//! Error types and result definitions for Vesper.
//!
//! The background compiler distinguishes two failure classes: *analysis
//! errors* (malformed bytecode, an opcode that must never reach an
//! analysis, an operand decoding mismatch) which abort the current
//! compilation and propagate to the caller, and ordinary degraded
//! outcomes (insufficient feedback, megamorphic sites) which are not
//! errors at all and never surface here.

use thiserror::Error;

/// The unified result type used throughout Vesper.
pub type VesperResult<T> = Result<T, VesperError>;

/// Error type covering the compilation-side failure conditions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VesperError {
    /// A bytecode that is never valid input to an analysis was encountered.
    #[error("unexpected bytecode {opcode} at offset {offset}")]
    UnexpectedBytecode {
        /// Printable opcode name.
        opcode: &'static str,
        /// Offset at which it appeared.
        offset: u32,
    },

    /// A function expected to carry bytecode has none.
    #[error("missing bytecode for function '{name}'")]
    MissingBytecode {
        /// Function name.
        name: String,
    },

    /// Internal invariant violation (a bug, not a runtime condition).
    #[error("internal error: {message}")]
    Internal {
        /// Error description.
        message: String,
    },
}

impl VesperError {
    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_bytecode_display() {
        let err = VesperError::UnexpectedBytecode {
            opcode: "Illegal",
            offset: 12,
        };
        assert_eq!(err.to_string(), "unexpected bytecode Illegal at offset 12");
    }

    #[test]
    fn test_internal_error() {
        let err = VesperError::internal("environment layout mismatch");
        assert_eq!(
            err.to_string(),
            "internal error: environment layout mismatch"
        );
    }

    #[test]
    fn test_result_alias() {
        let ok: VesperResult<u32> = Ok(1);
        assert_eq!(ok.unwrap(), 1);
    }
}
