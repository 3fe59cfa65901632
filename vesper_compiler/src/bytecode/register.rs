//! Register references and feedback slot indices.

use std::fmt;

// =============================================================================
// Register
// =============================================================================

/// A reference to one interpreter register.
///
/// The interpreter frame exposes four address spaces: the incoming
/// parameters (parameter 0 is the receiver), the function's local
/// registers, and two pseudo-registers for the current context and the
/// currently executing closure. Bytecode operands refer to any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// An incoming parameter. Index 0 is the receiver.
    Parameter(u16),
    /// A local register.
    Local(u16),
    /// The current-context pseudo-register.
    Context,
    /// The function-closure pseudo-register.
    Closure,
}

impl Register {
    /// Create a parameter register. Index 0 is the receiver.
    #[inline]
    #[must_use]
    pub const fn parameter(index: u16) -> Self {
        Self::Parameter(index)
    }

    /// Create a local register.
    #[inline]
    #[must_use]
    pub const fn local(index: u16) -> Self {
        Self::Local(index)
    }

    /// The receiver parameter.
    #[inline]
    #[must_use]
    pub const fn receiver() -> Self {
        Self::Parameter(0)
    }

    /// Whether this is a parameter register.
    #[inline]
    #[must_use]
    pub const fn is_parameter(self) -> bool {
        matches!(self, Self::Parameter(_))
    }

    /// Whether this is the current-context pseudo-register.
    #[inline]
    #[must_use]
    pub const fn is_context(self) -> bool {
        matches!(self, Self::Context)
    }

    /// Whether this is the function-closure pseudo-register.
    #[inline]
    #[must_use]
    pub const fn is_closure(self) -> bool {
        matches!(self, Self::Closure)
    }

    /// The parameter index, if this is a parameter register.
    #[inline]
    #[must_use]
    pub const fn parameter_index(self) -> Option<u16> {
        match self {
            Self::Parameter(i) => Some(i),
            _ => None,
        }
    }

    /// The local index, if this is a local register.
    #[inline]
    #[must_use]
    pub const fn local_index(self) -> Option<u16> {
        match self {
            Self::Local(i) => Some(i),
            _ => None,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parameter(i) => write!(f, "a{i}"),
            Self::Local(i) => write!(f, "r{i}"),
            Self::Context => write!(f, "<context>"),
            Self::Closure => write!(f, "<closure>"),
        }
    }
}

// =============================================================================
// Feedback Slot
// =============================================================================

/// Index of one slot in a function's feedback vector.
///
/// Slot `INVALID` marks operations compiled without a feedback site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct FeedbackSlot(pub u32);

impl FeedbackSlot {
    /// The invalid slot sentinel.
    pub const INVALID: FeedbackSlot = FeedbackSlot(u32::MAX);

    /// Create a slot index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Whether this slot refers to a real feedback site.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }

    /// Raw slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FeedbackSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            write!(f, "#invalid")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_kinds() {
        assert!(Register::parameter(0).is_parameter());
        assert_eq!(Register::receiver(), Register::Parameter(0));
        assert_eq!(Register::local(3).local_index(), Some(3));
        assert_eq!(Register::local(3).parameter_index(), None);
        assert!(Register::Context.is_context());
        assert!(Register::Closure.is_closure());
    }

    #[test]
    fn test_register_display() {
        assert_eq!(Register::parameter(1).to_string(), "a1");
        assert_eq!(Register::local(4).to_string(), "r4");
        assert_eq!(Register::Closure.to_string(), "<closure>");
    }

    #[test]
    fn test_feedback_slot_validity() {
        assert!(FeedbackSlot::new(0).is_valid());
        assert!(!FeedbackSlot::INVALID.is_valid());
        assert_eq!(FeedbackSlot::new(7).index(), 7);
    }
}
