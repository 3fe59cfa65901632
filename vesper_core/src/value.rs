//! Vesper value representation and typed heap handles.
//!
//! The background compiler never executes code, so values here are
//! *identities*, not live data: a [`Value`] either encodes an immediate
//! (small integer, boolean, one of the singletons) or refers to a heap
//! object by handle. Two values are equal exactly when they denote the
//! same runtime identity, which is the comparison the optimizer's
//! speculation machinery relies on.

use std::fmt;

// =============================================================================
// Typed Heap Handles
// =============================================================================

macro_rules! define_handle {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Create a handle from a raw index.
            #[inline]
            #[must_use]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            /// Raw index of this handle.
            #[inline]
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_handle!(
    /// Handle to a heap object (function, array, cell, ...).
    ObjectId,
    "o"
);
define_handle!(
    /// Handle to a shape (hidden class) describing an object's layout.
    ShapeId,
    "s"
);
define_handle!(
    /// Handle to a shared function info (code + metadata, closure-independent).
    SharedId,
    "f"
);
define_handle!(
    /// Handle to a feedback vector (per-closure inline-cache storage).
    VectorId,
    "v"
);
define_handle!(
    /// Handle to an interned property name.
    NameId,
    "n"
);

// =============================================================================
// Value
// =============================================================================

/// A Vesper value as seen by the background compiler.
///
/// Immediates are stored inline; everything heap-allocated is an
/// [`ObjectId`] handle. Equality and hashing are identity-based, so
/// values can serve directly as elements of hint sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    /// The `undefined` singleton.
    Undefined,
    /// The `null` singleton.
    Null,
    /// The hole marker (uninitialized binding).
    TheHole,
    /// A boolean.
    Bool(bool),
    /// A small integer.
    Smi(i32),
    /// A heap object, by identity.
    Object(ObjectId),
}

impl Value {
    /// Create a small-integer value.
    #[inline]
    #[must_use]
    pub const fn smi(value: i32) -> Self {
        Self::Smi(value)
    }

    /// Create a heap-object value.
    #[inline]
    #[must_use]
    pub const fn object(id: ObjectId) -> Self {
        Self::Object(id)
    }

    /// Whether this is a heap object.
    #[inline]
    #[must_use]
    pub const fn is_object(self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Whether this is a small integer.
    #[inline]
    #[must_use]
    pub const fn is_smi(self) -> bool {
        matches!(self, Self::Smi(_))
    }

    /// The heap handle, if this is a heap object.
    #[inline]
    #[must_use]
    pub const fn as_object(self) -> Option<ObjectId> {
        match self {
            Self::Object(id) => Some(id),
            _ => None,
        }
    }

    /// The integer payload, if this is a small integer.
    #[inline]
    #[must_use]
    pub const fn as_smi(self) -> Option<i32> {
        match self {
            Self::Smi(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::TheHole => write!(f, "<hole>"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Smi(v) => write!(f, "{v}"),
            Self::Object(id) => write!(f, "{id}"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_identity_equality() {
        assert_eq!(Value::smi(7), Value::smi(7));
        assert_ne!(Value::smi(7), Value::smi(8));
        assert_eq!(
            Value::object(ObjectId::new(3)),
            Value::object(ObjectId::new(3))
        );
        assert_ne!(
            Value::object(ObjectId::new(3)),
            Value::object(ObjectId::new(4))
        );
        assert_ne!(Value::Undefined, Value::Null);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::smi(-1).as_smi(), Some(-1));
        assert_eq!(Value::smi(-1).as_object(), None);
        assert_eq!(
            Value::object(ObjectId::new(9)).as_object(),
            Some(ObjectId::new(9))
        );
        assert!(Value::object(ObjectId::new(0)).is_object());
        assert!(!Value::Undefined.is_object());
    }

    #[test]
    fn test_handles_usable_as_keys() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(ShapeId::new(1));
        set.insert(ShapeId::new(1));
        set.insert(ShapeId::new(2));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Undefined.to_string(), "undefined");
        assert_eq!(Value::smi(42).to_string(), "42");
        assert_eq!(Value::object(ObjectId::new(5)).to_string(), "o5");
        assert_eq!(NameId::new(2).to_string(), "n2");
    }
}
