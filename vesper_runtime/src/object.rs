//! Heap object representation.

use vesper_core::{NameId, ObjectId, ShapeId, SharedId, Value, VectorId};

/// One heap object: a shape plus kind-specific payload.
#[derive(Debug, Clone)]
pub struct HeapObject {
    /// The object's hidden class.
    pub shape: ShapeId,
    /// Kind-specific payload.
    pub kind: ObjectKind,
}

impl HeapObject {
    /// Create an object of the given shape and kind.
    #[must_use]
    pub fn new(shape: ShapeId, kind: ObjectKind) -> Self {
        Self { shape, kind }
    }

    /// Whether this object is a function closure.
    #[inline]
    #[must_use]
    pub fn is_function(&self) -> bool {
        matches!(self.kind, ObjectKind::Function { .. })
    }

    /// The closure payload, if this object is a function.
    #[inline]
    #[must_use]
    pub fn as_function(&self) -> Option<(SharedId, Option<VectorId>)> {
        match self.kind {
            ObjectKind::Function { shared, feedback } => Some((shared, feedback)),
            _ => None,
        }
    }
}

/// Kind-specific object payload.
#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// An ordinary object; properties live in shape-described slots.
    Plain,
    /// A function closure: shared code plus this closure's feedback vector.
    Function {
        /// The closure-independent half.
        shared: SharedId,
        /// Feedback vector, present once the closure has run.
        feedback: Option<VectorId>,
    },
    /// An array with element backing storage.
    Array {
        /// Element values, indexed densely.
        elements: Vec<Value>,
        /// Whether the backing store is copy-on-write.
        cow: bool,
    },
    /// A typed array over an external buffer.
    TypedArray {
        /// Element count.
        length: u32,
    },
    /// A promise.
    Promise,
    /// A global-variable cell.
    PropertyCell {
        /// The variable's name.
        name: NameId,
        /// The cell's current value.
        value: Value,
        /// Whether the cell has only ever held this value.
        constant: bool,
    },
    /// The global proxy receiver.
    GlobalProxy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_payload() {
        let obj = HeapObject::new(
            ShapeId::new(0),
            ObjectKind::Function {
                shared: SharedId::new(1),
                feedback: Some(VectorId::new(2)),
            },
        );
        assert!(obj.is_function());
        assert_eq!(
            obj.as_function(),
            Some((SharedId::new(1), Some(VectorId::new(2))))
        );
    }

    #[test]
    fn test_non_function_payload() {
        let obj = HeapObject::new(ShapeId::new(0), ObjectKind::Promise);
        assert!(!obj.is_function());
        assert_eq!(obj.as_function(), None);
    }
}
