//! Processed feedback: classified inline-cache observations.
//!
//! Raw slot state is classified once per compilation into one of the
//! structured records below and memoized in the broker cache under its
//! [`FeedbackSource`]. The main-thread reducers consume these records
//! instead of re-reading the live feedback vectors.

use super::access_info::PropertyAccessInfo;
use vesper_compiler::FeedbackSlot;
use vesper_core::{NameId, ObjectId, ShapeId, Value, VectorId};

/// Cache key for one observation site: which vector, which slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedbackSource {
    /// The owning feedback vector.
    pub vector: VectorId,
    /// The slot within it.
    pub slot: FeedbackSlot,
}

impl FeedbackSource {
    /// Create a source key.
    #[inline]
    #[must_use]
    pub const fn new(vector: VectorId, slot: FeedbackSlot) -> Self {
        Self { vector, slot }
    }
}

/// The classified form of one feedback slot.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessedFeedback {
    /// The site never executed (or every observed shape died). The
    /// optimizer refuses to compile through such sites under the
    /// uninitialized bailout.
    Insufficient,
    /// A global load or store site.
    GlobalAccess {
        /// The property cell the site bound to.
        cell: Option<ObjectId>,
        /// The cell's value, when it is known constant.
        constant: Option<Value>,
    },
    /// A named property site with surviving receiver shapes.
    NamedAccess {
        /// The accessed name.
        name: NameId,
        /// Receiver shapes after filtering and forward migration.
        shapes: Vec<ShapeId>,
        /// Per-shape access descriptions, parallel to `shapes`.
        access_infos: Vec<PropertyAccessInfo>,
    },
    /// An element (indexed) site with surviving receiver shapes.
    ElementAccess {
        /// Receiver shapes after filtering and forward migration.
        shapes: Vec<ShapeId>,
    },
    /// The site went megamorphic; no useful information survives.
    Megamorphic,
}

impl ProcessedFeedback {
    /// Whether this record is the insufficient-feedback marker.
    #[inline]
    #[must_use]
    pub fn is_insufficient(&self) -> bool {
        matches!(self, Self::Insufficient)
    }

    /// The constant hint of a global access, if any.
    #[must_use]
    pub fn global_constant(&self) -> Option<Value> {
        match self {
            Self::GlobalAccess { constant, .. } => *constant,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_is_a_map_key() {
        use rustc_hash::FxHashMap;
        let mut map = FxHashMap::default();
        let a = FeedbackSource::new(VectorId::new(1), FeedbackSlot::new(0));
        let b = FeedbackSource::new(VectorId::new(1), FeedbackSlot::new(1));
        map.insert(a, 1);
        map.insert(b, 2);
        assert_eq!(map.get(&a), Some(&1));
        assert_eq!(
            map.get(&FeedbackSource::new(VectorId::new(1), FeedbackSlot::new(1))),
            Some(&2)
        );
    }

    #[test]
    fn test_global_constant_accessor() {
        let feedback = ProcessedFeedback::GlobalAccess {
            cell: Some(ObjectId::new(3)),
            constant: Some(Value::smi(1)),
        };
        assert_eq!(feedback.global_constant(), Some(Value::smi(1)));
        assert_eq!(ProcessedFeedback::Megamorphic.global_constant(), None);
        assert!(ProcessedFeedback::Insufficient.is_insufficient());
    }
}
