//! Property access descriptions computed per (shape, name, mode).

use vesper_core::{NameId, ObjectId, ShapeId};
use vesper_runtime::Heap;

/// Prototype chains are short in practice; anything deeper than this is
/// treated as unanalyzable.
const MAX_PROTOTYPE_DEPTH: usize = 16;

/// How an access site touches a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// A read.
    Load,
    /// A write to a possibly existing property.
    Store,
    /// A definition inside an object or array literal.
    StoreInLiteral,
    /// A `key in object` membership probe.
    Has,
}

/// What the optimizer may assume about one (shape, name) access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyAccessInfo {
    /// Nothing can be assumed (access-checked receiver, chain too deep).
    Invalid,
    /// The property does not exist on the shape or its prototypes.
    NotFound,
    /// A data property at a fixed slot.
    DataField {
        /// The prototype holding the property; `None` for an own property.
        holder: Option<ObjectId>,
        /// Slot offset within the holder.
        offset: u16,
    },
}

impl PropertyAccessInfo {
    /// Whether the access resolved to a usable description.
    #[inline]
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

/// Compute the access description for `name` on receivers of `shape`.
///
/// Loads and membership probes walk the prototype chain; stores only
/// consider own properties (a missing own property would transition the
/// shape, which this analysis does not model).
#[must_use]
pub fn compute_access_info(
    heap: &Heap,
    shape: ShapeId,
    name: NameId,
    mode: AccessMode,
) -> PropertyAccessInfo {
    if heap.shape(shape).is_access_check_needed() {
        return PropertyAccessInfo::Invalid;
    }

    if let Some(slot) = heap.shape(shape).own_property(name) {
        return PropertyAccessInfo::DataField {
            holder: None,
            offset: slot.offset,
        };
    }

    match mode {
        AccessMode::Store | AccessMode::StoreInLiteral => PropertyAccessInfo::NotFound,
        AccessMode::Load | AccessMode::Has => {
            let mut current = shape;
            for _ in 0..MAX_PROTOTYPE_DEPTH {
                let Some(prototype) = heap.shape(current).prototype() else {
                    return PropertyAccessInfo::NotFound;
                };
                let prototype_shape = heap.shape_of(prototype);
                if heap.shape(prototype_shape).is_access_check_needed() {
                    return PropertyAccessInfo::Invalid;
                }
                if let Some(slot) = heap.shape(prototype_shape).own_property(name) {
                    return PropertyAccessInfo::DataField {
                        holder: Some(prototype),
                        offset: slot.offset,
                    };
                }
                current = prototype_shape;
            }
            PropertyAccessInfo::Invalid
        }
    }
}
