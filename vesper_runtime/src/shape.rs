//! Shapes: hidden classes describing object layout.
//!
//! Every heap object carries a shape. Shapes record the prototype link,
//! the own-property layout, and the transition bookkeeping the optimizer
//! cares about: a deprecated shape has been superseded by a migrated
//! descendant, and an abandoned-prototype shape belonged to an object
//! that stopped being used as a prototype.

use bitflags::bitflags;
use vesper_core::{NameId, ObjectId, ShapeId};

bitflags! {
    /// Shape-level predicate bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ShapeFlags: u8 {
        /// Instances can be called.
        const CALLABLE = 1 << 0;
        /// Instances can be used as a constructor.
        const CONSTRUCTOR = 1 << 1;
        /// The shape was deprecated by a layout migration.
        const DEPRECATED = 1 << 2;
        /// The shape's object was abandoned as a prototype.
        const ABANDONED_PROTOTYPE = 1 << 3;
        /// Receivers of this shape need a host access check.
        const ACCESS_CHECK_NEEDED = 1 << 4;
        /// Instances are promises.
        const PROMISE = 1 << 5;
    }
}

bitflags! {
    /// Per-property attribute bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PropertyFlags: u8 {
        /// Property can be written.
        const WRITABLE = 1 << 0;
        /// Property shows up in enumeration.
        const ENUMERABLE = 1 << 1;
        /// Property can be reconfigured or deleted.
        const CONFIGURABLE = 1 << 2;
        /// Plain data property (not an accessor pair).
        const DATA = 1 << 3;
    }
}

impl Default for PropertyFlags {
    #[inline]
    fn default() -> Self {
        Self::WRITABLE | Self::ENUMERABLE | Self::CONFIGURABLE | Self::DATA
    }
}

/// Location and attributes of one own property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInfo {
    /// Offset in the object's property storage.
    pub offset: u16,
    /// Property attributes.
    pub flags: PropertyFlags,
}

impl SlotInfo {
    /// Create slot info for a data property at an offset.
    #[inline]
    #[must_use]
    pub fn data(offset: u16) -> Self {
        Self {
            offset,
            flags: PropertyFlags::default(),
        }
    }

    /// Whether this is a plain data property.
    #[inline]
    #[must_use]
    pub const fn is_data(&self) -> bool {
        self.flags.contains(PropertyFlags::DATA)
    }
}

/// A hidden class: prototype link, own-property layout, migration state.
#[derive(Debug, Clone, Default)]
pub struct Shape {
    prototype: Option<ObjectId>,
    flags: ShapeFlags,
    migrated_to: Option<ShapeId>,
    properties: Vec<(NameId, SlotInfo)>,
}

impl Shape {
    /// Create a shape with the given flags and no properties.
    #[must_use]
    pub fn new(flags: ShapeFlags) -> Self {
        Self {
            flags,
            ..Self::default()
        }
    }

    /// Set the prototype link.
    #[must_use]
    pub fn with_prototype(mut self, prototype: ObjectId) -> Self {
        self.prototype = Some(prototype);
        self
    }

    /// Append an own property at the next storage offset.
    #[must_use]
    pub fn with_property(mut self, name: NameId) -> Self {
        let offset = self.properties.len() as u16;
        self.properties.push((name, SlotInfo::data(offset)));
        self
    }

    /// Mark this shape as deprecated, superseded by `target`.
    #[must_use]
    pub fn deprecated_to(mut self, target: ShapeId) -> Self {
        self.flags |= ShapeFlags::DEPRECATED;
        self.migrated_to = Some(target);
        self
    }

    /// The prototype object, if any.
    #[inline]
    #[must_use]
    pub fn prototype(&self) -> Option<ObjectId> {
        self.prototype
    }

    /// The migrated descendant, if this shape was deprecated.
    #[inline]
    #[must_use]
    pub fn migrated_to(&self) -> Option<ShapeId> {
        self.migrated_to
    }

    /// Shape flag bits.
    #[inline]
    #[must_use]
    pub fn flags(&self) -> ShapeFlags {
        self.flags
    }

    /// Whether instances are callable.
    #[inline]
    #[must_use]
    pub fn is_callable(&self) -> bool {
        self.flags.contains(ShapeFlags::CALLABLE)
    }

    /// Whether instances are constructors.
    #[inline]
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.flags.contains(ShapeFlags::CONSTRUCTOR)
    }

    /// Whether this shape has been deprecated by a migration.
    #[inline]
    #[must_use]
    pub fn is_deprecated(&self) -> bool {
        self.flags.contains(ShapeFlags::DEPRECATED)
    }

    /// Whether the shape's object was abandoned as a prototype.
    #[inline]
    #[must_use]
    pub fn is_abandoned_prototype(&self) -> bool {
        self.flags.contains(ShapeFlags::ABANDONED_PROTOTYPE)
    }

    /// Whether receivers need a host access check.
    #[inline]
    #[must_use]
    pub fn is_access_check_needed(&self) -> bool {
        self.flags.contains(ShapeFlags::ACCESS_CHECK_NEEDED)
    }

    /// Whether instances are promises.
    #[inline]
    #[must_use]
    pub fn is_promise(&self) -> bool {
        self.flags.contains(ShapeFlags::PROMISE)
    }

    /// Look up an own property by name.
    #[must_use]
    pub fn own_property(&self, name: NameId) -> Option<SlotInfo> {
        self.properties
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, info)| *info)
    }

    /// Own properties in layout order.
    #[inline]
    #[must_use]
    pub fn properties(&self) -> &[(NameId, SlotInfo)] {
        &self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_predicates() {
        let shape = Shape::new(ShapeFlags::CALLABLE | ShapeFlags::CONSTRUCTOR);
        assert!(shape.is_callable());
        assert!(shape.is_constructor());
        assert!(!shape.is_deprecated());
        assert!(!shape.is_promise());
    }

    #[test]
    fn test_property_layout() {
        let a = NameId::new(0);
        let b = NameId::new(1);
        let shape = Shape::new(ShapeFlags::empty())
            .with_property(a)
            .with_property(b);

        assert_eq!(shape.own_property(a), Some(SlotInfo::data(0)));
        assert_eq!(shape.own_property(b), Some(SlotInfo::data(1)));
        assert_eq!(shape.own_property(NameId::new(9)), None);
    }

    #[test]
    fn test_deprecation_link() {
        let shape = Shape::new(ShapeFlags::empty()).deprecated_to(ShapeId::new(4));
        assert!(shape.is_deprecated());
        assert_eq!(shape.migrated_to(), Some(ShapeId::new(4)));
    }

    #[test]
    fn test_slot_info_is_data() {
        assert!(SlotInfo::data(0).is_data());
    }
}
