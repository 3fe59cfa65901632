//! Configuration flags for the background serialization pre-pass.

use bitflags::bitflags;

bitflags! {
    /// Per-compilation configuration of the pre-pass.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SerializerFlags: u8 {
        /// Kill the dataflow state when a call site has never executed;
        /// the optimizer will not compile such a path.
        const BAILOUT_ON_UNINITIALIZED = 1 << 0;
        /// Materialize source positions for the root function before
        /// traversal (the only mutator-synchronous step).
        const COLLECT_SOURCE_POSITIONS = 1 << 1;
        /// This compilation replaces an already-running frame. Suppresses
        /// the uninitialized bailout and is stripped before recursing into
        /// callees.
        const OSR = 1 << 2;
    }
}

impl SerializerFlags {
    /// The flag set handed to child analyses: everything but OSR.
    #[inline]
    #[must_use]
    pub fn for_child(self) -> Self {
        self - Self::OSR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_child_strips_osr() {
        let flags = SerializerFlags::BAILOUT_ON_UNINITIALIZED | SerializerFlags::OSR;
        let child = flags.for_child();
        assert!(child.contains(SerializerFlags::BAILOUT_ON_UNINITIALIZED));
        assert!(!child.contains(SerializerFlags::OSR));
    }

    #[test]
    fn test_for_child_preserves_others() {
        let flags = SerializerFlags::COLLECT_SOURCE_POSITIONS;
        assert_eq!(flags.for_child(), flags);
    }
}
