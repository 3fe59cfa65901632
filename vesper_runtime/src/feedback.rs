//! Per-closure inline-cache feedback storage.
//!
//! Each closure owns a feedback vector with one slot per observation site
//! in its bytecode. The interpreter tier fills slots as it runs; the
//! optimizing tiers only read them. [`FeedbackNexus`] is the read view
//! over a single slot.

use smallvec::SmallVec;
use vesper_compiler::FeedbackSlot;
use vesper_core::{NameId, ObjectId, ShapeId, VectorId};

// =============================================================================
// IC State
// =============================================================================

/// Inline-cache state of one feedback slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcState {
    /// The site has never executed.
    Uninitialized,
    /// One receiver shape observed.
    Monomorphic,
    /// A few receiver shapes observed.
    Polymorphic,
    /// Too many shapes; the cache gave up.
    Megamorphic,
}

/// How a keyed observation site addressed the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Accesses were by property name.
    Named(NameId),
    /// Accesses were by integer index.
    Element,
}

// =============================================================================
// Slot Data
// =============================================================================

/// Raw recorded state of one feedback slot.
#[derive(Debug, Clone)]
pub struct FeedbackSlotData {
    state: IcState,
    shapes: SmallVec<[ShapeId; 4]>,
    key: Option<KeyKind>,
    target: Option<ObjectId>,
    cell: Option<ObjectId>,
}

impl Default for FeedbackSlotData {
    fn default() -> Self {
        Self {
            state: IcState::Uninitialized,
            shapes: SmallVec::new(),
            key: None,
            target: None,
            cell: None,
        }
    }
}

impl FeedbackSlotData {
    /// A slot whose site never executed.
    #[must_use]
    pub fn uninitialized() -> Self {
        Self::default()
    }

    /// A monomorphic property site.
    #[must_use]
    pub fn monomorphic(shape: ShapeId) -> Self {
        Self {
            state: IcState::Monomorphic,
            shapes: SmallVec::from_slice(&[shape]),
            ..Self::default()
        }
    }

    /// A polymorphic property site.
    #[must_use]
    pub fn polymorphic(shapes: impl IntoIterator<Item = ShapeId>) -> Self {
        Self {
            state: IcState::Polymorphic,
            shapes: shapes.into_iter().collect(),
            ..Self::default()
        }
    }

    /// A megamorphic site; no shapes are retained.
    #[must_use]
    pub fn megamorphic() -> Self {
        Self {
            state: IcState::Megamorphic,
            ..Self::default()
        }
    }

    /// Tag the slot with its key kind (named vs element).
    #[must_use]
    pub fn with_key(mut self, key: KeyKind) -> Self {
        self.key = Some(key);
        self
    }

    /// Record the observed call or construct target.
    #[must_use]
    pub fn with_target(mut self, target: ObjectId) -> Self {
        if self.state == IcState::Uninitialized {
            self.state = IcState::Monomorphic;
        }
        self.target = Some(target);
        self
    }

    /// Record the global property cell the site bound to.
    #[must_use]
    pub fn with_global_cell(mut self, cell: ObjectId) -> Self {
        if self.state == IcState::Uninitialized {
            self.state = IcState::Monomorphic;
        }
        self.cell = Some(cell);
        self
    }
}

// =============================================================================
// Feedback Cell and Vector
// =============================================================================

/// Value of one closure feedback cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackCellValue {
    /// The cell holds a feedback vector (the closure has run).
    Vector(VectorId),
    /// The cell is still empty.
    Empty,
}

/// One closure feedback cell, consulted by closure-creating bytecodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackCell {
    /// The cell's current value.
    pub value: FeedbackCellValue,
}

impl FeedbackCell {
    /// A cell holding a feedback vector.
    #[must_use]
    pub const fn with_vector(vector: VectorId) -> Self {
        Self {
            value: FeedbackCellValue::Vector(vector),
        }
    }

    /// An empty cell.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            value: FeedbackCellValue::Empty,
        }
    }
}

/// Per-closure feedback storage: observation slots plus closure cells.
#[derive(Debug, Clone, Default)]
pub struct FeedbackVector {
    slots: Vec<FeedbackSlotData>,
    cells: Vec<FeedbackCell>,
}

impl FeedbackVector {
    /// Create a vector with `slot_count` uninitialized slots.
    #[must_use]
    pub fn new(slot_count: usize) -> Self {
        Self {
            slots: (0..slot_count)
                .map(|_| FeedbackSlotData::uninitialized())
                .collect(),
            cells: Vec::new(),
        }
    }

    /// Replace the data of one slot.
    pub fn set_slot(&mut self, slot: FeedbackSlot, data: FeedbackSlotData) {
        self.slots[slot.index()] = data;
    }

    /// Append a closure feedback cell, returning its index.
    pub fn add_closure_cell(&mut self, cell: FeedbackCell) -> u32 {
        self.cells.push(cell);
        (self.cells.len() - 1) as u32
    }

    /// Number of observation slots.
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// The closure feedback cell at an index.
    ///
    /// # Panics
    /// Panics if the index is out of range.
    #[inline]
    #[must_use]
    pub fn closure_cell(&self, index: u32) -> FeedbackCell {
        self.cells[index as usize]
    }

    fn slot_data(&self, slot: FeedbackSlot) -> &FeedbackSlotData {
        &self.slots[slot.index()]
    }
}

// =============================================================================
// Nexus
// =============================================================================

/// Read view over one feedback slot.
#[derive(Debug, Clone, Copy)]
pub struct FeedbackNexus<'a> {
    vector: &'a FeedbackVector,
    slot: FeedbackSlot,
}

impl<'a> FeedbackNexus<'a> {
    /// Create a nexus for `slot` of `vector`.
    ///
    /// # Panics
    /// Panics if the slot is invalid or out of range.
    #[must_use]
    pub fn new(vector: &'a FeedbackVector, slot: FeedbackSlot) -> Self {
        assert!(slot.is_valid(), "nexus over the invalid slot");
        assert!(slot.index() < vector.slot_count(), "slot out of range");
        Self { vector, slot }
    }

    /// The slot's inline-cache state.
    #[must_use]
    pub fn ic_state(&self) -> IcState {
        self.vector.slot_data(self.slot).state
    }

    /// Whether the site never executed.
    #[inline]
    #[must_use]
    pub fn is_uninitialized(&self) -> bool {
        self.ic_state() == IcState::Uninitialized
    }

    /// The receiver shapes observed at the site.
    #[must_use]
    pub fn shapes(&self) -> &'a [ShapeId] {
        &self.vector.slot_data(self.slot).shapes
    }

    /// How the site addressed the receiver, if recorded.
    #[must_use]
    pub fn key_kind(&self) -> Option<KeyKind> {
        self.vector.slot_data(self.slot).key
    }

    /// The property name extracted from the recorded key, if named.
    #[must_use]
    pub fn name(&self) -> Option<NameId> {
        match self.vector.slot_data(self.slot).key {
            Some(KeyKind::Named(name)) => Some(name),
            _ => None,
        }
    }

    /// The observed call/construct target object, if any.
    #[must_use]
    pub fn target(&self) -> Option<ObjectId> {
        self.vector.slot_data(self.slot).target
    }

    /// The global property cell the site bound to, if any.
    #[must_use]
    pub fn global_cell(&self) -> Option<ObjectId> {
        self.vector.slot_data(self.slot).cell
    }
}

// =============================================================================
// Tests
// =============================================================================
