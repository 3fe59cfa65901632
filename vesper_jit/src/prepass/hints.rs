//! The hint lattice: what the pre-pass knows about one abstract value.
//!
//! A hint set carries three independent sorts of facts about a value:
//! concrete heap identities it may be, shapes it may carry, and function
//! blueprints it may instantiate. The empty set means "no information"
//! and is the lattice top; set union is the join. Everything compares by
//! identity, never structurally, and the sorts deliberately overlap: a
//! known closure constant and a blueprint for the same function can
//! coexist.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::fmt;
use vesper_core::{ObjectId, ShapeId, SharedId, Value, VectorId};
use vesper_runtime::Heap;

/// Argument-hint vectors for call sites.
pub type HintsVector = SmallVec<[Hints; 4]>;

// =============================================================================
// Function Blueprint
// =============================================================================

/// A function identity not yet closed over data: shared code plus the
/// feedback vector a closure over it would carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionBlueprint {
    /// The closure-independent half.
    pub shared: SharedId,
    /// The feedback vector.
    pub feedback: VectorId,
}

impl FunctionBlueprint {
    /// Create a blueprint.
    #[inline]
    #[must_use]
    pub const fn new(shared: SharedId, feedback: VectorId) -> Self {
        Self { shared, feedback }
    }
}

impl fmt::Display for FunctionBlueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}>", self.shared, self.feedback)
    }
}

// =============================================================================
// Compilation Subject
// =============================================================================

/// What one analysis runs over: a blueprint, plus the concrete closure
/// when one is known.
#[derive(Debug, Clone, Copy)]
pub struct CompilationSubject {
    blueprint: FunctionBlueprint,
    closure: Option<ObjectId>,
}

impl CompilationSubject {
    /// Subject for a fully instantiated closure.
    ///
    /// # Panics
    /// Panics if the object is not a function or has no feedback vector.
    #[must_use]
    pub fn from_closure(heap: &Heap, closure: ObjectId) -> Self {
        let (shared, feedback) = heap
            .object(closure)
            .as_function()
            .expect("compilation subject must be a function");
        let feedback = feedback.expect("compilation subject must have a feedback vector");
        Self {
            blueprint: FunctionBlueprint::new(shared, feedback),
            closure: Some(closure),
        }
    }

    /// Subject for a blueprint without a concrete closure.
    #[inline]
    #[must_use]
    pub const fn from_blueprint(blueprint: FunctionBlueprint) -> Self {
        Self {
            blueprint,
            closure: None,
        }
    }

    /// The blueprint (always available).
    #[inline]
    #[must_use]
    pub const fn blueprint(&self) -> FunctionBlueprint {
        self.blueprint
    }

    /// The closure constant, when known.
    #[inline]
    #[must_use]
    pub const fn closure(&self) -> Option<ObjectId> {
        self.closure
    }
}

// =============================================================================
// Hints
// =============================================================================

/// A hint set: three identity-keyed fact sets about one abstract value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hints {
    constants: FxHashSet<Value>,
    shapes: FxHashSet<ShapeId>,
    blueprints: FxHashSet<FunctionBlueprint>,
}

impl Hints {
    /// The empty hint set ("could be anything").
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A hint set holding a single constant.
    #[must_use]
    pub fn constant(value: Value) -> Self {
        let mut hints = Self::new();
        hints.add_constant(value);
        hints
    }

    /// The known constant identities.
    #[inline]
    #[must_use]
    pub fn constants(&self) -> &FxHashSet<Value> {
        &self.constants
    }

    /// The possible shapes.
    #[inline]
    #[must_use]
    pub fn shapes(&self) -> &FxHashSet<ShapeId> {
        &self.shapes
    }

    /// The possible function blueprints.
    #[inline]
    #[must_use]
    pub fn blueprints(&self) -> &FxHashSet<FunctionBlueprint> {
        &self.blueprints
    }

    /// Add a constant identity.
    pub fn add_constant(&mut self, value: Value) {
        self.constants.insert(value);
    }

    /// Add a shape.
    pub fn add_shape(&mut self, shape: ShapeId) {
        self.shapes.insert(shape);
    }

    /// Add a function blueprint.
    pub fn add_blueprint(&mut self, blueprint: FunctionBlueprint) {
        self.blueprints.insert(blueprint);
    }

    /// Join: elementwise union with another hint set.
    pub fn add_all(&mut self, other: &Hints) {
        self.constants.extend(other.constants.iter().copied());
        self.shapes.extend(other.shapes.iter().copied());
        self.blueprints.extend(other.blueprints.iter().copied());
    }

    /// Drop all facts.
    pub fn clear(&mut self) {
        self.constants.clear();
        self.shapes.clear();
        self.blueprints.clear();
        debug_assert!(self.is_empty());
    }

    /// Whether no facts are known (lattice top).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty() && self.shapes.is_empty() && self.blueprints.is_empty()
    }

    /// Pointwise superset test over all three sorts.
    #[must_use]
    pub fn includes(&self, other: &Hints) -> bool {
        other.constants.is_subset(&self.constants)
            && other.shapes.is_subset(&self.shapes)
            && other.blueprints.is_subset(&self.blueprints)
    }
}

impl fmt::Display for Hints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for constant in &self.constants {
            writeln!(f, "  constant {constant}")?;
        }
        for shape in &self.shapes {
            writeln!(f, "  shape {shape}")?;
        }
        for blueprint in &self.blueprints {
            writeln!(f, "  blueprint {blueprint}")?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Hints {
        let mut h = Hints::new();
        h.add_constant(Value::smi(1));
        h.add_shape(ShapeId::new(2));
        h.add_blueprint(FunctionBlueprint::new(SharedId::new(3), VectorId::new(4)));
        h
    }

    #[test]
    fn test_empty_is_top() {
        let h = Hints::new();
        assert!(h.is_empty());
        assert!(h.constants().is_empty());
        assert!(h.shapes().is_empty());
        assert!(h.blueprints().is_empty());
    }

    #[test]
    fn test_sorts_are_independent() {
        let mut h = Hints::new();
        h.add_constant(Value::object(ObjectId::new(1)));
        assert!(h.shapes().is_empty());
        assert!(h.blueprints().is_empty());
    }

    #[test]
    fn test_join_is_commutative() {
        let a = sample();
        let mut b = Hints::new();
        b.add_constant(Value::Undefined);
        b.add_shape(ShapeId::new(9));

        let mut ab = a.clone();
        ab.add_all(&b);
        let mut ba = b.clone();
        ba.add_all(&a);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_join_is_associative() {
        let a = sample();
        let b = Hints::constant(Value::Null);
        let mut c = Hints::new();
        c.add_shape(ShapeId::new(7));

        let mut left = a.clone();
        left.add_all(&b);
        left.add_all(&c);

        let mut bc = b.clone();
        bc.add_all(&c);
        let mut right = a.clone();
        right.add_all(&bc);

        assert_eq!(left, right);
    }

    #[test]
    fn test_join_is_idempotent() {
        let a = sample();
        let mut joined = a.clone();
        joined.add_all(&a);
        assert_eq!(joined, a);
    }

    #[test]
    fn test_join_with_empty_is_identity() {
        let a = sample();
        let mut joined = a.clone();
        joined.add_all(&Hints::new());
        assert_eq!(joined, a);
    }

    #[test]
    fn test_includes_is_a_partial_order() {
        let a = sample();
        let b = Hints::constant(Value::smi(1));
        let mut c = Hints::new();
        c.add_constant(Value::smi(1));
        c.add_shape(ShapeId::new(2));

        // Reflexive.
        assert!(a.includes(&a));
        // Transitive: b ⊆ c ⊆ a.
        assert!(c.includes(&b));
        assert!(a.includes(&c));
        assert!(a.includes(&b));
        // Antisymmetric half: a ⊇ b but not b ⊇ a.
        assert!(!b.includes(&a));
    }

    #[test]
    fn test_mutual_inclusion_is_equality() {
        let a = sample();
        let b = sample();
        assert!(a.includes(&b) && b.includes(&a));
        assert_eq!(a, b);

        let c = Hints::constant(Value::smi(1));
        assert!(!(a.includes(&c) && c.includes(&a)));
        assert_ne!(a, c);
    }

    #[test]
    fn test_clear() {
        let mut h = sample();
        h.clear();
        assert!(h.is_empty());
    }

    #[test]
    fn test_blueprint_equality_is_by_both_components() {
        let a = FunctionBlueprint::new(SharedId::new(1), VectorId::new(1));
        let b = FunctionBlueprint::new(SharedId::new(1), VectorId::new(2));
        let c = FunctionBlueprint::new(SharedId::new(2), VectorId::new(1));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, FunctionBlueprint::new(SharedId::new(1), VectorId::new(1)));
    }

    #[test]
    fn test_display_lists_all_sorts() {
        let text = sample().to_string();
        assert!(text.contains("constant 1"));
        assert!(text.contains("shape s2"));
        assert!(text.contains("blueprint <f3, v4>"));
    }
}
