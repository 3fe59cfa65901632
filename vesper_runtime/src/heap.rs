//! The heap arena and native context.
//!
//! All runtime structures live in one [`Heap`], addressed by the typed
//! handles from `vesper_core`. The interpreter tier builds and mutates
//! the heap; background compilation receives it behind an `Arc` and only
//! reads. Handle-based addressing keeps every cross-reference stable and
//! identity comparison O(1).

use crate::feedback::FeedbackVector;
use crate::function::SharedFunctionInfo;
use crate::object::{HeapObject, ObjectKind};
use crate::shape::{Shape, ShapeFlags};
use rustc_hash::FxHashMap;
use vesper_core::{NameId, ObjectId, ShapeId, SharedId, Value, VectorId};

// =============================================================================
// Native Context
// =============================================================================

/// Host-level singletons the optimizer keys its reductions on.
#[derive(Debug, Clone)]
pub struct NativeContext {
    /// The global proxy receiver.
    pub global_proxy: ObjectId,
    /// The context's scope info object.
    pub scope_info: ObjectId,
    /// Default promise-capability resolve code.
    pub promise_default_resolve: ObjectId,
    /// Default promise-capability reject code.
    pub promise_default_reject: ObjectId,
    /// The interned `"prototype"` name.
    pub prototype_name: NameId,
}

// =============================================================================
// Heap
// =============================================================================

/// Arena of shapes, objects, function infos, and feedback vectors.
#[derive(Debug)]
pub struct Heap {
    shapes: Vec<Shape>,
    objects: Vec<HeapObject>,
    shareds: Vec<SharedFunctionInfo>,
    vectors: Vec<FeedbackVector>,
    names: Vec<String>,
    name_map: FxHashMap<String, NameId>,
    global_cells: FxHashMap<NameId, ObjectId>,
    native: NativeContext,
    plain_shape: ShapeId,
    function_shape: ShapeId,
}

impl Heap {
    /// Create a heap with its native context populated.
    #[must_use]
    pub fn new() -> Self {
        let mut heap = Self {
            shapes: Vec::new(),
            objects: Vec::new(),
            shareds: Vec::new(),
            vectors: Vec::new(),
            names: Vec::new(),
            name_map: FxHashMap::default(),
            global_cells: FxHashMap::default(),
            native: NativeContext {
                global_proxy: ObjectId::new(0),
                scope_info: ObjectId::new(0),
                promise_default_resolve: ObjectId::new(0),
                promise_default_reject: ObjectId::new(0),
                prototype_name: NameId::new(0),
            },
            plain_shape: ShapeId::new(0),
            function_shape: ShapeId::new(0),
        };

        let prototype_name = heap.intern_name("prototype");
        let plain_shape = heap.alloc_shape(Shape::new(ShapeFlags::empty()));
        heap.plain_shape = plain_shape;
        heap.function_shape = heap.alloc_shape(Shape::new(
            ShapeFlags::CALLABLE | ShapeFlags::CONSTRUCTOR,
        ));
        let proxy_shape = heap.alloc_shape(Shape::new(ShapeFlags::empty()));

        let global_proxy = heap.alloc_object(HeapObject::new(proxy_shape, ObjectKind::GlobalProxy));
        let scope_info = heap.alloc_object(HeapObject::new(plain_shape, ObjectKind::Plain));
        let promise_default_resolve =
            heap.alloc_object(HeapObject::new(plain_shape, ObjectKind::Plain));
        let promise_default_reject =
            heap.alloc_object(HeapObject::new(plain_shape, ObjectKind::Plain));

        heap.native = NativeContext {
            global_proxy,
            scope_info,
            promise_default_resolve,
            promise_default_reject,
            prototype_name,
        };
        heap
    }

    /// The native context.
    #[inline]
    #[must_use]
    pub fn native_context(&self) -> &NativeContext {
        &self.native
    }

    /// The default shape of plain objects.
    #[inline]
    #[must_use]
    pub fn plain_shape(&self) -> ShapeId {
        self.plain_shape
    }

    /// The default shape given to function closures.
    #[inline]
    #[must_use]
    pub fn function_shape(&self) -> ShapeId {
        self.function_shape
    }

    // =========================================================================
    // Interning and Allocation
    // =========================================================================

    /// Intern a property name.
    pub fn intern_name(&mut self, name: &str) -> NameId {
        if let Some(&id) = self.name_map.get(name) {
            return id;
        }
        let id = NameId::new(self.names.len() as u32);
        self.names.push(name.to_owned());
        self.name_map.insert(name.to_owned(), id);
        id
    }

    /// Allocate a shape.
    pub fn alloc_shape(&mut self, shape: Shape) -> ShapeId {
        self.shapes.push(shape);
        ShapeId::new((self.shapes.len() - 1) as u32)
    }

    /// Allocate a heap object.
    pub fn alloc_object(&mut self, object: HeapObject) -> ObjectId {
        self.objects.push(object);
        ObjectId::new((self.objects.len() - 1) as u32)
    }

    /// Allocate a shared function info.
    pub fn alloc_shared(&mut self, shared: SharedFunctionInfo) -> SharedId {
        self.shareds.push(shared);
        SharedId::new((self.shareds.len() - 1) as u32)
    }

    /// Allocate a feedback vector.
    pub fn alloc_vector(&mut self, vector: FeedbackVector) -> VectorId {
        self.vectors.push(vector);
        VectorId::new((self.vectors.len() - 1) as u32)
    }

    /// Allocate a function closure over `shared` with the default
    /// function shape.
    pub fn alloc_function(&mut self, shared: SharedId, feedback: Option<VectorId>) -> ObjectId {
        let shape = self.function_shape;
        self.alloc_object(HeapObject::new(shape, ObjectKind::Function { shared, feedback }))
    }

    /// Allocate the property cell backing a global variable and register
    /// it under its name.
    pub fn alloc_global_cell(&mut self, name: NameId, value: Value, constant: bool) -> ObjectId {
        let shape = self.plain_shape;
        let cell = self.alloc_object(HeapObject::new(
            shape,
            ObjectKind::PropertyCell {
                name,
                value,
                constant,
            },
        ));
        self.global_cells.insert(name, cell);
        cell
    }

    /// The property cell backing a global variable, if one exists.
    #[inline]
    #[must_use]
    pub fn global_cell(&self, name: NameId) -> Option<ObjectId> {
        self.global_cells.get(&name).copied()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The shape behind a handle.
    ///
    /// # Panics
    /// Panics on a dangling handle.
    #[inline]
    #[must_use]
    pub fn shape(&self, id: ShapeId) -> &Shape {
        &self.shapes[id.index()]
    }

    /// The object behind a handle.
    ///
    /// # Panics
    /// Panics on a dangling handle.
    #[inline]
    #[must_use]
    pub fn object(&self, id: ObjectId) -> &HeapObject {
        &self.objects[id.index()]
    }

    /// The shared function info behind a handle.
    ///
    /// # Panics
    /// Panics on a dangling handle.
    #[inline]
    #[must_use]
    pub fn shared(&self, id: SharedId) -> &SharedFunctionInfo {
        &self.shareds[id.index()]
    }

    /// The feedback vector behind a handle.
    ///
    /// # Panics
    /// Panics on a dangling handle.
    #[inline]
    #[must_use]
    pub fn vector(&self, id: VectorId) -> &FeedbackVector {
        &self.vectors[id.index()]
    }

    /// Mutable feedback vector access (interpreter tier only).
    #[inline]
    #[must_use]
    pub fn vector_mut(&mut self, id: VectorId) -> &mut FeedbackVector {
        &mut self.vectors[id.index()]
    }

    /// The text of an interned name.
    ///
    /// # Panics
    /// Panics on a dangling handle.
    #[inline]
    #[must_use]
    pub fn name(&self, id: NameId) -> &str {
        &self.names[id.index()]
    }

    // =========================================================================
    // Derived Queries
    // =========================================================================

    /// The shape of an object.
    #[inline]
    #[must_use]
    pub fn shape_of(&self, id: ObjectId) -> ShapeId {
        self.object(id).shape
    }

    /// Whether a value is a callable heap object.
    #[must_use]
    pub fn is_callable(&self, value: Value) -> bool {
        match value.as_object() {
            Some(id) => {
                let object = self.object(id);
                object.is_function() || self.shape(object.shape).is_callable()
            }
            None => false,
        }
    }

    /// Follow a shape's migration chain to its most recent descendant.
    #[must_use]
    pub fn forward_migrated(&self, mut id: ShapeId) -> ShapeId {
        while let Some(next) = self.shape(id).migrated_to() {
            id = next;
        }
        id
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_context_is_populated() {
        let heap = Heap::new();
        let native = heap.native_context();
        assert!(matches!(
            heap.object(native.global_proxy).kind,
            ObjectKind::GlobalProxy
        ));
        assert_eq!(heap.name(native.prototype_name), "prototype");
        assert_ne!(native.scope_info, native.global_proxy);
    }

    #[test]
    fn test_name_interning_dedups() {
        let mut heap = Heap::new();
        let a = heap.intern_name("x");
        let b = heap.intern_name("x");
        let c = heap.intern_name("y");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(heap.name(a), "x");
    }

    #[test]
    fn test_function_allocation_is_callable() {
        let mut heap = Heap::new();
        let name = heap.intern_name("f");
        let shared = heap.alloc_shared(SharedFunctionInfo::builtin(
            name,
            crate::function::BuiltinId::PromiseConstructor,
        ));
        let function = heap.alloc_function(shared, None);
        assert!(heap.is_callable(Value::object(function)));
        assert!(!heap.is_callable(Value::smi(1)));
    }

    #[test]
    fn test_forward_migration_chain() {
        let mut heap = Heap::new();
        let newest = heap.alloc_shape(Shape::new(ShapeFlags::empty()));
        let middle = heap.alloc_shape(Shape::new(ShapeFlags::empty()).deprecated_to(newest));
        let oldest = heap.alloc_shape(Shape::new(ShapeFlags::empty()).deprecated_to(middle));
        assert_eq!(heap.forward_migrated(oldest), newest);
        assert_eq!(heap.forward_migrated(newest), newest);
    }
}
