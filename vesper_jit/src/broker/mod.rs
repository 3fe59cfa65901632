//! The heap broker: the only path from background compilation to heap state.
//!
//! Optimization runs concurrently with the mutator, so the optimizer
//! never touches the live heap; everything it needs is materialized
//! ahead of time through the broker while the pre-pass walks bytecode.
//! The broker owns three shared tables:
//!
//! - the **feedback cache**, memoizing one [`ProcessedFeedback`] record
//!   per observation site,
//! - the **compilation marks**, ensuring each ⟨shared, feedback⟩ pair is
//!   analyzed at most once per compilation wave, and
//! - the **artifact ledger**, recording every heap fact serialized for
//!   the main-thread reducers.
//!
//! All three are shared by every concurrent analysis. Two plain mutexes
//! suffice: every operation is idempotent per key, so racing analyses
//! can only duplicate work, never corrupt state.

mod access_info;
mod artifacts;
mod feedback;

pub use access_info::{AccessMode, PropertyAccessInfo, compute_access_info};
pub use artifacts::Artifact;
pub use feedback::{FeedbackSource, ProcessedFeedback};

use crate::prepass::FunctionBlueprint;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use vesper_compiler::FeedbackSlot;
use vesper_core::{NameId, ObjectId, ShapeId, SharedId, VectorId};
use vesper_runtime::{FeedbackNexus, Heap, ObjectKind};

/// Optional sink for broker trace output.
pub type TraceSink = Box<dyn Fn(&str) + Send + Sync>;

/// Intermediary between background compilation and the heap.
pub struct HeapBroker {
    heap: Arc<Heap>,
    feedback: Mutex<FxHashMap<FeedbackSource, ProcessedFeedback>>,
    marks: Mutex<FxHashSet<FunctionBlueprint>>,
    artifacts: Mutex<FxHashSet<Artifact>>,
    trace_sink: Option<TraceSink>,
}

impl HeapBroker {
    /// Create a broker over a heap snapshot.
    #[must_use]
    pub fn new(heap: Arc<Heap>) -> Self {
        Self {
            heap,
            feedback: Mutex::new(FxHashMap::default()),
            marks: Mutex::new(FxHashSet::default()),
            artifacts: Mutex::new(FxHashSet::default()),
            trace_sink: None,
        }
    }

    /// Attach a trace sink. Tracing is a no-op without one.
    #[must_use]
    pub fn with_trace_sink(mut self, sink: TraceSink) -> Self {
        self.trace_sink = Some(sink);
        self
    }

    /// The heap under analysis.
    #[inline]
    #[must_use]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Emit a trace line; the message is only built when a sink is set.
    pub fn trace_with(&self, message: impl FnOnce() -> String) {
        if let Some(sink) = &self.trace_sink {
            sink(&message());
        }
    }

    // =========================================================================
    // Feedback Cache
    // =========================================================================

    /// Whether a site has already been classified.
    #[must_use]
    pub fn has_feedback(&self, source: FeedbackSource) -> bool {
        self.feedback.lock().contains_key(&source)
    }

    /// The cached classification of a site, if any.
    #[must_use]
    pub fn get_feedback(&self, source: FeedbackSource) -> Option<ProcessedFeedback> {
        self.feedback.lock().get(&source).cloned()
    }

    /// Cache a site's classification. The first record wins when two
    /// analyses race; both raced over identical inputs.
    pub fn set_feedback(&self, source: FeedbackSource, processed: ProcessedFeedback) {
        self.feedback.lock().entry(source).or_insert(processed);
    }

    // =========================================================================
    // Compilation Marks
    // =========================================================================

    /// Atomically test-and-set the analyzed mark for a blueprint.
    /// Returns `true` exactly once per blueprint.
    #[must_use]
    pub fn mark_serialized(&self, blueprint: FunctionBlueprint) -> bool {
        self.marks.lock().insert(blueprint)
    }

    /// Whether a blueprint has already been analyzed.
    #[must_use]
    pub fn is_serialized_for_compilation(&self, blueprint: FunctionBlueprint) -> bool {
        self.marks.lock().contains(&blueprint)
    }

    // =========================================================================
    // Artifact Ledger
    // =========================================================================

    /// Record one serialized heap fact.
    pub fn record(&self, artifact: Artifact) {
        self.artifacts.lock().insert(artifact);
    }

    /// Whether a fact has been serialized.
    #[must_use]
    pub fn has_artifact(&self, artifact: Artifact) -> bool {
        self.artifacts.lock().contains(&artifact)
    }

    /// Number of distinct serialized facts.
    #[must_use]
    pub fn artifact_count(&self) -> usize {
        self.artifacts.lock().len()
    }

    // =========================================================================
    // Shape Filtering
    // =========================================================================

    /// Filter a shape list down to the ones worth speculating on:
    /// deprecated shapes are replaced by their migrated descendants,
    /// unmigrated deprecated and abandoned-prototype shapes are dropped,
    /// and duplicates are removed preserving order.
    #[must_use]
    pub fn relevant_receiver_shapes(
        &self,
        shapes: impl IntoIterator<Item = ShapeId>,
    ) -> Vec<ShapeId> {
        let mut result = Vec::new();
        for shape in shapes {
            let updated = self.heap.forward_migrated(shape);
            let data = self.heap.shape(updated);
            if data.is_deprecated() || data.is_abandoned_prototype() {
                continue;
            }
            if !result.contains(&updated) {
                result.push(updated);
            }
        }
        result
    }

    // =========================================================================
    // Serialization Requests
    // =========================================================================

    /// Serialize a function object in full (prototype-chain access
    /// pattern, inlining metadata).
    pub fn serialize_function_info(&self, function: ObjectId) {
        self.record(Artifact::FunctionInfo(function));
    }

    /// Serialize a shape's prototype link.
    pub fn serialize_shape_prototype(&self, shape: ShapeId) {
        self.record(Artifact::ShapePrototype(shape));
    }

    /// Prepare a shape for element access in the given mode. Literal
    /// stores are local and need nothing.
    pub fn serialize_for_element_access(&self, shape: ShapeId, mode: AccessMode) {
        match mode {
            AccessMode::Load | AccessMode::Has => self.record(Artifact::ElementLoad(shape)),
            AccessMode::Store => self.record(Artifact::ElementStore(shape)),
            AccessMode::StoreInLiteral => {}
        }
    }

    /// Serialize a typed array's buffer description.
    pub fn serialize_typed_array(&self, object: ObjectId) {
        self.record(Artifact::TypedArray(object));
    }

    /// Serialize the constant element of `object` at `index`, or, for a
    /// copy-on-write array without one, the copy-on-write slot itself.
    pub fn serialize_own_element(&self, object: ObjectId, index: u32) {
        if let ObjectKind::Array { elements, cow } = &self.heap.object(object).kind {
            if (index as usize) < elements.len() {
                self.record(Artifact::OwnElement(object, index));
            } else if *cow {
                self.record(Artifact::CowElement(object, index));
            }
        }
    }

    /// Request the global property cell for a name, serializing it.
    pub fn request_property_cell(&self, name: NameId) -> Option<ObjectId> {
        self.record(Artifact::PropertyCell(name));
        self.heap.global_cell(name)
    }

    /// Serialize a host function's template description.
    pub fn serialize_template_info(&self, shared: SharedId) {
        self.record(Artifact::TemplateInfo(shared));
    }

    /// Locate and serialize the template holder for receivers of `shape`.
    pub fn lookup_template_holder(&self, shape: ShapeId) {
        self.record(Artifact::TemplateHolder(shape));
    }

    /// Serialize the native context's scope info.
    pub fn serialize_scope_info(&self) {
        self.record(Artifact::ScopeInfo);
    }

    /// Serialize the default promise-capability resolve code.
    pub fn serialize_promise_resolve_code(&self) {
        self.record(Artifact::PromiseResolveCode);
    }

    /// Serialize the default promise-capability reject code.
    pub fn serialize_promise_reject_code(&self) {
        self.record(Artifact::PromiseRejectCode);
    }

    /// Ensure a function's source positions exist. Runs on the main
    /// thread, before traversal starts.
    pub fn ensure_source_positions(&self, shared: SharedId) {
        self.record(Artifact::SourcePositions(shared));
    }

    /// Serialize every slot of a feedback vector in bulk.
    pub fn serialize_vector_slots(&self, vector: VectorId) {
        self.record(Artifact::FeedbackSlots(vector));
    }

    /// Record that a closure feedback cell was consulted.
    pub fn record_closure_cell(&self, vector: VectorId, index: u32) {
        self.record(Artifact::ClosureFeedbackCell(vector, index));
    }

    // =========================================================================
    // Classification Helpers
    // =========================================================================

    /// Classify a global load/store site from its raw slot state.
    #[must_use]
    pub fn process_global_access(
        &self,
        vector: VectorId,
        slot: FeedbackSlot,
    ) -> ProcessedFeedback {
        let nexus = FeedbackNexus::new(self.heap.vector(vector), slot);
        if nexus.is_uninitialized() {
            return ProcessedFeedback::Insufficient;
        }
        let Some(cell) = nexus.global_cell() else {
            return ProcessedFeedback::GlobalAccess {
                cell: None,
                constant: None,
            };
        };
        match self.heap.object(cell).kind {
            ObjectKind::PropertyCell {
                name,
                value,
                constant,
            } => {
                self.record(Artifact::PropertyCell(name));
                ProcessedFeedback::GlobalAccess {
                    cell: Some(cell),
                    constant: constant.then_some(value),
                }
            }
            _ => ProcessedFeedback::GlobalAccess {
                cell: Some(cell),
                constant: None,
            },
        }
    }

    /// Compute the access description for `name` on `shape`.
    #[must_use]
    pub fn compute_access_info(
        &self,
        shape: ShapeId,
        name: NameId,
        mode: AccessMode,
    ) -> PropertyAccessInfo {
        compute_access_info(&self.heap, shape, name, mode)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_core::Value;
    use vesper_runtime::{Shape, ShapeFlags};

    fn broker() -> HeapBroker {
        HeapBroker::new(Arc::new(Heap::new()))
    }

    #[test]
    fn test_feedback_cache_first_record_wins() {
        let broker = broker();
        let source = FeedbackSource::new(VectorId::new(0), FeedbackSlot::new(0));
        assert!(!broker.has_feedback(source));

        broker.set_feedback(source, ProcessedFeedback::Insufficient);
        broker.set_feedback(source, ProcessedFeedback::Megamorphic);

        assert_eq!(
            broker.get_feedback(source),
            Some(ProcessedFeedback::Insufficient)
        );
    }

    #[test]
    fn test_mark_serialized_is_once_only() {
        let broker = broker();
        let blueprint = FunctionBlueprint::new(SharedId::new(1), VectorId::new(2));
        assert!(!broker.is_serialized_for_compilation(blueprint));
        assert!(broker.mark_serialized(blueprint));
        assert!(!broker.mark_serialized(blueprint));
        assert!(broker.is_serialized_for_compilation(blueprint));
    }

    #[test]
    fn test_mark_serialized_races_resolve_to_one_winner() {
        let broker = Arc::new(broker());
        let blueprint = FunctionBlueprint::new(SharedId::new(0), VectorId::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let broker = Arc::clone(&broker);
            handles.push(std::thread::spawn(move || broker.mark_serialized(blueprint)));
        }
        let winners: usize = handles
            .into_iter()
            .map(|h| usize::from(h.join().unwrap()))
            .sum();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_artifact_ledger_dedups() {
        let broker = broker();
        broker.record(Artifact::ScopeInfo);
        broker.record(Artifact::ScopeInfo);
        assert!(broker.has_artifact(Artifact::ScopeInfo));
        assert_eq!(broker.artifact_count(), 1);
    }

    #[test]
    fn test_relevant_shapes_follow_migrations_and_filter() {
        let mut heap = Heap::new();
        let live = heap.alloc_shape(Shape::new(ShapeFlags::empty()));
        let stale = heap.alloc_shape(Shape::new(ShapeFlags::empty()).deprecated_to(live));
        let dead_end =
            heap.alloc_shape(Shape::new(ShapeFlags::DEPRECATED));
        let abandoned = heap.alloc_shape(Shape::new(ShapeFlags::ABANDONED_PROTOTYPE));
        let broker = HeapBroker::new(Arc::new(heap));

        let shapes = broker.relevant_receiver_shapes([stale, live, dead_end, abandoned]);
        assert_eq!(shapes, vec![live]);
    }

    #[test]
    fn test_own_element_serialization() {
        let mut heap = Heap::new();
        let shape = heap.plain_shape();
        let dense = heap.alloc_object(vesper_runtime::HeapObject::new(
            shape,
            ObjectKind::Array {
                elements: vec![Value::smi(1), Value::smi(2)],
                cow: false,
            },
        ));
        let cow = heap.alloc_object(vesper_runtime::HeapObject::new(
            shape,
            ObjectKind::Array {
                elements: vec![],
                cow: true,
            },
        ));
        let broker = HeapBroker::new(Arc::new(heap));

        broker.serialize_own_element(dense, 1);
        broker.serialize_own_element(dense, 5);
        broker.serialize_own_element(cow, 3);

        assert!(broker.has_artifact(Artifact::OwnElement(dense, 1)));
        assert!(!broker.has_artifact(Artifact::OwnElement(dense, 5)));
        assert!(!broker.has_artifact(Artifact::CowElement(dense, 5)));
        assert!(broker.has_artifact(Artifact::CowElement(cow, 3)));
    }

    #[test]
    fn test_global_access_classification() {
        let mut heap = Heap::new();
        let name = heap.intern_name("answer");
        let cell = heap.alloc_global_cell(name, Value::smi(42), true);
        let mut vector = vesper_runtime::FeedbackVector::new(2);
        vector.set_slot(
            FeedbackSlot::new(0),
            vesper_runtime::FeedbackSlotData::uninitialized().with_global_cell(cell),
        );
        let vector = heap.alloc_vector(vector);
        let broker = HeapBroker::new(Arc::new(heap));

        let processed = broker.process_global_access(vector, FeedbackSlot::new(0));
        assert_eq!(
            processed,
            ProcessedFeedback::GlobalAccess {
                cell: Some(cell),
                constant: Some(Value::smi(42)),
            }
        );
        assert!(broker.has_artifact(Artifact::PropertyCell(name)));

        let uninitialized = broker.process_global_access(vector, FeedbackSlot::new(1));
        assert!(uninitialized.is_insufficient());
    }

    #[test]
    fn test_trace_sink_receives_messages() {
        use parking_lot::Mutex as PMutex;
        let lines = Arc::new(PMutex::new(Vec::new()));
        let sink_lines = Arc::clone(&lines);
        let broker = broker().with_trace_sink(Box::new(move |line| {
            sink_lines.lock().push(line.to_owned());
        }));

        broker.trace_with(|| "hello".to_owned());
        assert_eq!(lines.lock().as_slice(), ["hello".to_owned()]);
    }
}
