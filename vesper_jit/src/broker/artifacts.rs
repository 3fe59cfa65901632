//! The serialized-artifact ledger.
//!
//! Every heap fact the pre-pass materializes for the main-thread
//! reducers is recorded as one entry here. The reducers later consult
//! the ledger instead of the live heap; tests assert on it directly.

use vesper_core::{NameId, ObjectId, ShapeId, SharedId, VectorId};

/// One pre-materialized heap fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// A function object serialized in full (shape, prototype, shared).
    FunctionInfo(ObjectId),
    /// A shape's prototype link.
    ShapePrototype(ShapeId),
    /// A shape prepared for element loads.
    ElementLoad(ShapeId),
    /// A shape prepared for element stores.
    ElementStore(ShapeId),
    /// A typed array's buffer description.
    TypedArray(ObjectId),
    /// A constant own element of an object.
    OwnElement(ObjectId, u32),
    /// A copy-on-write element slot of an array.
    CowElement(ObjectId, u32),
    /// The global property cell for a name.
    PropertyCell(NameId),
    /// A host function's template description.
    TemplateInfo(SharedId),
    /// The template holder for receivers of a shape.
    TemplateHolder(ShapeId),
    /// The native context's scope info.
    ScopeInfo,
    /// The default promise-capability resolve code.
    PromiseResolveCode,
    /// The default promise-capability reject code.
    PromiseRejectCode,
    /// Source positions of a function.
    SourcePositions(SharedId),
    /// The slots of a feedback vector, in bulk.
    FeedbackSlots(VectorId),
    /// One closure feedback cell of a vector.
    ClosureFeedbackCell(VectorId, u32),
}
