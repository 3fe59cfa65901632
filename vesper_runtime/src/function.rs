//! Shared function infos: the closure-independent half of a function.

use std::sync::Arc;
use vesper_compiler::BytecodeArray;
use vesper_core::{NameId, ShapeId};

/// Identities of host-provided builtins the optimizer specializes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinId {
    /// The `Promise` constructor.
    PromiseConstructor,
    /// `Promise.prototype.then`.
    PromisePrototypeThen,
    /// `Promise.prototype.catch`.
    PromisePrototypeCatch,
    /// `Promise.prototype.finally`.
    PromisePrototypeFinally,
    /// `Object.prototype.hasOwnProperty`.
    ObjectHasOwnProperty,
    /// `Array.prototype.push`.
    ArrayPrototypePush,
    /// `Function.prototype.call`.
    FunctionPrototypeCall,
    /// `Function.prototype.apply`.
    FunctionPrototypeApply,
}

/// Host-bound (foreign) function description.
///
/// Functions backed by an embedder callback carry a template instead of
/// bytecode. The optimizer can elide receiver checks when the template
/// accepts any receiver; otherwise it must locate the holder of the
/// expected receiver type per observed receiver shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionTemplate {
    /// Whether the template has an attached callback.
    pub has_call_code: bool,
    /// Whether any receiver may invoke the callback.
    pub accept_any_receiver: bool,
    /// Expected receiver shape, when the template is signature-checked.
    pub signature: Option<ShapeId>,
}

impl FunctionTemplate {
    /// A template with a callback and no receiver restrictions.
    #[must_use]
    pub const fn unrestricted() -> Self {
        Self {
            has_call_code: true,
            accept_any_receiver: true,
            signature: None,
        }
    }

    /// A template with a callback requiring receivers of `signature` shape.
    #[must_use]
    pub const fn with_signature(signature: ShapeId) -> Self {
        Self {
            has_call_code: true,
            accept_any_receiver: false,
            signature: Some(signature),
        }
    }
}

/// Code and metadata shared by all closures of one function.
#[derive(Debug, Clone)]
pub struct SharedFunctionInfo {
    name: NameId,
    bytecode: Option<Arc<BytecodeArray>>,
    inlineable: bool,
    builtin: Option<BuiltinId>,
    template: Option<FunctionTemplate>,
}

impl SharedFunctionInfo {
    /// Create a bytecode-backed function.
    #[must_use]
    pub fn new(name: NameId, bytecode: Arc<BytecodeArray>) -> Self {
        Self {
            name,
            bytecode: Some(bytecode),
            inlineable: true,
            builtin: None,
            template: None,
        }
    }

    /// Create a builtin function.
    #[must_use]
    pub fn builtin(name: NameId, id: BuiltinId) -> Self {
        Self {
            name,
            bytecode: None,
            inlineable: false,
            builtin: Some(id),
            template: None,
        }
    }

    /// Create a host-bound function from a template.
    #[must_use]
    pub fn host(name: NameId, template: FunctionTemplate) -> Self {
        Self {
            name,
            bytecode: None,
            inlineable: false,
            builtin: None,
            template: Some(template),
        }
    }

    /// Mark the function as not inlineable.
    #[must_use]
    pub fn not_inlineable(mut self) -> Self {
        self.inlineable = false;
        self
    }

    /// The function's name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> NameId {
        self.name
    }

    /// The function's bytecode, if it has any.
    #[inline]
    #[must_use]
    pub fn bytecode(&self) -> Option<&Arc<BytecodeArray>> {
        self.bytecode.as_ref()
    }

    /// Whether the inliner may consider this function.
    #[inline]
    #[must_use]
    pub fn is_inlineable(&self) -> bool {
        self.inlineable && self.bytecode.is_some()
    }

    /// The builtin identity, if this is a builtin.
    #[inline]
    #[must_use]
    pub fn builtin_id(&self) -> Option<BuiltinId> {
        self.builtin
    }

    /// The host template, if this is a host-bound function.
    #[inline]
    #[must_use]
    pub fn template(&self) -> Option<FunctionTemplate> {
        self.template
    }

    /// Whether this function is backed by an embedder callback.
    #[inline]
    #[must_use]
    pub fn is_host_function(&self) -> bool {
        self.template.is_some()
    }
}
