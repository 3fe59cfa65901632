//! The background serializer: abstract bytecode traversal with hint
//! propagation and heap pre-materialization.
//!
//! The traversal is a single forward pass by ascending offset. Forward
//! jumps park a copy of the current environment in the jump-target map,
//! re-merged when the target offset is reached; back edges are dropped
//! on purpose, so loops are analyzed once. Hints are advisory, which is
//! what makes the under-approximation sound: losing a hint can only
//! make the optimizer less aggressive, never wrong.

use super::disposition::{Disposition, disposition};
use super::environment::Environment;
use super::hints::{CompilationSubject, FunctionBlueprint, Hints, HintsVector};
use crate::broker::{AccessMode, FeedbackSource, HeapBroker, ProcessedFeedback};
use crate::flags::SerializerFlags;
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use vesper_compiler::{
    BytecodeArray, BytecodeIterator, Constant, FeedbackSlot, Opcode, Register,
};
use vesper_core::{NameId, ObjectId, ShapeId, SharedId, Value, VesperError, VesperResult};
use vesper_runtime::{BuiltinId, FeedbackCellValue, FeedbackNexus, IcState, KeyKind, ObjectKind};

/// How a call site supplies its receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReceiverMode {
    /// The receiver is part of the argument register range.
    Any,
    /// The receiver is implicitly `undefined`.
    NullOrUndefined,
}

// =============================================================================
// Exception Handler Matcher
// =============================================================================

/// Tracks whether the traversal sits on an exception-handler entry.
///
/// Handler start offsets are visited in ascending order, so a single
/// monotone cursor over the sorted starts suffices.
struct ExceptionHandlerMatcher {
    handler_starts: Vec<u32>,
    cursor: usize,
}

impl ExceptionHandlerMatcher {
    fn new(bytecode: &BytecodeArray) -> Self {
        let mut handler_starts: Vec<u32> = bytecode
            .handler_table()
            .iter()
            .map(|range| range.handler)
            .collect();
        handler_starts.sort_unstable();
        handler_starts.dedup();
        Self {
            handler_starts,
            cursor: 0,
        }
    }

    fn is_handler_start(&mut self, offset: u32) -> bool {
        while self.cursor < self.handler_starts.len() && self.handler_starts[self.cursor] < offset {
            self.cursor += 1;
        }
        self.handler_starts.get(self.cursor) == Some(&offset)
    }
}

// =============================================================================
// Background Serializer
// =============================================================================

/// The per-function analysis. Child calls spawn independent serializers
/// that run to completion before the parent resumes.
pub struct BackgroundSerializer<'b> {
    broker: &'b HeapBroker,
    flags: SerializerFlags,
    bytecode: Arc<BytecodeArray>,
    environment: Environment,
    jump_target_environments: FxHashMap<u32, Environment>,
}

impl<'b> BackgroundSerializer<'b> {
    /// Create the top-level serializer for a closure about to be
    /// optimized.
    ///
    /// # Errors
    /// Fails if the closure's function carries no bytecode.
    ///
    /// # Panics
    /// Panics if the object is not a closure with a feedback vector.
    pub fn new(
        broker: &'b HeapBroker,
        closure: ObjectId,
        flags: SerializerFlags,
    ) -> VesperResult<Self> {
        let subject = CompilationSubject::from_closure(broker.heap(), closure);
        broker.serialize_function_info(closure);
        Self::with_subject(broker, subject, flags)
    }

    /// Create a serializer for a subject invoked with known argument
    /// hints: the child-analysis entry point, also used when the caller
    /// knows the call site's abstract arguments.
    ///
    /// # Errors
    /// Fails if the subject's function carries no bytecode.
    pub fn with_arguments(
        broker: &'b HeapBroker,
        subject: CompilationSubject,
        new_target: Option<&Hints>,
        arguments: &[Hints],
        flags: SerializerFlags,
    ) -> VesperResult<Self> {
        debug_assert!(!flags.contains(SerializerFlags::OSR));
        let mut serializer = Self::with_subject(broker, subject, flags)?;
        if let Some(closure) = subject.closure() {
            broker.serialize_function_info(closure);
        }

        // Seed the parameters from the actually passed argument hints;
        // missing ones are known-undefined, extra ones are dropped.
        let parameter_count = serializer.environment.parameter_count();
        for (i, hints) in arguments.iter().take(parameter_count).enumerate() {
            *serializer
                .environment
                .register_hints_mut(Register::parameter(i as u16)) = hints.clone();
        }
        if arguments.len() < parameter_count {
            let undefined = Hints::constant(Value::Undefined);
            for i in arguments.len()..parameter_count {
                *serializer
                    .environment
                    .register_hints_mut(Register::parameter(i as u16)) = undefined.clone();
            }
        }

        if let Some(register) = serializer.bytecode.new_target_register() {
            debug_assert!(serializer.environment.register_hints(register).is_empty());
            if let Some(new_target) = new_target {
                serializer
                    .environment
                    .register_hints_mut(register)
                    .add_all(new_target);
            }
        }

        broker.trace_with(|| format!("initial environment:\n{}", serializer.environment));
        Ok(serializer)
    }

    fn with_subject(
        broker: &'b HeapBroker,
        subject: CompilationSubject,
        flags: SerializerFlags,
    ) -> VesperResult<Self> {
        let blueprint = subject.blueprint();
        let shared = broker.heap().shared(blueprint.shared);
        let bytecode = shared
            .bytecode()
            .cloned()
            .ok_or_else(|| VesperError::MissingBytecode {
                name: broker.heap().name(shared.name()).to_owned(),
            })?;

        let mut closure_hints = Hints::new();
        match subject.closure() {
            Some(closure) => closure_hints.add_constant(Value::object(closure)),
            None => closure_hints.add_blueprint(blueprint),
        }

        let environment = Environment::new(
            blueprint,
            bytecode.parameter_count() as usize,
            bytecode.register_count() as usize,
            closure_hints,
        );
        Ok(Self {
            broker,
            flags,
            bytecode,
            environment,
            jump_target_environments: FxHashMap::default(),
        })
    }

    /// The analysis state; inspectable after [`run`](Self::run).
    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Analyze the function and return its accumulated return hints.
    ///
    /// Each ⟨shared, feedback⟩ pair is analyzed at most once per
    /// compilation wave; a repeat request returns empty hints without
    /// traversing, which also breaks call-graph cycles.
    ///
    /// # Errors
    /// Propagates invariant violations (never-valid bytecodes).
    pub fn run(&mut self) -> VesperResult<Hints> {
        let blueprint = self.environment.function();
        if !self.broker.mark_serialized(blueprint) {
            self.broker
                .trace_with(|| format!("already analyzed {blueprint}, bailing out"));
            return Ok(Hints::new());
        }

        if self.flags.contains(SerializerFlags::COLLECT_SOURCE_POSITIONS) {
            self.broker.ensure_source_positions(blueprint.shared);
        }
        self.broker.serialize_vector_slots(blueprint.feedback);

        self.traverse_bytecode()?;
        Ok(self.environment.return_value_hints().clone())
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    fn traverse_bytecode(&mut self) -> VesperResult<()> {
        let bytecode = Arc::clone(&self.bytecode);
        let mut iterator = BytecodeIterator::new(&bytecode);
        let mut handler_matcher = ExceptionHandlerMatcher::new(&bytecode);

        while !iterator.done() {
            let offset = iterator.current_offset();
            self.incorporate_jump_target_environment(offset);

            self.broker
                .trace_with(|| format!("handling bytecode {offset}: {}", iterator.current_opcode()));

            if self.environment.is_dead() {
                if iterator.current_opcode() == Opcode::ResumeGenerator
                    || handler_matcher.is_handler_start(offset)
                {
                    self.environment.revive();
                } else {
                    // The optimizer generates no code for this bytecode.
                    iterator.advance();
                    continue;
                }
            }

            self.dispatch(&iterator)?;
            iterator.advance();
        }
        Ok(())
    }

    fn dispatch(&mut self, iterator: &BytecodeIterator<'_>) -> VesperResult<()> {
        match disposition(iterator.current_opcode()) {
            Disposition::Modeled => self.visit(iterator)?,
            Disposition::ClearEphemeral => self.environment.clear_ephemeral_hints(),
            Disposition::ClearAccumulator => self.environment.accumulator_hints_mut().clear(),
            Disposition::ConditionalJump => self.process_jump(iterator),
            Disposition::UnconditionalJump => {
                self.process_jump(iterator);
                self.environment.clear_ephemeral_hints();
            }
            Disposition::Ignored => {}
            Disposition::Kill => self.environment.kill(),
            Disposition::Unreachable => {
                return Err(VesperError::UnexpectedBytecode {
                    opcode: iterator.current_opcode().name(),
                    offset: iterator.current_offset(),
                });
            }
        }
        Ok(())
    }

    fn visit(&mut self, iterator: &BytecodeIterator<'_>) -> VesperResult<()> {
        match iterator.current_opcode() {
            Opcode::LdaUndefined => self.set_accumulator_constant(Value::Undefined),
            Opcode::LdaNull => self.set_accumulator_constant(Value::Null),
            Opcode::LdaTheHole => self.set_accumulator_constant(Value::TheHole),
            Opcode::LdaTrue => self.set_accumulator_constant(Value::Bool(true)),
            Opcode::LdaFalse => self.set_accumulator_constant(Value::Bool(false)),
            Opcode::LdaZero => self.set_accumulator_constant(Value::smi(0)),
            Opcode::LdaSmi => {
                self.set_accumulator_constant(Value::smi(iterator.immediate_operand(0)));
            }
            Opcode::LdaConstant => self.visit_lda_constant(iterator),
            Opcode::Ldar => self.visit_ldar(iterator),
            Opcode::Star => self.visit_star(iterator),
            Opcode::Mov => self.visit_mov(iterator),
            Opcode::CreateClosure => self.visit_create_closure(iterator)?,
            Opcode::GetSuperConstructor => self.visit_get_super_constructor(iterator),
            Opcode::LdaGlobal
            | Opcode::LdaGlobalInsideTypeof
            | Opcode::LdaLookupGlobalSlot
            | Opcode::LdaLookupGlobalSlotInsideTypeof => self.visit_lda_global(iterator),
            Opcode::StaGlobal => self.visit_sta_global(iterator),
            Opcode::LdaNamedProperty => self.visit_named_access(iterator, AccessMode::Load)?,
            Opcode::StaNamedProperty => self.visit_named_access(iterator, AccessMode::Store)?,
            Opcode::StaNamedOwnProperty => {
                self.visit_named_access(iterator, AccessMode::StoreInLiteral)?;
            }
            Opcode::LdaKeyedProperty => self.visit_lda_keyed_property(iterator)?,
            Opcode::StaKeyedProperty => self.visit_sta_keyed_property(iterator)?,
            Opcode::StaInArrayLiteral => self.visit_sta_in_array_literal(iterator)?,
            Opcode::TestIn => self.visit_test_in(iterator)?,
            Opcode::CallAnyReceiver | Opcode::CallProperty => {
                self.process_call_var_args(iterator, ReceiverMode::Any, false)?;
            }
            Opcode::CallProperty0 => self.visit_call_property0(iterator)?,
            Opcode::CallProperty1 => self.visit_call_property1(iterator)?,
            Opcode::CallProperty2 => self.visit_call_property2(iterator)?,
            Opcode::CallUndefinedReceiver => {
                self.process_call_var_args(iterator, ReceiverMode::NullOrUndefined, false)?;
            }
            Opcode::CallUndefinedReceiver0 => self.visit_call_undefined_receiver0(iterator)?,
            Opcode::CallUndefinedReceiver1 => self.visit_call_undefined_receiver1(iterator)?,
            Opcode::CallUndefinedReceiver2 => self.visit_call_undefined_receiver2(iterator)?,
            Opcode::CallWithSpread => {
                self.process_call_var_args(iterator, ReceiverMode::Any, true)?;
            }
            Opcode::Construct => self.visit_construct(iterator, false)?,
            Opcode::ConstructWithSpread => self.visit_construct(iterator, true)?,
            Opcode::Return => self.visit_return(),
            Opcode::SwitchOnSmiNoFeedback => self.visit_switch_on_smi(iterator),
            other => unreachable!("{other} has no dedicated transfer function"),
        }
        Ok(())
    }

    // =========================================================================
    // Constant Loads and Moves
    // =========================================================================

    fn set_accumulator_constant(&mut self, value: Value) {
        let accumulator = self.environment.accumulator_hints_mut();
        accumulator.clear();
        accumulator.add_constant(value);
    }

    fn visit_lda_constant(&mut self, iterator: &BytecodeIterator<'_>) {
        match iterator.constant_operand(0) {
            Constant::Value(value) => self.set_accumulator_constant(value),
            // Function infos and names do not flow as values.
            Constant::FunctionInfo(_) | Constant::Name(_) => {
                self.environment.accumulator_hints_mut().clear();
            }
        }
    }

    fn visit_ldar(&mut self, iterator: &BytecodeIterator<'_>) {
        let hints = self
            .environment
            .register_hints(iterator.register_operand(0))
            .clone();
        let accumulator = self.environment.accumulator_hints_mut();
        accumulator.clear();
        accumulator.add_all(&hints);
    }

    fn visit_star(&mut self, iterator: &BytecodeIterator<'_>) {
        let hints = self.environment.accumulator_hints().clone();
        let register = self.environment.register_hints_mut(iterator.register_operand(0));
        register.clear();
        register.add_all(&hints);
    }

    fn visit_mov(&mut self, iterator: &BytecodeIterator<'_>) {
        let hints = self
            .environment
            .register_hints(iterator.register_operand(0))
            .clone();
        let destination = self
            .environment
            .register_hints_mut(iterator.register_operand(1));
        destination.clear();
        destination.add_all(&hints);
    }

    // =========================================================================
    // Closures and Super Constructors
    // =========================================================================

    fn visit_create_closure(&mut self, iterator: &BytecodeIterator<'_>) -> VesperResult<()> {
        let shared = iterator
            .constant_operand(0)
            .as_function_info()
            .ok_or_else(|| {
                VesperError::internal("CreateClosure expects a function-info constant")
            })?;
        let cell_index = iterator.index_operand(1);

        let vector = self.environment.function().feedback;
        let cell = self.broker.heap().vector(vector).closure_cell(cell_index);
        self.broker.record_closure_cell(vector, cell_index);

        self.environment.accumulator_hints_mut().clear();
        if let FeedbackCellValue::Vector(feedback) = cell.value {
            self.environment
                .accumulator_hints_mut()
                .add_blueprint(FunctionBlueprint::new(shared, feedback));
        }
        Ok(())
    }

    fn visit_get_super_constructor(&mut self, iterator: &BytecodeIterator<'_>) {
        let destination = iterator.register_operand(0);
        self.environment.register_hints_mut(destination).clear();

        let broker = self.broker;
        let heap = broker.heap();
        let mut parents = Vec::new();
        for constant in self.environment.accumulator_hints().constants() {
            let Some(object) = constant.as_object() else {
                continue;
            };
            if !heap.object(object).is_function() {
                continue;
            }
            let shape = heap.shape_of(object);
            broker.serialize_shape_prototype(shape);
            let Some(prototype) = heap.shape(shape).prototype() else {
                continue;
            };
            if heap.shape(heap.shape_of(prototype)).is_constructor() {
                parents.push(Value::object(prototype));
            }
        }
        for parent in parents {
            self.environment
                .register_hints_mut(destination)
                .add_constant(parent);
        }
    }

    // =========================================================================
    // Global Access
    // =========================================================================

    fn process_feedback_for_global_access(
        &mut self,
        slot: FeedbackSlot,
    ) -> Option<ProcessedFeedback> {
        if !slot.is_valid() {
            return None;
        }
        let vector = self.environment.function().feedback;
        let source = FeedbackSource::new(vector, slot);
        if let Some(processed) = self.broker.get_feedback(source) {
            return Some(processed);
        }
        let processed = self.broker.process_global_access(vector, slot);
        self.broker.set_feedback(source, processed.clone());
        Some(processed)
    }

    fn visit_lda_global(&mut self, iterator: &BytecodeIterator<'_>) {
        let slot = iterator.slot_operand(1);
        self.environment.accumulator_hints_mut().clear();
        if let Some(processed) = self.process_feedback_for_global_access(slot) {
            if let Some(constant) = processed.global_constant() {
                self.environment
                    .accumulator_hints_mut()
                    .add_constant(constant);
            }
        }
    }

    fn visit_sta_global(&mut self, iterator: &BytecodeIterator<'_>) {
        let slot = iterator.slot_operand(1);
        self.process_feedback_for_global_access(slot);
    }

    // =========================================================================
    // Property Access
    // =========================================================================

    fn visit_named_access(
        &mut self,
        iterator: &BytecodeIterator<'_>,
        mode: AccessMode,
    ) -> VesperResult<()> {
        let receiver = self
            .environment
            .register_hints(iterator.register_operand(0))
            .clone();
        let name = iterator.constant_operand(1).as_name().ok_or_else(|| {
            VesperError::internal("named property access expects a name constant")
        })?;
        let slot = iterator.slot_operand(2);
        self.process_named_property_access(&receiver, name, slot, mode);
        Ok(())
    }

    fn process_named_property_access(
        &mut self,
        receiver: &Hints,
        name: NameId,
        slot: FeedbackSlot,
        mode: AccessMode,
    ) {
        if self.bailout_on_uninitialized(slot) {
            return;
        }
        self.process_feedback_for_property_access(slot, mode, Some(name));

        let broker = self.broker;
        for shape in broker.relevant_receiver_shapes(receiver.shapes().iter().copied()) {
            self.process_shape_for_named_access(shape, name);
        }

        let heap = broker.heap();
        let global_proxy = heap.native_context().global_proxy;
        let prototype_name = heap.native_context().prototype_name;
        for constant in receiver.constants() {
            if *constant == Value::object(global_proxy) {
                let _ = broker.request_property_cell(name);
            }
            // Loading `f.prototype` off a known function feeds the
            // prototype-chain specialization; serialize f in full.
            if mode == AccessMode::Load && name == prototype_name {
                if let Some(object) = constant.as_object() {
                    if heap.object(object).is_function() {
                        broker.serialize_function_info(object);
                    }
                }
            }
        }

        self.environment.accumulator_hints_mut().clear();
    }

    fn process_shape_for_named_access(&self, shape: ShapeId, name: NameId) {
        let heap = self.broker.heap();
        if shape == heap.shape_of(heap.native_context().global_proxy) {
            let _ = self.broker.request_property_cell(name);
        }
    }

    fn process_feedback_for_property_access(
        &mut self,
        slot: FeedbackSlot,
        mode: AccessMode,
        static_name: Option<NameId>,
    ) {
        if !slot.is_valid() {
            return;
        }
        let vector = self.environment.function().feedback;
        let source = FeedbackSource::new(vector, slot);
        if self.broker.has_feedback(source) {
            return;
        }

        let broker = self.broker;
        let nexus = FeedbackNexus::new(broker.heap().vector(vector), slot);
        if nexus.is_uninitialized() {
            broker.set_feedback(source, ProcessedFeedback::Insufficient);
            return;
        }

        let observed = nexus.shapes();
        if observed.is_empty() {
            // Megamorphic: the cache dropped its shapes.
            broker.set_feedback(source, ProcessedFeedback::Megamorphic);
            return;
        }

        let shapes = broker.relevant_receiver_shapes(observed.iter().copied());
        if shapes.is_empty() {
            broker.set_feedback(source, ProcessedFeedback::Insufficient);
            return;
        }

        let name = static_name.or_else(|| nexus.name());
        let key_kind = nexus.key_kind();
        let ic_state = nexus.ic_state();

        let processed = if let Some(name) = name {
            let mut access_infos = Vec::with_capacity(shapes.len());
            for &shape in &shapes {
                self.process_shape_for_named_access(shape, name);
                access_infos.push(broker.compute_access_info(shape, name, mode));
            }
            ProcessedFeedback::NamedAccess {
                name,
                shapes,
                access_infos,
            }
        } else if key_kind == Some(KeyKind::Element) && ic_state != IcState::Megamorphic {
            for &shape in &shapes {
                broker.serialize_for_element_access(shape, mode);
            }
            ProcessedFeedback::ElementAccess { shapes }
        } else {
            ProcessedFeedback::Megamorphic
        };
        broker.set_feedback(source, processed);
    }

    fn visit_lda_keyed_property(&mut self, iterator: &BytecodeIterator<'_>) -> VesperResult<()> {
        let key = self.environment.accumulator_hints().clone();
        let receiver = self
            .environment
            .register_hints(iterator.register_operand(0))
            .clone();
        let slot = iterator.slot_operand(1);
        self.process_keyed_property_access(&receiver, &key, slot, AccessMode::Load);
        Ok(())
    }

    fn visit_sta_keyed_property(&mut self, iterator: &BytecodeIterator<'_>) -> VesperResult<()> {
        let receiver = self
            .environment
            .register_hints(iterator.register_operand(0))
            .clone();
        let key = self
            .environment
            .register_hints(iterator.register_operand(1))
            .clone();
        let slot = iterator.slot_operand(2);
        self.process_keyed_property_access(&receiver, &key, slot, AccessMode::Store);
        Ok(())
    }

    fn visit_sta_in_array_literal(
        &mut self,
        iterator: &BytecodeIterator<'_>,
    ) -> VesperResult<()> {
        let receiver = self
            .environment
            .register_hints(iterator.register_operand(0))
            .clone();
        let key = self
            .environment
            .register_hints(iterator.register_operand(1))
            .clone();
        let slot = iterator.slot_operand(2);
        self.process_keyed_property_access(&receiver, &key, slot, AccessMode::StoreInLiteral);
        Ok(())
    }

    fn visit_test_in(&mut self, iterator: &BytecodeIterator<'_>) -> VesperResult<()> {
        let receiver = self.environment.accumulator_hints().clone();
        let key = self
            .environment
            .register_hints(iterator.register_operand(0))
            .clone();
        let slot = iterator.slot_operand(1);
        self.process_keyed_property_access(&receiver, &key, slot, AccessMode::Has);
        Ok(())
    }

    fn process_keyed_property_access(
        &mut self,
        receiver: &Hints,
        key: &Hints,
        slot: FeedbackSlot,
        mode: AccessMode,
    ) {
        if self.bailout_on_uninitialized(slot) {
            return;
        }
        self.process_feedback_for_property_access(slot, mode, None);

        let broker = self.broker;
        let heap = broker.heap();
        for constant in receiver.constants() {
            let Some(object) = constant.as_object() else {
                continue;
            };
            if matches!(heap.object(object).kind, ObjectKind::TypedArray { .. }) {
                broker.serialize_typed_array(object);
            }
            if matches!(mode, AccessMode::Load | AccessMode::Has) {
                for key_constant in key.constants() {
                    if let Some(index) = key_constant.as_smi() {
                        if index >= 0 {
                            broker.serialize_own_element(object, index as u32);
                        }
                    }
                }
            }
        }

        self.environment.accumulator_hints_mut().clear();
    }

    // =========================================================================
    // Calls and Construction
    // =========================================================================

    fn visit_call_property0(&mut self, iterator: &BytecodeIterator<'_>) -> VesperResult<()> {
        let callee = self
            .environment
            .register_hints(iterator.register_operand(0))
            .clone();
        let receiver = self
            .environment
            .register_hints(iterator.register_operand(1))
            .clone();
        let slot = iterator.slot_operand(2);
        let arguments = HintsVector::from_iter([receiver]);
        self.process_call_or_construct(callee, None, arguments, slot, false)
    }

    fn visit_call_property1(&mut self, iterator: &BytecodeIterator<'_>) -> VesperResult<()> {
        let callee = self
            .environment
            .register_hints(iterator.register_operand(0))
            .clone();
        let receiver = self
            .environment
            .register_hints(iterator.register_operand(1))
            .clone();
        let arg0 = self
            .environment
            .register_hints(iterator.register_operand(2))
            .clone();
        let slot = iterator.slot_operand(3);
        let arguments = HintsVector::from_iter([receiver, arg0]);
        self.process_call_or_construct(callee, None, arguments, slot, false)
    }

    fn visit_call_property2(&mut self, iterator: &BytecodeIterator<'_>) -> VesperResult<()> {
        let callee = self
            .environment
            .register_hints(iterator.register_operand(0))
            .clone();
        let receiver = self
            .environment
            .register_hints(iterator.register_operand(1))
            .clone();
        let arg0 = self
            .environment
            .register_hints(iterator.register_operand(2))
            .clone();
        let arg1 = self
            .environment
            .register_hints(iterator.register_operand(3))
            .clone();
        let slot = iterator.slot_operand(4);
        let arguments = HintsVector::from_iter([receiver, arg0, arg1]);
        self.process_call_or_construct(callee, None, arguments, slot, false)
    }

    fn visit_call_undefined_receiver0(
        &mut self,
        iterator: &BytecodeIterator<'_>,
    ) -> VesperResult<()> {
        let callee = self
            .environment
            .register_hints(iterator.register_operand(0))
            .clone();
        let slot = iterator.slot_operand(1);
        let arguments = HintsVector::from_iter([Hints::constant(Value::Undefined)]);
        self.process_call_or_construct(callee, None, arguments, slot, false)
    }

    fn visit_call_undefined_receiver1(
        &mut self,
        iterator: &BytecodeIterator<'_>,
    ) -> VesperResult<()> {
        let callee = self
            .environment
            .register_hints(iterator.register_operand(0))
            .clone();
        let arg0 = self
            .environment
            .register_hints(iterator.register_operand(1))
            .clone();
        let slot = iterator.slot_operand(2);
        let arguments = HintsVector::from_iter([Hints::constant(Value::Undefined), arg0]);
        self.process_call_or_construct(callee, None, arguments, slot, false)
    }

    fn visit_call_undefined_receiver2(
        &mut self,
        iterator: &BytecodeIterator<'_>,
    ) -> VesperResult<()> {
        let callee = self
            .environment
            .register_hints(iterator.register_operand(0))
            .clone();
        let arg0 = self
            .environment
            .register_hints(iterator.register_operand(1))
            .clone();
        let arg1 = self
            .environment
            .register_hints(iterator.register_operand(2))
            .clone();
        let slot = iterator.slot_operand(3);
        let arguments = HintsVector::from_iter([Hints::constant(Value::Undefined), arg0, arg1]);
        self.process_call_or_construct(callee, None, arguments, slot, false)
    }

    fn process_call_var_args(
        &mut self,
        iterator: &BytecodeIterator<'_>,
        receiver_mode: ReceiverMode,
        with_spread: bool,
    ) -> VesperResult<()> {
        let callee = self
            .environment
            .register_hints(iterator.register_operand(0))
            .clone();
        let first_register = iterator.register_operand(1);
        let register_count = iterator.register_count_operand(2);
        let slot = iterator.slot_operand(3);

        let mut arguments = HintsVector::new();
        if receiver_mode == ReceiverMode::NullOrUndefined {
            arguments.push(Hints::constant(Value::Undefined));
        }
        self.environment
            .export_register_hints(first_register, register_count, &mut arguments);

        self.process_call_or_construct(callee, None, arguments, slot, with_spread)
    }

    fn visit_construct(
        &mut self,
        iterator: &BytecodeIterator<'_>,
        with_spread: bool,
    ) -> VesperResult<()> {
        let callee = self
            .environment
            .register_hints(iterator.register_operand(0))
            .clone();
        let first_register = iterator.register_operand(1);
        let register_count = iterator.register_count_operand(2);
        let slot = iterator.slot_operand(3);
        let new_target = self.environment.accumulator_hints().clone();

        let mut arguments = HintsVector::new();
        self.environment
            .export_register_hints(first_register, register_count, &mut arguments);

        self.process_call_or_construct(callee, Some(new_target), arguments, slot, with_spread)
    }

    fn process_call_or_construct(
        &mut self,
        mut callee: Hints,
        mut new_target: Option<Hints>,
        arguments: HintsVector,
        slot: FeedbackSlot,
        with_spread: bool,
    ) -> VesperResult<()> {
        if self.bailout_on_uninitialized(slot) {
            return Ok(());
        }

        // Fuse the recorded call feedback into the hints. For a
        // construct the recorded object is the new target, which is
        // usually also the callee.
        if slot.is_valid() {
            let vector = self.environment.function().feedback;
            let heap = self.broker.heap();
            let nexus = FeedbackNexus::new(heap.vector(vector), slot);
            if let Some(target) = nexus.target() {
                if heap.is_callable(Value::object(target)) {
                    let value = Value::object(target);
                    if let Some(new_target) = new_target.as_mut() {
                        new_target.add_constant(value);
                    }
                    callee.add_constant(value);
                }
            }
        }

        // The return value arrives through the child analyses below.
        self.environment.accumulator_hints_mut().clear();

        let constants: Vec<Value> = callee.constants().iter().copied().collect();
        for constant in constants {
            let Some(object) = constant.as_object() else {
                continue;
            };
            let Some((shared, feedback)) = self.broker.heap().object(object).as_function() else {
                continue;
            };
            self.process_known_callee(shared, &arguments);
            if !self.broker.heap().shared(shared).is_inlineable() {
                continue;
            }
            if feedback.is_none() {
                continue;
            }
            let subject = CompilationSubject::from_closure(self.broker.heap(), object);
            let hints =
                self.run_child_serializer(subject, new_target.as_ref(), &arguments, with_spread)?;
            self.environment.accumulator_hints_mut().add_all(&hints);
        }

        let blueprints: Vec<FunctionBlueprint> = callee.blueprints().iter().copied().collect();
        for blueprint in blueprints {
            self.process_known_callee(blueprint.shared, &arguments);
            if !self.broker.heap().shared(blueprint.shared).is_inlineable() {
                continue;
            }
            let subject = CompilationSubject::from_blueprint(blueprint);
            let hints =
                self.run_child_serializer(subject, new_target.as_ref(), &arguments, with_spread)?;
            self.environment.accumulator_hints_mut().add_all(&hints);
        }

        Ok(())
    }

    fn run_child_serializer(
        &mut self,
        subject: CompilationSubject,
        new_target: Option<&Hints>,
        arguments: &[Hints],
        with_spread: bool,
    ) -> VesperResult<Hints> {
        if with_spread {
            debug_assert!(!arguments.is_empty());
            // The spread's contents are unknown: drop it and pretend the
            // callee receives its full parameter list, the tail without
            // information.
            let mut padded: HintsVector = arguments.iter().cloned().collect();
            padded.pop();
            let parameter_count = self
                .broker
                .heap()
                .shared(subject.blueprint().shared)
                .bytecode()
                .map_or(0, |bytecode| bytecode.parameter_count() as usize);
            while padded.len() < parameter_count {
                padded.push(Hints::new());
            }
            return self.run_child_serializer(subject, new_target, &padded, false);
        }

        let mut child = BackgroundSerializer::with_arguments(
            self.broker,
            subject,
            new_target,
            arguments,
            self.flags.for_child(),
        )?;
        child.run()
    }

    fn process_known_callee(&self, shared: SharedId, arguments: &[Hints]) {
        let info = self.broker.heap().shared(shared);
        if info.is_host_function() {
            self.process_host_call(shared, arguments);
        } else if let Some(builtin) = info.builtin_id() {
            self.process_builtin_call(builtin, arguments);
        }
    }

    fn process_host_call(&self, shared: SharedId, arguments: &[Hints]) {
        let broker = self.broker;
        let heap = broker.heap();
        let Some(template) = heap.shared(shared).template() else {
            return;
        };
        broker.serialize_template_info(shared);

        if !template.has_call_code {
            return;
        }
        if template.accept_any_receiver && template.signature.is_none() {
            return;
        }

        assert!(!arguments.is_empty(), "host call without a receiver");
        let receiver_hints = &arguments[0];
        for constant in receiver_hints.constants() {
            let shape = match constant {
                // An undefined receiver resolves to the global proxy.
                Value::Undefined => heap.shape_of(heap.native_context().global_proxy),
                Value::Object(object) => heap.shape_of(*object),
                _ => continue,
            };
            self.process_receiver_shape_for_host_call(shape);
        }
        for &shape in receiver_hints.shapes() {
            self.process_receiver_shape_for_host_call(shape);
        }
    }

    fn process_receiver_shape_for_host_call(&self, shape: ShapeId) {
        if self.broker.heap().shape(shape).is_access_check_needed() {
            return;
        }
        self.broker.lookup_template_holder(shape);
    }

    fn process_builtin_call(&self, builtin: BuiltinId, arguments: &[Hints]) {
        let broker = self.broker;
        match builtin {
            BuiltinId::PromiseConstructor => {
                broker.serialize_scope_info();
                broker.serialize_promise_resolve_code();
                broker.serialize_promise_reject_code();
            }
            BuiltinId::PromisePrototypeCatch | BuiltinId::PromisePrototypeFinally => {
                broker.serialize_scope_info();
                if let Some(receiver) = arguments.first() {
                    self.process_shape_hints_for_promises(receiver);
                }
            }
            BuiltinId::PromisePrototypeThen => {
                if let Some(receiver) = arguments.first() {
                    self.process_shape_hints_for_promises(receiver);
                }
            }
            _ => {}
        }
    }

    fn process_shape_hints_for_promises(&self, receiver: &Hints) {
        let broker = self.broker;
        let heap = broker.heap();
        for constant in receiver.constants() {
            let Some(object) = constant.as_object() else {
                continue;
            };
            if matches!(heap.object(object).kind, ObjectKind::Promise) {
                broker.serialize_shape_prototype(heap.shape_of(object));
            }
        }
        for &shape in receiver.shapes() {
            if heap.shape(shape).is_promise() {
                broker.serialize_shape_prototype(shape);
            }
        }
    }

    // =========================================================================
    // Bailouts, Returns, Jumps
    // =========================================================================

    fn bailout_on_uninitialized(&mut self, slot: FeedbackSlot) -> bool {
        debug_assert!(!self.environment.is_dead());
        if !self
            .flags
            .contains(SerializerFlags::BAILOUT_ON_UNINITIALIZED)
        {
            return false;
        }
        if self.flags.contains(SerializerFlags::OSR) {
            // The entry point being replaced may sit beyond this site.
            return false;
        }
        if !slot.is_valid() {
            return false;
        }
        let vector = self.environment.function().feedback;
        let nexus = FeedbackNexus::new(self.broker.heap().vector(vector), slot);
        if !nexus.is_uninitialized() {
            return false;
        }
        let source = FeedbackSource::new(vector, slot);
        match self.broker.get_feedback(source) {
            Some(existing) => debug_assert!(existing.is_insufficient()),
            None => self
                .broker
                .set_feedback(source, ProcessedFeedback::Insufficient),
        }
        self.environment.kill();
        true
    }

    fn visit_return(&mut self) {
        let accumulator = self.environment.accumulator_hints().clone();
        self.environment.add_return_hints(&accumulator);
        self.environment.clear_ephemeral_hints();
    }

    fn visit_switch_on_smi(&mut self, iterator: &BytecodeIterator<'_>) {
        let current = iterator.current_offset();
        let targets: Vec<u32> = iterator
            .jump_table_targets()
            .iter()
            .map(|entry| entry.target_offset)
            .collect();
        for target in targets {
            if current < target {
                self.contribute_to_jump_target_environment(target);
            }
        }
    }

    fn process_jump(&mut self, iterator: &BytecodeIterator<'_>) {
        let target = iterator.jump_target_offset();
        if iterator.current_offset() < target {
            self.contribute_to_jump_target_environment(target);
        }
    }

    fn contribute_to_jump_target_environment(&mut self, target: u32) {
        match self.jump_target_environments.entry(target) {
            Entry::Occupied(mut entry) => entry.get_mut().merge(&self.environment),
            Entry::Vacant(entry) => {
                entry.insert(self.environment.clone());
            }
        }
    }

    fn incorporate_jump_target_environment(&mut self, offset: u32) {
        if let Some(environment) = self.jump_target_environments.remove(&offset) {
            self.environment.merge(&environment);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
