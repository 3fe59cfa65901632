//! Abstract dataflow state for one function under analysis.
//!
//! The environment tracks one hint set per parameter, register, the
//! accumulator, and the current context, in that fixed layout, plus two
//! slots that survive control-flow resets: the hints for the executing
//! closure and the join of everything returned so far. An environment
//! with no ephemeral storage is *dead* (unreachable code); dead state
//! propagates until an exception handler or generator resume revives it.

use super::hints::{FunctionBlueprint, Hints, HintsVector};
use std::fmt;
use vesper_compiler::Register;

/// Per-function abstract state, merged along forward control flow.
#[derive(Debug, Clone)]
pub struct Environment {
    function: FunctionBlueprint,
    parameter_count: usize,
    register_count: usize,
    closure_hints: Hints,
    return_value_hints: Hints,
    /// Layout: `[ parameters | registers | accumulator | context ]`.
    /// Empty means dead.
    ephemeral: Vec<Hints>,
}

impl Environment {
    /// Create a live environment with empty hints everywhere.
    ///
    /// `closure_hints` carries either the closure constant or the
    /// blueprint itself; it is fixed for the environment's lifetime.
    #[must_use]
    pub fn new(
        function: FunctionBlueprint,
        parameter_count: usize,
        register_count: usize,
        closure_hints: Hints,
    ) -> Self {
        let mut env = Self {
            function,
            parameter_count,
            register_count,
            closure_hints,
            return_value_hints: Hints::new(),
            ephemeral: Vec::new(),
        };
        env.ephemeral = vec![Hints::new(); env.ephemeral_len()];
        env
    }

    // =========================================================================
    // Layout
    // =========================================================================

    #[inline]
    fn accumulator_index(&self) -> usize {
        self.parameter_count + self.register_count
    }

    #[inline]
    fn context_index(&self) -> usize {
        self.accumulator_index() + 1
    }

    #[inline]
    fn ephemeral_len(&self) -> usize {
        self.context_index() + 1
    }

    fn slot_index(&self, register: Register) -> usize {
        match register {
            Register::Context => self.context_index(),
            Register::Parameter(i) => {
                let i = i as usize;
                assert!(i < self.parameter_count, "parameter index out of bounds");
                i
            }
            Register::Local(r) => {
                let r = r as usize;
                assert!(r < self.register_count, "register index out of bounds");
                self.parameter_count + r
            }
            Register::Closure => unreachable!("closure register routes to closure_hints"),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The blueprint under analysis.
    #[inline]
    #[must_use]
    pub fn function(&self) -> FunctionBlueprint {
        self.function
    }

    /// Parameter count, receiver included.
    #[inline]
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    /// Hints for the currently executing closure.
    #[inline]
    #[must_use]
    pub fn closure_hints(&self) -> &Hints {
        &self.closure_hints
    }

    /// Join of every value returned so far. Grows monotonically.
    #[inline]
    #[must_use]
    pub fn return_value_hints(&self) -> &Hints {
        &self.return_value_hints
    }

    /// Join more hints into the return value.
    pub fn add_return_hints(&mut self, hints: &Hints) {
        self.return_value_hints.add_all(hints);
    }

    /// Hints for the accumulator.
    ///
    /// # Panics
    /// Panics if the environment is dead.
    #[must_use]
    pub fn accumulator_hints(&self) -> &Hints {
        let index = self.accumulator_index();
        &self.ephemeral[index]
    }

    /// Mutable hints for the accumulator.
    ///
    /// # Panics
    /// Panics if the environment is dead.
    #[must_use]
    pub fn accumulator_hints_mut(&mut self) -> &mut Hints {
        let index = self.accumulator_index();
        &mut self.ephemeral[index]
    }

    /// Hints for a register (closure pseudo-register included).
    ///
    /// # Panics
    /// Panics if the environment is dead or the register is out of range.
    #[must_use]
    pub fn register_hints(&self, register: Register) -> &Hints {
        if register.is_closure() {
            return &self.closure_hints;
        }
        &self.ephemeral[self.slot_index(register)]
    }

    /// Mutable hints for a register other than the closure.
    ///
    /// # Panics
    /// Panics if the environment is dead, the register is out of range,
    /// or the register is the read-only closure pseudo-register.
    #[must_use]
    pub fn register_hints_mut(&mut self, register: Register) -> &mut Hints {
        assert!(
            !register.is_closure(),
            "closure hints are fixed for the environment's lifetime"
        );
        let index = self.slot_index(register);
        &mut self.ephemeral[index]
    }

    /// Append the hints of `count` consecutive locals starting at `first`
    /// to `dst`, in order.
    ///
    /// # Panics
    /// Panics if `first` is not a local register.
    pub fn export_register_hints(&self, first: Register, count: u32, dst: &mut HintsVector) {
        let base = first
            .local_index()
            .expect("register ranges start at a local register");
        for i in 0..count {
            dst.push(
                self.register_hints(Register::local(base + i as u16))
                    .clone(),
            );
        }
    }

    // =========================================================================
    // Liveness
    // =========================================================================

    /// Whether this state is unreachable.
    #[inline]
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.ephemeral.is_empty()
    }

    /// Drop all ephemeral state; the following code is unreachable.
    ///
    /// # Panics
    /// Panics if already dead.
    pub fn kill(&mut self) {
        assert!(!self.is_dead(), "killing a dead environment");
        self.ephemeral.clear();
    }

    /// Restore empty ephemeral storage at an incoming side entry.
    ///
    /// # Panics
    /// Panics if not dead.
    pub fn revive(&mut self) {
        assert!(self.is_dead(), "reviving a live environment");
        self.ephemeral = vec![Hints::new(); self.ephemeral_len()];
    }

    /// Clear every ephemeral slot, keeping the environment alive.
    pub fn clear_ephemeral_hints(&mut self) {
        for hints in &mut self.ephemeral {
            hints.clear();
        }
    }

    // =========================================================================
    // Merge
    // =========================================================================

    /// Merge `other` into `self`, leaving `other` untouched.
    ///
    /// Both environments must analyze the same function; `other` always
    /// originates from an earlier offset of the same traversal, so its
    /// return hints are already included in ours when we are dead.
    ///
    /// # Panics
    /// Panics if the layouts differ.
    pub fn merge(&mut self, other: &Environment) {
        assert_eq!(self.parameter_count, other.parameter_count);
        assert_eq!(self.register_count, other.register_count);
        debug_assert!(
            self.closure_hints == other.closure_hints,
            "merged environments must agree on the closure"
        );

        if self.is_dead() {
            self.ephemeral = other.ephemeral.clone();
            debug_assert!(self.return_value_hints.includes(&other.return_value_hints));
            self.return_value_hints.add_all(&other.return_value_hints);
            return;
        }

        assert_eq!(self.ephemeral.len(), other.ephemeral.len());
        for (ours, theirs) in self.ephemeral.iter_mut().zip(&other.ephemeral) {
            ours.add_all(theirs);
        }
        self.return_value_hints.add_all(&other.return_value_hints);
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dead() {
            writeln!(f, "dead")?;
        } else {
            writeln!(f, "alive")?;
            for (i, hints) in self.ephemeral.iter().enumerate() {
                if hints.is_empty() {
                    continue;
                }
                if i < self.parameter_count {
                    writeln!(f, "hints for a{i}:")?;
                } else if i < self.accumulator_index() {
                    writeln!(f, "hints for r{}:", i - self.parameter_count)?;
                } else if i == self.accumulator_index() {
                    writeln!(f, "hints for <accumulator>:")?;
                } else {
                    writeln!(f, "hints for <context>:")?;
                }
                write!(f, "{hints}")?;
            }
        }
        if !self.closure_hints.is_empty() {
            writeln!(f, "hints for <closure>:")?;
            write!(f, "{}", self.closure_hints)?;
        }
        if !self.return_value_hints.is_empty() {
            writeln!(f, "hints for <return value>:")?;
            write!(f, "{}", self.return_value_hints)?;
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
    use vesper_core::{ShapeId, SharedId, Value, VectorId};

    fn blueprint() -> FunctionBlueprint {
        FunctionBlueprint::new(SharedId::new(0), VectorId::new(0))
    }

    fn env(parameter_count: usize, register_count: usize) -> Environment {
        Environment::new(blueprint(), parameter_count, register_count, Hints::new())
    }

    #[test]
    fn test_fresh_environment_is_alive_and_empty() {
        let e = env(2, 3);
        assert!(!e.is_dead());
        assert!(e.accumulator_hints().is_empty());
        assert!(e.register_hints(Register::parameter(1)).is_empty());
        assert!(e.register_hints(Register::local(2)).is_empty());
        assert!(e.register_hints(Register::Context).is_empty());
        assert!(e.return_value_hints().is_empty());
    }

    #[test]
    fn test_slot_addressing_is_disjoint() {
        let mut e = env(2, 2);
        e.register_hints_mut(Register::parameter(0))
            .add_constant(Value::smi(0));
        e.register_hints_mut(Register::local(0))
            .add_constant(Value::smi(1));
        e.accumulator_hints_mut().add_constant(Value::smi(2));

        assert_eq!(
            e.register_hints(Register::parameter(0)),
            &Hints::constant(Value::smi(0))
        );
        assert_eq!(
            e.register_hints(Register::local(0)),
            &Hints::constant(Value::smi(1))
        );
        assert_eq!(e.accumulator_hints(), &Hints::constant(Value::smi(2)));
        assert!(e.register_hints(Register::parameter(1)).is_empty());
        assert!(e.register_hints(Register::local(1)).is_empty());
    }

    #[test]
    fn test_closure_register_routes_to_closure_hints() {
        let closure = Hints::constant(Value::smi(42));
        let e = Environment::new(blueprint(), 1, 1, closure.clone());
        assert_eq!(e.register_hints(Register::Closure), &closure);
    }

    #[test]
    fn test_kill_revive_cycles() {
        let mut e = env(1, 1);
        for _ in 0..3 {
            e.accumulator_hints_mut().add_constant(Value::Null);
            e.kill();
            assert!(e.is_dead());
            e.revive();
            assert!(!e.is_dead());
            assert!(e.accumulator_hints().is_empty());
        }
    }

    #[test]
    #[should_panic(expected = "killing a dead environment")]
    fn test_double_kill_panics() {
        let mut e = env(1, 0);
        e.kill();
        e.kill();
    }

    #[test]
    fn test_closure_and_return_hints_survive_kill() {
        let closure = Hints::constant(Value::smi(9));
        let mut e = Environment::new(blueprint(), 1, 0, closure.clone());
        e.add_return_hints(&Hints::constant(Value::Undefined));
        e.kill();
        assert_eq!(e.closure_hints(), &closure);
        assert_eq!(e.return_value_hints(), &Hints::constant(Value::Undefined));
        e.revive();
        assert_eq!(e.closure_hints(), &closure);
        assert_eq!(e.return_value_hints(), &Hints::constant(Value::Undefined));
    }

    #[test]
    fn test_return_hints_are_monotone() {
        let mut e = env(1, 0);
        e.add_return_hints(&Hints::constant(Value::smi(1)));
        let before = e.return_value_hints().clone();

        e.add_return_hints(&Hints::constant(Value::smi(2)));
        e.clear_ephemeral_hints();
        e.kill();
        e.revive();

        assert!(e.return_value_hints().includes(&before));
    }

    #[test]
    fn test_merge_joins_slots_and_returns() {
        let mut a = env(1, 1);
        let mut b = env(1, 1);
        a.accumulator_hints_mut().add_constant(Value::smi(1));
        b.accumulator_hints_mut().add_constant(Value::smi(2));
        b.register_hints_mut(Register::local(0))
            .add_shape(ShapeId::new(5));
        b.add_return_hints(&Hints::constant(Value::Null));

        a.merge(&b);

        assert!(a.accumulator_hints().constants().contains(&Value::smi(1)));
        assert!(a.accumulator_hints().constants().contains(&Value::smi(2)));
        assert!(a
            .register_hints(Register::local(0))
            .shapes()
            .contains(&ShapeId::new(5)));
        assert_eq!(a.return_value_hints(), &Hints::constant(Value::Null));
        // Source unmodified.
        assert_eq!(b.accumulator_hints(), &Hints::constant(Value::smi(2)));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut a = env(1, 1);
        let mut b = env(1, 1);
        a.accumulator_hints_mut().add_constant(Value::smi(1));
        b.accumulator_hints_mut().add_constant(Value::smi(2));

        a.merge(&b);
        let once = a.clone();
        a.merge(&b);

        assert_eq!(a.accumulator_hints(), once.accumulator_hints());
        assert_eq!(a.return_value_hints(), once.return_value_hints());
    }

    #[test]
    fn test_merge_slots_commute() {
        let mut a = env(1, 1);
        let mut b = env(1, 1);
        a.accumulator_hints_mut().add_constant(Value::smi(1));
        a.register_hints_mut(Register::local(0))
            .add_shape(ShapeId::new(1));
        b.accumulator_hints_mut().add_constant(Value::smi(2));
        b.register_hints_mut(Register::local(0))
            .add_shape(ShapeId::new(2));

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);

        assert_eq!(ab.accumulator_hints(), ba.accumulator_hints());
        assert_eq!(
            ab.register_hints(Register::local(0)),
            ba.register_hints(Register::local(0))
        );
    }

    #[test]
    fn test_merge_into_dead_copies_slots() {
        let mut a = env(1, 1);
        let mut b = env(1, 1);
        b.accumulator_hints_mut().add_constant(Value::smi(3));
        a.kill();

        a.merge(&b);

        assert!(!a.is_dead());
        assert_eq!(a.accumulator_hints(), &Hints::constant(Value::smi(3)));
    }

    #[test]
    #[should_panic]
    fn test_merge_layout_mismatch_panics() {
        let mut a = env(1, 1);
        let b = env(1, 2);
        a.merge(&b);
    }

    #[test]
    fn test_export_register_hints() {
        let mut e = env(1, 3);
        e.register_hints_mut(Register::local(1))
            .add_constant(Value::smi(10));
        e.register_hints_mut(Register::local(2))
            .add_constant(Value::smi(20));

        let mut dst = HintsVector::new();
        dst.push(Hints::constant(Value::Undefined));
        e.export_register_hints(Register::local(1), 2, &mut dst);

        assert_eq!(dst.len(), 3);
        assert_eq!(dst[0], Hints::constant(Value::Undefined));
        assert_eq!(dst[1], Hints::constant(Value::smi(10)));
        assert_eq!(dst[2], Hints::constant(Value::smi(20)));
    }

    #[test]
    fn test_display_mentions_liveness() {
        let mut e = env(1, 0);
        assert!(e.to_string().starts_with("alive"));
        e.kill();
        assert!(e.to_string().starts_with("dead"));
    }
}
